//! cabinet-import library
//!
//! Import/normalization pipeline for legacy clinic data:
//! source reader → format parser → per-record mapper → write strategy,
//! with progress and summary reporting. Each entity job in [`jobs`]
//! supplies only its field mapping and its write strategy to the shared
//! [`importer::Importer`].

pub mod diagnose;
pub mod importer;
pub mod jobs;
pub mod mapper;
pub mod parser;
pub mod report;
pub mod sink;
pub mod source;
pub mod verify;

pub use importer::{Importer, WriteStrategy};
pub use mapper::{Mapped, SkipReason};
pub use parser::RawRecord;
pub use report::ImportReport;
pub use sink::{RecordSink, SqliteSink, TableRecord};
