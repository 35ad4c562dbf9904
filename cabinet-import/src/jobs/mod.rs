//! Entity import jobs
//!
//! Each job wires a source format, a mapping function and a write strategy
//! into the shared [`crate::Importer`], then records the run in settings.

pub mod actes;
pub mod assistants;
pub mod compte_rendus;
pub mod honoraires;
pub mod message_templates;
pub mod patients;
pub mod payment_validations;
pub mod visits;

use crate::importer::WriteStrategy;
use crate::report::ImportReport;
use cabinet_common::config::ImportSettings;
use cabinet_common::db::record_import_run;
use cabinet_common::Result;
use sqlx::SqlitePool;

/// Write mode for snapshot imports that support appending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum WriteMode {
    /// Delete existing rows, then insert the snapshot
    #[default]
    Replace,
    /// Keep existing rows and append the snapshot
    Append,
}

impl WriteMode {
    pub fn strategy(self, settings: &ImportSettings) -> WriteStrategy {
        match self {
            WriteMode::Replace => WriteStrategy::ReplaceAll {
                batch_size: settings.batch_size,
            },
            WriteMode::Append => WriteStrategy::BatchedInsert {
                batch_size: settings.batch_size,
            },
        }
    }
}

/// Record the run in settings and hand the report back
async fn record_run(pool: &SqlitePool, report: ImportReport) -> Result<ImportReport> {
    record_import_run(pool, &report.job, report.imported + report.updated).await?;
    Ok(report)
}
