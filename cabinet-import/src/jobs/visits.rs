//! Visit examination import from JSON export snapshots
//!
//! Only the patient code and visit date are columns; every other clinical
//! field of the export is kept verbatim in the JSON `payload`.

use super::{record_run, WriteMode};
use crate::importer::Importer;
use crate::mapper::Mapped;
use crate::parser::{json::GENERATED_FIELDS, parse_json_records, RawRecord};
use crate::report::ImportReport;
use crate::sink::{SqliteSink, TableRecord};
use crate::source::read_source;
use cabinet_common::config::ImportSettings;
use cabinet_common::dates;
use cabinet_common::db::VisitExamination;
use cabinet_common::Result;
use serde_json::Value;
use sqlx::query_builder::Separated;
use sqlx::{Sqlite, SqlitePool};
use std::path::Path;

pub const JOB: &str = "visits";
pub const DEFAULT_SOURCE: &str = "visit_examinations.json";
pub const ENTITY: &str = "visitExaminations";

const PATIENT_CODE: &str = "patientCode";
const VISIT_DATE: &str = "visitDate";

impl TableRecord for VisitExamination {
    const TABLE: &'static str = "visit_examinations";
    const COLUMNS: &'static [&'static str] =
        &["patient_code", "visit_date", "visit_date_iso", "payload"];

    fn push_binds(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.patient_code.clone())
            .push_bind(self.visit_date.clone())
            .push_bind(self.visit_date_iso.clone())
            .push_bind(self.payload.clone());
    }
}

pub fn map_visit(record: &RawRecord) -> Mapped<VisitExamination> {
    let patient_code = record.required(PATIENT_CODE)?;
    let visit_date = record.required(VISIT_DATE)?;
    let payload = Value::Object(record.remaining_fields(&[PATIENT_CODE, VISIT_DATE]));

    Ok(VisitExamination {
        patient_code,
        visit_date_iso: dates::to_iso(&visit_date),
        visit_date,
        payload: payload.to_string(),
    })
}

pub async fn import_visits(
    pool: &SqlitePool,
    source: &Path,
    settings: &ImportSettings,
    mode: WriteMode,
) -> Result<ImportReport> {
    let content = read_source(source)?;
    let records = parse_json_records(&content, ENTITY, GENERATED_FIELDS)?;

    let importer = Importer::new(JOB, mode.strategy(settings))
        .with_progress_interval(settings.progress_interval);
    let mut sink = SqliteSink::new(pool.clone());
    let report = importer.run(&records, map_visit, &mut sink).await?;

    record_run(pool, report).await
}
