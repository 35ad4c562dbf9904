//! Payment validation import from JSON export snapshots

use super::{record_run, WriteMode};
use crate::importer::Importer;
use crate::mapper::Mapped;
use crate::parser::{json::GENERATED_FIELDS, parse_json_records, RawRecord};
use crate::report::ImportReport;
use crate::sink::{SqliteSink, TableRecord};
use crate::source::read_source;
use cabinet_common::config::ImportSettings;
use cabinet_common::dates;
use cabinet_common::db::PaymentValidation;
use cabinet_common::Result;
use sqlx::query_builder::Separated;
use sqlx::{Sqlite, SqlitePool};
use std::path::Path;

pub const JOB: &str = "payment-validations";
pub const DEFAULT_SOURCE: &str = "payment_validations.json";
pub const ENTITY: &str = "paymentValidations";

impl TableRecord for PaymentValidation {
    const TABLE: &'static str = "payment_validations";
    const COLUMNS: &'static [&'static str] = &[
        "patient_code",
        "visit_date",
        "visit_date_iso",
        "status",
        "total_amount",
        "validated_by",
        "validated_at",
    ];

    fn push_binds(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.patient_code.clone())
            .push_bind(self.visit_date.clone())
            .push_bind(self.visit_date_iso.clone())
            .push_bind(self.status.clone())
            .push_bind(self.total_amount)
            .push_bind(self.validated_by.clone())
            .push_bind(self.validated_at.clone());
    }
}

pub fn map_payment_validation(record: &RawRecord) -> Mapped<PaymentValidation> {
    let visit_date = record.required("visitDate")?;

    Ok(PaymentValidation {
        patient_code: record.text("patientCode"),
        visit_date_iso: dates::to_iso(&visit_date),
        visit_date,
        status: record.required("status")?,
        total_amount: record.float_or_zero("totalAmount"),
        validated_by: record.text("validatedBy"),
        validated_at: record.text("validatedAt"),
    })
}

pub async fn import_payment_validations(
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
    let report = importer
        .run(&records, map_payment_validation, &mut sink)
        .await?;

    record_run(pool, report).await
}
