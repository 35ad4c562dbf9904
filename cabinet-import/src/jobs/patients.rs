//! Patient import from the legacy XML patient table
//!
//! Patients are never deleted by an import: rows are upserted by their
//! department code, so edits made in the application to patients absent
//! from the dump survive.

use super::record_run;
use crate::importer::{Importer, WriteStrategy};
use crate::mapper::Mapped;
use crate::parser::{parse_xml_rows, xml::TABLE_ROW_TAG, RawRecord};
use crate::report::ImportReport;
use crate::sink::{SqliteSink, TableRecord};
use crate::source::read_source;
use cabinet_common::config::ImportSettings;
use cabinet_common::db::Patient;
use cabinet_common::Result;
use sqlx::query_builder::Separated;
use sqlx::{Sqlite, SqlitePool};
use std::path::Path;

pub const JOB: &str = "patients";
pub const DEFAULT_SOURCE: &str = "patients.xml";

impl TableRecord for Patient {
    const TABLE: &'static str = "patients";
    const COLUMNS: &'static [&'static str] = &[
        "department_code",
        "last_name",
        "first_name",
        "date_of_birth",
        "phone",
        "address",
        "medical_history",
        "surgical_history",
        "allergies",
    ];
    const KEY_COLUMN: Option<&'static str> = Some("department_code");
    const UPDATED_AT_COLUMN: Option<&'static str> = Some("updated_at");

    fn key(&self) -> Option<i64> {
        Some(self.department_code)
    }

    fn push_binds(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.department_code)
            .push_bind(self.last_name.clone())
            .push_bind(self.first_name.clone())
            .push_bind(self.date_of_birth.clone())
            .push_bind(self.phone.clone())
            .push_bind(self.address.clone())
            .push_bind(self.medical_history.clone())
            .push_bind(self.surgical_history.clone())
            .push_bind(self.allergies.clone());
    }
}

/// Map one `Table_Contenu` row; department code and last name are required
pub fn map_patient(record: &RawRecord) -> Mapped<Patient> {
    Ok(Patient {
        department_code: record.required_int("N_Departement")?,
        last_name: record.required("Nom")?,
        first_name: record.text("Prenom"),
        date_of_birth: record.text("DateNaissance"),
        phone: record.text("Telephone"),
        address: record.text("Adresse"),
        medical_history: record.text("AntecedentsMedicaux"),
        surgical_history: record.text("AntecedentsChirurgicaux"),
        allergies: record.text("Allergies"),
    })
}

pub async fn import_patients(
    pool: &SqlitePool,
    source: &Path,
    settings: &ImportSettings,
) -> Result<ImportReport> {
    let content = read_source(source)?;
    let records = parse_xml_rows(&content, TABLE_ROW_TAG)?;

    let importer = Importer::new(JOB, WriteStrategy::UpsertByKey)
        .with_progress_interval(settings.progress_interval);
    let mut sink = SqliteSink::new(pool.clone());
    let report = importer.run(&records, map_patient, &mut sink).await?;

    record_run(pool, report).await
}
