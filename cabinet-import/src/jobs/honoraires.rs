//! Honoraires (billed acts) import from the legacy XML fee table
//!
//! The dump is authoritative and total: existing rows are replaced. The
//! raw date string is stored as received; its canonical ISO form is stored
//! next to it when the format is recognized.

use super::record_run;
use crate::importer::{Importer, WriteStrategy};
use crate::mapper::Mapped;
use crate::parser::{parse_xml_rows, xml::TABLE_ROW_TAG, RawRecord};
use crate::report::ImportReport;
use crate::sink::{SqliteSink, TableRecord};
use crate::source::read_source;
use cabinet_common::config::ImportSettings;
use cabinet_common::dates;
use cabinet_common::db::Honoraire;
use cabinet_common::Result;
use sqlx::query_builder::Separated;
use sqlx::{Sqlite, SqlitePool};
use std::path::Path;
use tracing::debug;

pub const JOB: &str = "honoraires";
pub const DEFAULT_SOURCE: &str = "honoraires.xml";

impl TableRecord for Honoraire {
    const TABLE: &'static str = "honoraires";
    const COLUMNS: &'static [&'static str] = &[
        "date",
        "date_iso",
        "time",
        "patient_code",
        "act_name",
        "amount",
        "practitioner",
        "assistant_1",
        "assistant_1_fee",
        "assistant_2",
        "assistant_2_fee",
    ];

    fn push_binds(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.date.clone())
            .push_bind(self.date_iso.clone())
            .push_bind(self.time.clone())
            .push_bind(self.patient_code.clone())
            .push_bind(self.act_name.clone())
            .push_bind(self.amount)
            .push_bind(self.practitioner.clone())
            .push_bind(self.assistant_1.clone())
            .push_bind(self.assistant_1_fee)
            .push_bind(self.assistant_2.clone())
            .push_bind(self.assistant_2_fee);
    }
}

/// Map one fee row; patient code and date are required
pub fn map_honoraire(record: &RawRecord) -> Mapped<Honoraire> {
    let patient_code = record.required("CodePatient")?;
    let date = record.required("Date")?;

    let date_iso = dates::to_iso(&date);
    if date_iso.is_none() {
        debug!(date = %date, patient_code = %patient_code, "Unrecognized date format, stored raw only");
    }

    Ok(Honoraire {
        date_iso,
        date,
        time: record.text("Heure"),
        patient_code,
        act_name: record.text("Acte"),
        amount: record.float_or_zero("Montant"),
        practitioner: record.text("Medecin"),
        assistant_1: record.text("Assistant1"),
        assistant_1_fee: record.float_or_zero("MontantAssistant1"),
        assistant_2: record.text("Assistant2"),
        assistant_2_fee: record.float_or_zero("MontantAssistant2"),
    })
}

pub async fn import_honoraires(
    pool: &SqlitePool,
    source: &Path,
    settings: &ImportSettings,
) -> Result<ImportReport> {
    let content = read_source(source)?;
    let records = parse_xml_rows(&content, TABLE_ROW_TAG)?;

    let importer = Importer::new(
        JOB,
        WriteStrategy::ReplaceAll {
            batch_size: settings.batch_size,
        },
    )
    .with_progress_interval(settings.progress_interval);
    let mut sink = SqliteSink::new(pool.clone());
    let report = importer.run(&records, map_honoraire, &mut sink).await?;

    record_run(pool, report).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::SkipReason;
    use serde_json::json;

    fn row(pairs: &[(&str, &str)]) -> RawRecord {
        let mut record = RawRecord::new();
        for (name, value) in pairs {
            record.insert(*name, json!([value]));
        }
        record
    }

    #[test]
    fn test_maps_fee_row() {
        let honoraire = map_honoraire(&row(&[
            ("Date", "30/10/2025"),
            ("Heure", "09:30"),
            ("CodePatient", "1042"),
            ("Acte", "Consultation"),
            ("Montant", "2500,00"),
            ("Medecin", "Dr Haddad"),
            ("MontantAssistant1", ""),
        ]))
        .unwrap();

        assert_eq!(honoraire.date, "30/10/2025");
        assert_eq!(honoraire.date_iso.as_deref(), Some("2025-10-30"));
        assert_eq!(honoraire.amount, 2500.0);
        assert_eq!(honoraire.assistant_1_fee, 0.0);
        assert_eq!(honoraire.assistant_2, None);
    }

    #[test]
    fn test_unrecognized_date_kept_raw() {
        let honoraire =
            map_honoraire(&row(&[("Date", "le 30 octobre"), ("CodePatient", "7")])).unwrap();
        assert_eq!(honoraire.date, "le 30 octobre");
        assert_eq!(honoraire.date_iso, None);
    }

    #[test]
    fn test_missing_patient_code_or_date_skips() {
        assert_eq!(
            map_honoraire(&row(&[("Date", "30/10/2025")])),
            Err(SkipReason::MissingField("CodePatient".to_string()))
        );
        assert_eq!(
            map_honoraire(&row(&[("CodePatient", "1042"), ("Date", " ")])),
            Err(SkipReason::MissingField("Date".to_string()))
        );
    }
}
