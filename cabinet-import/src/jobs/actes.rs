//! Fee catalog import (act name → standard fee)
//!
//! Assistant percentages are not part of the legacy dump; they start at
//! zero and are configured later in the application.

use super::record_run;
use crate::importer::{Importer, WriteStrategy};
use crate::mapper::{Mapped, SkipReason};
use crate::parser::{parse_xml_rows, xml::TABLE_ROW_TAG, RawRecord};
use crate::report::ImportReport;
use crate::sink::{SqliteSink, TableRecord};
use crate::source::read_source;
use cabinet_common::config::ImportSettings;
use cabinet_common::db::ActeHonoraire;
use cabinet_common::Result;
use sqlx::query_builder::Separated;
use sqlx::{Sqlite, SqlitePool};
use std::collections::HashSet;
use std::path::Path;

pub const JOB: &str = "actes";
pub const DEFAULT_SOURCE: &str = "actes.xml";

impl TableRecord for ActeHonoraire {
    const TABLE: &'static str = "actes_honoraires";
    const COLUMNS: &'static [&'static str] =
        &["act_name", "amount", "assistant_1_pct", "assistant_2_pct"];

    fn push_binds(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.act_name.clone())
            .push_bind(self.amount)
            .push_bind(self.assistant_1_pct)
            .push_bind(self.assistant_2_pct);
    }
}

/// Catalog row mapper; act names are unique, later duplicates are skipped
#[derive(Debug, Default)]
pub struct ActeMapper {
    seen: HashSet<String>,
}

impl ActeMapper {
    pub fn map(&mut self, record: &RawRecord) -> Mapped<ActeHonoraire> {
        let act_name = record.required("Acte")?;
        if !self.seen.insert(act_name.clone()) {
            return Err(SkipReason::Duplicate(format!("act '{}'", act_name)));
        }

        Ok(ActeHonoraire {
            act_name,
            amount: record.float_or_zero("Montant"),
            assistant_1_pct: 0.0,
            assistant_2_pct: 0.0,
        })
    }
}

pub async fn import_actes(
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
    let mut mapper = ActeMapper::default();
    let mut sink = SqliteSink::new(pool.clone());
    let report = importer
        .run(&records, |record| mapper.map(record), &mut sink)
        .await?;

    record_run(pool, report).await
}
