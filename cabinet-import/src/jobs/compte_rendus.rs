//! Compte rendu (report template) import
//!
//! Templates carry their own numeric id; re-running the import updates
//! existing templates in place instead of duplicating them.

use super::record_run;
use crate::importer::{Importer, WriteStrategy};
use crate::mapper::Mapped;
use crate::parser::{json::TIMESTAMP_FIELDS, parse_json_records, RawRecord};
use crate::report::ImportReport;
use crate::sink::{SqliteSink, TableRecord};
use crate::source::read_source;
use cabinet_common::config::ImportSettings;
use cabinet_common::db::CompteRendu;
use cabinet_common::Result;
use sqlx::query_builder::Separated;
use sqlx::{Sqlite, SqlitePool};
use std::path::Path;

pub const JOB: &str = "compte-rendus";
pub const DEFAULT_SOURCE: &str = "compte_rendus.json";
pub const ENTITY: &str = "compteRendus";

impl TableRecord for CompteRendu {
    const TABLE: &'static str = "compte_rendus";
    const COLUMNS: &'static [&'static str] = &["id", "code", "title", "content"];
    const KEY_COLUMN: Option<&'static str> = Some("id");
    const UPDATED_AT_COLUMN: Option<&'static str> = Some("updated_at");

    fn key(&self) -> Option<i64> {
        Some(self.id)
    }

    fn push_binds(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.code.clone())
            .push_bind(self.title.clone())
            .push_bind(self.content.clone());
    }
}

pub fn map_compte_rendu(record: &RawRecord) -> Mapped<CompteRendu> {
    Ok(CompteRendu {
        id: record.required_int("id")?,
        code: record.required("code")?,
        title: record.text("title"),
        // Template bodies keep their layout, only fully blank content is dropped
        content: record
            .get("content")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
    })
}

pub async fn import_compte_rendus(
    pool: &SqlitePool,
    source: &Path,
    settings: &ImportSettings,
) -> Result<ImportReport> {
    let content = read_source(source)?;
    let records = parse_json_records(&content, ENTITY, TIMESTAMP_FIELDS)?;

    let importer = Importer::new(JOB, WriteStrategy::UpsertByKey)
        .with_progress_interval(settings.progress_interval);
    let mut sink = SqliteSink::new(pool.clone());
    let report = importer.run(&records, map_compte_rendu, &mut sink).await?;

    record_run(pool, report).await
}
