//! Read-only verification report: row counts and recorded import runs

use cabinet_common::db::{count_rows, last_imports, LastImport, REPORTED_TABLES};
use cabinet_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub tables: Vec<TableCount>,
    pub last_imports: Vec<LastImport>,
}

impl VerifyReport {
    pub fn rows(&self, table: &str) -> Option<i64> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }
}

pub async fn run_verification(pool: &SqlitePool) -> Result<VerifyReport> {
    let mut tables = Vec::with_capacity(REPORTED_TABLES.len());
    for table in REPORTED_TABLES {
        tables.push(TableCount {
            table: table.to_string(),
            rows: count_rows(pool, table).await?,
        });
    }

    Ok(VerifyReport {
        tables,
        last_imports: last_imports(pool).await?,
    })
}

pub fn log_report(report: &VerifyReport) {
    info!("📊 Row counts");
    for table in &report.tables {
        info!("   {:<22} {:>8}", table.table, table.rows);
    }

    if report.last_imports.is_empty() {
        info!("📋 No import runs recorded");
        return;
    }
    info!("📋 Last imports");
    for run in &report.last_imports {
        info!("   {:<22} {:>8} rows at {}", run.job, run.count, run.at);
    }
}
