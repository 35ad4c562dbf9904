//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//! Tables are created by [`crate::db::init::create_schema`] first; migrations
//! only transform data or add structures to databases created by older builds.
//!
//! # Migration Guidelines
//!
//! 1. Never modify existing migrations, add a new one instead
//! 2. Check for existing columns/indexes before adding them
//! 3. Prefer ALTER TABLE over DROP/CREATE to preserve data

use crate::dates;
use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Tables carrying a raw date column next to its canonical ISO column
const DATE_COLUMNS: &[(&str, &str, &str)] = &[
    ("honoraires", "date", "date_iso"),
    ("visit_examinations", "visit_date", "visit_date_iso"),
    ("payment_validations", "visit_date", "visit_date_iso"),
];

/// Get current schema version, 0 if none recorded
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: ensure canonical date columns exist and backfill them
///
/// Rows written before canonical dates existed only carry the raw string.
/// Unrecognized formats stay NULL.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: backfill canonical ISO date columns");

    for (table, raw_column, iso_column) in DATE_COLUMNS {
        let has_column: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM pragma_table_info('{}') WHERE name = '{}'",
            table, iso_column
        ))
        .fetch_one(pool)
        .await?;

        if has_column == 0 {
            sqlx::query(&format!("ALTER TABLE {} ADD COLUMN {} TEXT", table, iso_column))
                .execute(pool)
                .await?;
            info!("Migration v1: added {}.{}", table, iso_column);
        }

        let pending: Vec<(i64, String)> = sqlx::query_as(&format!(
            "SELECT id, {} FROM {} WHERE {} IS NULL",
            raw_column, table, iso_column
        ))
        .fetch_all(pool)
        .await?;

        let mut normalized = 0usize;
        for (id, raw) in &pending {
            if let Some(iso) = dates::to_iso(raw) {
                sqlx::query(&format!("UPDATE {} SET {} = ? WHERE id = ?", table, iso_column))
                    .bind(iso)
                    .bind(id)
                    .execute(pool)
                    .await?;
                normalized += 1;
            }
        }

        if normalized < pending.len() {
            warn!(
                "Migration v1: {} of {} rows in {} have an unrecognized date format",
                pending.len() - normalized,
                pending.len(),
                table
            );
        }
    }

    Ok(())
}

/// Migration v2: lookup indexes on patient code and date
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: add lookup indexes");

    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_honoraires_patient_date ON honoraires(patient_code, date)",
        "CREATE INDEX IF NOT EXISTS idx_honoraires_date_iso ON honoraires(date_iso)",
        "CREATE INDEX IF NOT EXISTS idx_visit_examinations_patient ON visit_examinations(patient_code)",
        "CREATE INDEX IF NOT EXISTS idx_payment_validations_date ON payment_validations(visit_date)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
