//! Key-value settings and import run bookkeeping

use crate::Result;
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

/// Last recorded run of an import job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastImport {
    pub job: String,
    pub at: String,
    pub count: i64,
}

/// Ensure default settings exist
///
/// Existing values are left alone; NULL values are reset to the default.
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "synthetic_email_domain", "assistants.cabinet.local").await?;
    ensure_setting(pool, "assistant_template_role", "assistant").await?;
    Ok(())
}

/// Insert a setting if absent or NULL
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a completed import run (`last_import.<job>.at` / `.count`)
pub async fn record_import_run(pool: &SqlitePool, job: &str, imported: usize) -> Result<()> {
    let at = Utc::now().to_rfc3339();
    set_setting(pool, &format!("last_import.{}.at", job), &at).await?;
    set_setting(pool, &format!("last_import.{}.count", job), &imported.to_string()).await?;
    Ok(())
}

/// All recorded import runs, ordered by job name
pub async fn last_imports(pool: &SqlitePool) -> Result<Vec<LastImport>> {
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
        "SELECT key, value FROM settings WHERE key LIKE 'last_import.%.at' ORDER BY key",
    )
    .fetch_all(pool)
    .await?;

    let mut imports = Vec::with_capacity(rows.len());
    for (key, at) in rows {
        let Some(job) = key
            .strip_prefix("last_import.")
            .and_then(|rest| rest.strip_suffix(".at"))
        else {
            continue;
        };

        let count = get_setting(pool, &format!("last_import.{}.count", job))
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        imports.push(LastImport {
            job: job.to_string(),
            at: at.unwrap_or_default(),
            count,
        });
    }

    Ok(imports)
}
