//! Lookup and reporting queries
//!
//! Lookups by date compare the raw stored string exactly, the same way the
//! desktop screens query it. A visit stored as `2025-10-30` is not found
//! with `30/10/2025`; [`count_honoraires_by_canonical_date`] exists so the
//! diagnostic report can show what a format-independent lookup would match.

use crate::db::models::Honoraire;
use crate::Result;
use sqlx::SqlitePool;

/// Tables covered by the verification report
pub const REPORTED_TABLES: &[&str] = &[
    "patients",
    "honoraires",
    "actes_honoraires",
    "visit_examinations",
    "compte_rendus",
    "payment_validations",
    "users",
    "assistant_users",
    "message_templates",
];

/// Row count of a known table
pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    if !REPORTED_TABLES.contains(&table) {
        return Err(crate::Error::InvalidInput(format!("Unknown table: {}", table)));
    }

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Honoraires for a patient code on a raw date string (exact match)
pub async fn find_honoraires(
    pool: &SqlitePool,
    patient_code: &str,
    date: &str,
) -> Result<Vec<Honoraire>> {
    let rows = sqlx::query_as::<_, Honoraire>(
        r#"
        SELECT date, date_iso, time, patient_code, act_name, amount, practitioner,
               assistant_1, assistant_1_fee, assistant_2, assistant_2_fee
        FROM honoraires
        WHERE patient_code = ? AND date = ?
        ORDER BY id
        "#,
    )
    .bind(patient_code)
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Honoraires for a patient code whose canonical date equals `date_iso`
pub async fn count_honoraires_by_canonical_date(
    pool: &SqlitePool,
    patient_code: &str,
    date_iso: &str,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM honoraires WHERE patient_code = ? AND date_iso = ?",
    )
    .bind(patient_code)
    .bind(date_iso)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Payment validations on a raw date string (exact match)
pub async fn count_payment_validations_on(pool: &SqlitePool, visit_date: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM payment_validations WHERE visit_date = ?")
            .bind(visit_date)
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Distinct raw date strings stored for a patient code
pub async fn honoraire_dates_for_patient(
    pool: &SqlitePool,
    patient_code: &str,
) -> Result<Vec<String>> {
    let dates: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT date FROM honoraires WHERE patient_code = ? ORDER BY date",
    )
    .bind(patient_code)
    .fetch_all(pool)
    .await?;

    Ok(dates)
}

/// Every raw value of a date column, with its number of occurrences
pub async fn raw_date_values(
    pool: &SqlitePool,
    table: &str,
    column: &str,
) -> Result<Vec<(String, i64)>> {
    if !REPORTED_TABLES.contains(&table) {
        return Err(crate::Error::InvalidInput(format!("Unknown table: {}", table)));
    }

    let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
        "SELECT {col}, COUNT(*) FROM {table} WHERE {col} IS NOT NULL GROUP BY {col}",
        col = column,
        table = table
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Honoraire patient codes with no matching patient department code
///
/// Returns `(patient_code, honoraire_count)` pairs.
pub async fn orphaned_patient_codes(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT h.patient_code, COUNT(*)
        FROM honoraires h
        WHERE NOT EXISTS (
            SELECT 1 FROM patients p
            WHERE CAST(p.department_code AS TEXT) = TRIM(h.patient_code)
        )
        GROUP BY h.patient_code
        ORDER BY h.patient_code
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
