//! Read-only data quality report
//!
//! Surfaces the issues imports cannot fix on their own: mixed date formats
//! in the raw date columns, honoraires whose patient code matches no
//! patient, and, for one patient/date pair, how the raw exact-match lookup
//! compares with a lookup on the canonical date.

use cabinet_common::dates::{detect_format, to_iso, DateFormat};
use cabinet_common::db::{
    count_honoraires_by_canonical_date, count_payment_validations_on, find_honoraires,
    honoraire_dates_for_patient, orphaned_patient_codes, raw_date_values,
};
use cabinet_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Raw date columns covered by the format census
pub const DATE_COLUMNS: &[(&str, &str)] = &[
    ("honoraires", "date"),
    ("visit_examinations", "visit_date"),
    ("payment_validations", "visit_date"),
];

/// Unrecognized values kept as examples per column
const UNRECOGNIZED_SAMPLES: usize = 5;

/// Format distribution of one raw date column
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateCensus {
    pub table: String,
    pub column: String,
    /// Rows per recognized format
    pub formats: BTreeMap<DateFormat, i64>,
    /// Rows whose value matches no known format
    pub unrecognized: i64,
    pub unrecognized_samples: Vec<String>,
}

impl DateCensus {
    pub fn total(&self) -> i64 {
        self.formats.values().sum::<i64>() + self.unrecognized
    }

    /// More than one format (or any unrecognized value) in the column
    pub fn is_mixed(&self) -> bool {
        self.formats.len() + usize::from(self.unrecognized > 0) > 1
    }
}

/// Lookup comparison for one patient code and raw date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateProbe {
    pub patient_code: String,
    pub date: String,
    /// Honoraires matching the raw date exactly
    pub honoraires_exact: usize,
    /// Payment validations matching the raw date exactly
    pub payment_validations_exact: i64,
    /// Raw dates stored for the patient
    pub stored_dates: Vec<String>,
    /// Honoraires matching on canonical date, `None` if the probe date is unrecognized
    pub honoraires_canonical: Option<i64>,
}

impl DateProbe {
    /// Rows a format-independent lookup would find that the exact lookup misses
    pub fn missed_by_exact_lookup(&self) -> i64 {
        self.honoraires_canonical
            .map(|canonical| canonical - self.honoraires_exact as i64)
            .unwrap_or(0)
            .max(0)
    }
}

/// Orphaned honoraire patient code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanCode {
    pub patient_code: String,
    pub honoraires: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub date_columns: Vec<DateCensus>,
    pub orphaned_codes: Vec<OrphanCode>,
    pub probe: Option<DateProbe>,
}

/// Classify `(raw value, occurrences)` pairs by date format
pub fn census(table: &str, column: &str, values: &[(String, i64)]) -> DateCensus {
    let mut census = DateCensus {
        table: table.to_string(),
        column: column.to_string(),
        ..Default::default()
    };

    for (raw, count) in values {
        match detect_format(raw) {
            Some(format) => *census.formats.entry(format).or_insert(0) += count,
            None => {
                census.unrecognized += count;
                if census.unrecognized_samples.len() < UNRECOGNIZED_SAMPLES {
                    census.unrecognized_samples.push(raw.clone());
                }
            }
        }
    }

    census
}

/// Probe the raw and canonical lookups for one patient and date
pub async fn probe_date(pool: &SqlitePool, patient_code: &str, date: &str) -> Result<DateProbe> {
    let honoraires_exact = find_honoraires(pool, patient_code, date).await?.len();
    let payment_validations_exact = count_payment_validations_on(pool, date).await?;
    let stored_dates = honoraire_dates_for_patient(pool, patient_code).await?;

    let honoraires_canonical = match to_iso(date) {
        Some(iso) => Some(count_honoraires_by_canonical_date(pool, patient_code, &iso).await?),
        None => None,
    };

    Ok(DateProbe {
        patient_code: patient_code.to_string(),
        date: date.to_string(),
        honoraires_exact,
        payment_validations_exact,
        stored_dates,
        honoraires_canonical,
    })
}

/// Build the full diagnostic report; never writes
pub async fn run_diagnostics(
    pool: &SqlitePool,
    probe: Option<(&str, &str)>,
) -> Result<DiagnosticReport> {
    let mut date_columns = Vec::with_capacity(DATE_COLUMNS.len());
    for (table, column) in DATE_COLUMNS {
        let values = raw_date_values(pool, table, column).await?;
        date_columns.push(census(table, column, &values));
    }

    let orphaned_codes = orphaned_patient_codes(pool)
        .await?
        .into_iter()
        .map(|(patient_code, honoraires)| OrphanCode {
            patient_code,
            honoraires,
        })
        .collect();

    let probe = match probe {
        Some((patient_code, date)) => Some(probe_date(pool, patient_code, date).await?),
        None => None,
    };

    Ok(DiagnosticReport {
        date_columns,
        orphaned_codes,
        probe,
    })
}

/// Log the report as human-readable lines
pub fn log_report(report: &DiagnosticReport) {
    info!("🔍 Date formats");
    for census in &report.date_columns {
        let formats: Vec<String> = census
            .formats
            .iter()
            .map(|(format, count)| format!("{} × {}", format.label(), count))
            .collect();
        let line = format!(
            "{}.{}: {} rows [{}], {} unrecognized",
            census.table,
            census.column,
            census.total(),
            formats.join(", "),
            census.unrecognized
        );
        if census.is_mixed() {
            warn!("⚠️  {} (mixed formats)", line);
        } else {
            info!("   {}", line);
        }
        if !census.unrecognized_samples.is_empty() {
            warn!("   unrecognized: {:?}", census.unrecognized_samples);
        }
    }

    if report.orphaned_codes.is_empty() {
        info!("✅ Every honoraire patient code matches a patient");
    } else {
        let rows: i64 = report.orphaned_codes.iter().map(|o| o.honoraires).sum();
        warn!(
            "⚠️  {} patient codes ({} honoraires) match no patient",
            report.orphaned_codes.len(),
            rows
        );
        for orphan in &report.orphaned_codes {
            warn!("   {:>8}: {} honoraires", orphan.patient_code, orphan.honoraires);
        }
    }

    if let Some(probe) = &report.probe {
        info!("🔎 Lookup for patient {} on {:?}", probe.patient_code, probe.date);
        info!("   honoraires (exact): {}", probe.honoraires_exact);
        info!("   payment validations (exact): {}", probe.payment_validations_exact);
        info!("   stored dates: {:?}", probe.stored_dates);
        match probe.honoraires_canonical {
            Some(canonical) => info!("   honoraires (canonical date): {}", canonical),
            None => warn!("   {:?} is not a recognized date", probe.date),
        }
        if probe.missed_by_exact_lookup() > 0 {
            warn!(
                "⚠️  exact lookup misses {} honoraires stored in another date format",
                probe.missed_by_exact_lookup()
            );
        }
    }
}
