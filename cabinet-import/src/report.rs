//! Progress and summary reporting
//!
//! Purely observational: counters and log lines, no influence on the run.

use crate::mapper::SkipReason;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// A record that was not imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Zero-based position in the parsed source
    pub index: usize,
    pub reason: SkipReason,
}

/// Final tally of one import run
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub job: String,
    /// Records read from the source
    pub total: usize,
    /// Records written as new rows
    pub imported: usize,
    /// Existing rows updated in place (upserts)
    pub updated: usize,
    /// Records skipped by the mapper
    pub skipped: usize,
    /// Rows removed before reinserting (replace-all)
    pub deleted: u64,
    /// Rows written by each bulk insert call, in call order
    pub batches: Vec<u64>,
    pub skips: Vec<SkippedRecord>,
    pub elapsed: Duration,
}

impl ImportReport {
    /// Number of bulk insert calls issued
    pub fn write_calls(&self) -> usize {
        self.batches.len()
    }
}

/// Tracks counters during a run and logs progress
#[derive(Debug)]
pub struct ProgressReporter {
    job: String,
    total: usize,
    interval: usize,
    processed: usize,
    imported: usize,
    updated: usize,
    deleted: u64,
    batches: Vec<u64>,
    skips: Vec<SkippedRecord>,
    started: Instant,
}

impl ProgressReporter {
    /// Start tracking; `interval` of 0 disables periodic progress lines
    pub fn new(job: &str, total: usize, interval: usize) -> Self {
        info!("🚀 {}: importing {} records", job, total);
        Self {
            job: job.to_string(),
            total,
            interval,
            processed: 0,
            imported: 0,
            updated: 0,
            deleted: 0,
            batches: Vec::new(),
            skips: Vec::new(),
            started: Instant::now(),
        }
    }

    /// A record was skipped by the mapper
    pub fn record_skip(&mut self, index: usize, reason: SkipReason) {
        warn!("⚠️  {}: record {} skipped: {}", self.job, index + 1, reason);
        self.skips.push(SkippedRecord { index, reason });
        self.advance();
    }

    /// A record was accepted by the mapper
    pub fn record_mapped(&mut self) {
        self.advance();
    }

    pub fn record_deleted(&mut self, rows: u64) {
        info!("🗑️  {}: removed {} existing rows", self.job, rows);
        self.deleted = rows;
    }

    /// A bulk insert call completed
    pub fn record_batch(&mut self, rows: u64) {
        self.imported += rows as usize;
        self.batches.push(rows);
        info!(
            "💾 {}: batch {} written ({} rows, {} total)",
            self.job,
            self.batches.len(),
            rows,
            self.imported
        );
    }

    pub fn record_inserted(&mut self) {
        self.imported += 1;
    }

    pub fn record_updated(&mut self) {
        self.updated += 1;
    }

    fn advance(&mut self) {
        self.processed += 1;
        if self.interval > 0 && self.processed % self.interval == 0 {
            info!(
                "⏳ {}: {}/{} records processed ({} skipped)",
                self.job,
                self.processed,
                self.total,
                self.skips.len()
            );
        }
    }

    /// Log the final tally and produce the report
    pub fn finish(self) -> ImportReport {
        let report = self.into_report();
        info!(
            "✅ {}: {} imported, {} updated, {} skipped of {} in {:.2?}",
            report.job,
            report.imported,
            report.updated,
            report.skipped,
            report.total,
            report.elapsed
        );
        report
    }

    /// Log the partial tally of an aborted run
    pub fn abort(self, cause: &dyn std::fmt::Display) -> ImportReport {
        let report = self.into_report();
        error!(
            "❌ {}: aborted after {} imported, {} updated, {} skipped of {} in {:.2?}: {}",
            report.job,
            report.imported,
            report.updated,
            report.skipped,
            report.total,
            report.elapsed,
            cause
        );
        report
    }

    fn into_report(self) -> ImportReport {
        ImportReport {
            skipped: self.skips.len(),
            job: self.job,
            total: self.total,
            imported: self.imported,
            updated: self.updated,
            deleted: self.deleted,
            batches: self.batches,
            skips: self.skips,
            elapsed: self.started.elapsed(),
        }
    }
}
