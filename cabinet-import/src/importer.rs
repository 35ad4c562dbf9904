//! Generic mapped batch importer
//!
//! One pipeline for every entity: map each input record (skipping the
//! ones the mapper rejects), then write the accepted records with the
//! configured [`WriteStrategy`]. No transaction spans the run; a failure
//! after a replace-all delete leaves the table partially repopulated.

use crate::mapper::Mapped;
use crate::report::{ImportReport, ProgressReporter};
use crate::sink::{RecordSink, UpsertOutcome};
use cabinet_common::{Error, Result};

/// How accepted records reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Delete every existing row, then insert in batches
    ReplaceAll { batch_size: usize },
    /// Append in batches, one write call per batch
    BatchedInsert { batch_size: usize },
    /// Update-if-exists / insert-if-absent per record, by numeric key
    UpsertByKey,
}

impl WriteStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            WriteStrategy::ReplaceAll { .. } => "replace-all",
            WriteStrategy::BatchedInsert { .. } => "batched-insert",
            WriteStrategy::UpsertByKey => "upsert-by-key",
        }
    }
}

/// Runs one import job
#[derive(Debug, Clone)]
pub struct Importer {
    job: String,
    strategy: WriteStrategy,
    progress_interval: usize,
}

impl Importer {
    pub fn new(job: impl Into<String>, strategy: WriteStrategy) -> Self {
        Self {
            job: job.into(),
            strategy,
            progress_interval: cabinet_common::config::DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Map `inputs` with `map` and write the accepted records to `sink`
    ///
    /// Mapper rejections are counted and skipped. Store errors abort the
    /// run after logging the partial tally.
    pub async fn run<I, R, S, F>(&self, inputs: &[I], mut map: F, sink: &mut S) -> Result<ImportReport>
    where
        R: Sync,
        S: RecordSink<R>,
        F: FnMut(&I) -> Mapped<R>,
    {
        tracing::info!(job = %self.job, strategy = self.strategy.label(), "Starting import");
        let mut progress = ProgressReporter::new(&self.job, inputs.len(), self.progress_interval);

        let mut accepted = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            match map(input) {
                Ok(record) => {
                    accepted.push(record);
                    progress.record_mapped();
                }
                Err(reason) => progress.record_skip(index, reason),
            }
        }

        match self.write(&accepted, sink, &mut progress).await {
            Ok(()) => Ok(progress.finish()),
            Err(e) => {
                progress.abort(&e);
                Err(e)
            }
        }
    }

    async fn write<R, S>(
        &self,
        records: &[R],
        sink: &mut S,
        progress: &mut ProgressReporter,
    ) -> Result<()>
    where
        R: Sync,
        S: RecordSink<R>,
    {
        self.check_batch_size::<R, S>(records.len(), sink)?;

        match self.strategy {
            WriteStrategy::ReplaceAll { batch_size } => {
                let deleted = sink.delete_all().await?;
                progress.record_deleted(deleted);
                insert_in_batches(records, batch_size, sink, progress).await
            }
            WriteStrategy::BatchedInsert { batch_size } => {
                insert_in_batches(records, batch_size, sink, progress).await
            }
            WriteStrategy::UpsertByKey => {
                for record in records {
                    match sink.upsert(record).await? {
                        UpsertOutcome::Inserted => progress.record_inserted(),
                        UpsertOutcome::Updated => progress.record_updated(),
                    }
                }
                Ok(())
            }
        }
    }

    /// Reject a batch size the sink cannot take before anything is written
    ///
    /// Checked ahead of the replace-all delete, so existing rows survive.
    fn check_batch_size<R, S>(&self, records: usize, sink: &S) -> Result<()>
    where
        R: Sync,
        S: RecordSink<R>,
    {
        let batch_size = match self.strategy {
            WriteStrategy::ReplaceAll { batch_size } | WriteStrategy::BatchedInsert { batch_size } => {
                batch_size.max(1)
            }
            WriteStrategy::UpsertByKey => return Ok(()),
        };

        match sink.max_batch_rows() {
            Some(max) if batch_size.min(records) > max => Err(Error::InvalidInput(format!(
                "batch_size {} exceeds the {} rows per write call {} accepts, lower batch_size",
                batch_size, max, self.job
            ))),
            _ => Ok(()),
        }
    }
}

async fn insert_in_batches<R, S>(
    records: &[R],
    batch_size: usize,
    sink: &mut S,
    progress: &mut ProgressReporter,
) -> Result<()>
where
    R: Sync,
    S: RecordSink<R>,
{
    for batch in records.chunks(batch_size.max(1)) {
        let written = sink.insert_batch(batch).await?;
        progress.record_batch(written);
    }
    Ok(())
}
