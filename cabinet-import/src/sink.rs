//! Persistence writer
//!
//! [`RecordSink`] is the write seam of the importer. [`SqliteSink`] writes
//! any [`TableRecord`] with multi-row `INSERT` statements built by
//! `sqlx::QueryBuilder`, and upserts keyed records with
//! `INSERT .. ON CONFLICT(key) DO UPDATE`.

use async_trait::async_trait;
use cabinet_common::{Error, Result};
use sqlx::query_builder::Separated;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

/// Bound parameter limit of the bundled SQLite build
pub const MAX_BIND_PARAMETERS: usize = 32_766;

/// A record type mapped to one destination table
pub trait TableRecord: Send + Sync {
    /// Destination table name
    const TABLE: &'static str;

    /// Columns written by [`TableRecord::push_binds`], in bind order
    const COLUMNS: &'static [&'static str];

    /// Numeric key column for upserts; must carry a UNIQUE or PRIMARY KEY constraint
    const KEY_COLUMN: Option<&'static str> = None;

    /// Timestamp column refreshed when an upsert updates an existing row
    const UPDATED_AT_COLUMN: Option<&'static str> = None;

    /// Key value for upserts
    fn key(&self) -> Option<i64> {
        None
    }

    /// Bind one value per column, in [`TableRecord::COLUMNS`] order
    fn push_binds(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>);
}

/// Outcome of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Write operations used by the import strategies
#[async_trait]
pub trait RecordSink<R: Sync>: Send {
    /// Largest batch a single [`RecordSink::insert_batch`] call accepts, `None` if unbounded
    fn max_batch_rows(&self) -> Option<usize> {
        None
    }

    /// Delete every existing record of the target collection, returns rows deleted
    async fn delete_all(&mut self) -> Result<u64>;

    /// Insert one batch with a single write call, returns rows inserted
    async fn insert_batch(&mut self, batch: &[R]) -> Result<u64>;

    /// Update the record with the same key, or insert it
    async fn upsert(&mut self, record: &R) -> Result<UpsertOutcome>;
}

/// [`RecordSink`] over a SQLite pool
///
/// The pool is passed in explicitly; there is no process-wide store handle.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn insert_prefix<R: TableRecord>() -> String {
    format!("INSERT INTO {} ({}) ", R::TABLE, R::COLUMNS.join(", "))
}

/// Rows per insert call that stay within [`MAX_BIND_PARAMETERS`]
fn max_rows<R: TableRecord>() -> usize {
    MAX_BIND_PARAMETERS / R::COLUMNS.len().max(1)
}

fn upsert_suffix<R: TableRecord>(key_column: &str) -> String {
    let mut assignments: Vec<String> = R::COLUMNS
        .iter()
        .filter(|column| **column != key_column)
        .map(|column| format!("{column} = excluded.{column}"))
        .collect();
    if let Some(column) = R::UPDATED_AT_COLUMN {
        assignments.push(format!("{column} = CURRENT_TIMESTAMP"));
    }

    if assignments.is_empty() {
        format!(" ON CONFLICT({}) DO NOTHING", key_column)
    } else {
        format!(
            " ON CONFLICT({}) DO UPDATE SET {}",
            key_column,
            assignments.join(", ")
        )
    }
}

#[async_trait]
impl<R: TableRecord + 'static> RecordSink<R> for SqliteSink {
    fn max_batch_rows(&self) -> Option<usize> {
        Some(max_rows::<R>())
    }

    async fn delete_all(&mut self) -> Result<u64> {
        let result = sqlx::query(&format!("DELETE FROM {}", R::TABLE))
            .execute(&self.pool)
            .await?;
        debug!(table = R::TABLE, rows = result.rows_affected(), "Deleted existing rows");
        Ok(result.rows_affected())
    }

    async fn insert_batch(&mut self, batch: &[R]) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        if batch.len() > max_rows::<R>() {
            return Err(Error::InvalidInput(format!(
                "batch of {} {} rows exceeds {} bound parameters, lower batch_size",
                batch.len(),
                R::TABLE,
                MAX_BIND_PARAMETERS
            )));
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(insert_prefix::<R>());
        builder.push_values(batch, |mut row, record| record.push_binds(&mut row));

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn upsert(&mut self, record: &R) -> Result<UpsertOutcome> {
        let (key_column, key) = match (R::KEY_COLUMN, record.key()) {
            (Some(column), Some(key)) => (column, key),
            _ => {
                return Err(Error::InvalidInput(format!(
                    "{} records have no upsert key",
                    R::TABLE
                )))
            }
        };

        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?)",
            R::TABLE,
            key_column
        ))
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(insert_prefix::<R>());
        builder.push_values(std::iter::once(record), |mut row, record| {
            record.push_binds(&mut row)
        });
        builder.push(upsert_suffix::<R>(key_column));
        builder.build().execute(&self.pool).await?;

        Ok(if exists {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }
}
