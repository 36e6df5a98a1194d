//! DuckDB persistence for statute records.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::Utc;
use duckdb::{Connection, params};
use tracing::{debug, info};

use lexcorpus_core::ArticleRecord;

use crate::StoreError;
use crate::sink::{ArticleSink, validate_destination};

/// DuckDB store holding one table per statute destination.
///
/// Each table carries the record columns plus the source URL and the
/// ingestion timestamp. Tables are created on first write.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Create the destination table if it does not exist yet.
    pub fn ensure_table(&self, destination: &str) -> Result<(), StoreError> {
        validate_destination(destination)?;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {destination} (
                number VARCHAR,
                text VARCHAR NOT NULL,
                ord BIGINT NOT NULL,
                kind VARCHAR NOT NULL,
                source_url VARCHAR,
                ingested_at TIMESTAMPTZ NOT NULL
            )"
        );
        self.lock()?.execute_batch(&sql)?;
        Ok(())
    }

    /// Insert records in one transaction. Returns the rows written.
    pub fn insert_records(
        &self,
        destination: &str,
        source_url: &str,
        records: &[ArticleRecord],
    ) -> Result<usize, StoreError> {
        self.ensure_table(destination)?;
        let now = Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {destination} (number, text, ord, kind, source_url, ingested_at)
                 VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMPTZ))"
            ))?;
            for r in records {
                stmt.execute(params![
                    r.number.as_deref(),
                    r.text.as_str(),
                    r.order,
                    r.kind.as_str(),
                    source_url,
                    now.as_str()
                ])?;
            }
        }
        tx.commit()?;
        debug!(destination, rows = records.len(), "inserted batch");
        Ok(records.len())
    }

    // ── Reads ──

    /// Number of rows in a destination table.
    pub fn count(&self, destination: &str) -> Result<usize, StoreError> {
        validate_destination(destination)?;
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {destination}");
        let batches = self.query_arrow(&sql)?;
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        Ok(col.value(0) as usize)
    }

    /// All records of a destination in document order.
    pub fn records(&self, destination: &str) -> Result<Vec<RecordBatch>, StoreError> {
        validate_destination(destination)?;
        self.query_arrow(&format!(
            "SELECT number, text, ord, kind FROM {destination} \
             ORDER BY ord, kind <> 'article', rowid"
        ))
    }

    /// Drop a destination table, if present.
    pub fn drop_destination(&self, destination: &str) -> Result<(), StoreError> {
        validate_destination(destination)?;
        self.lock()?
            .execute_batch(&format!("DROP TABLE IF EXISTS {destination}"))?;
        info!(destination, "dropped destination");
        Ok(())
    }

    /// Execute arbitrary SQL and return results as Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }
}

#[async_trait]
impl ArticleSink for DuckStore {
    async fn insert_batch(
        &self,
        destination: &str,
        source_url: &str,
        records: &[ArticleRecord],
    ) -> Result<usize, StoreError> {
        self.insert_records(destination, source_url, records)
    }
}
