//! The storage collaborator seam and batched writing.

use async_trait::async_trait;
use tracing::{info, warn};

use lexcorpus_core::ArticleRecord;

use crate::StoreError;

/// Destination for finished record sets.
#[async_trait]
pub trait ArticleSink: Send + Sync {
    /// Insert one batch into `destination`. Returns the rows written.
    async fn insert_batch(
        &self,
        destination: &str,
        source_url: &str,
        records: &[ArticleRecord],
    ) -> Result<usize, StoreError>;
}

/// Check that `name` is a plain SQL identifier (letters, digits, underscore).
pub fn validate_destination(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= 63;
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidDestination(name.to_string()))
    }
}

/// Per-batch accounting for one write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub batches: usize,
    pub failed_batches: usize,
    pub written: usize,
    pub failed_records: usize,
    pub errors: Vec<String>,
}

impl WriteReport {
    /// At least one record reached the store.
    pub fn any_written(&self) -> bool {
        self.written > 0
    }
}

/// Write `records` in fixed-size batches; a failing batch does not stop the rest.
pub async fn write_in_batches(
    sink: &dyn ArticleSink,
    destination: &str,
    source_url: &str,
    records: &[ArticleRecord],
    batch_size: usize,
) -> WriteReport {
    let mut report = WriteReport::default();
    if let Err(e) = validate_destination(destination) {
        report.failed_records = records.len();
        report.errors.push(e.to_string());
        return report;
    }
    for (i, batch) in records.chunks(batch_size.max(1)).enumerate() {
        report.batches += 1;
        match sink.insert_batch(destination, source_url, batch).await {
            Ok(n) => report.written += n,
            Err(e) => {
                warn!(batch = i, size = batch.len(), error = %e, "batch insert failed");
                report.failed_batches += 1;
                report.failed_records += batch.len();
                report.errors.push(format!("batch {i}: {e}"));
            }
        }
    }
    info!(
        destination,
        written = report.written,
        failed_batches = report.failed_batches,
        "records written"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use lexcorpus_core::ArticleNumber;

    fn records(n: u32) -> Vec<ArticleRecord> {
        (1..=n)
            .map(|k| ArticleRecord::article(&ArticleNumber::new(k), "texto."))
            .collect()
    }

    #[test]
    fn destination_names() {
        assert!(validate_destination("lei_8078").is_ok());
        assert!(validate_destination("_x1").is_ok());
        assert!(validate_destination("1abc").is_err());
        assert!(validate_destination("a; DROP TABLE x").is_err());
        assert!(validate_destination("").is_err());
    }

    #[tokio::test]
    async fn writes_in_fixed_batches() {
        let store = MemoryStore::new();
        let report = write_in_batches(&store, "lei", "http://x", &records(45), 20).await;
        assert_eq!(report.batches, 3);
        assert_eq!(report.written, 45);
        assert_eq!(store.rows("lei").len(), 45);
    }

    #[tokio::test]
    async fn failed_batch_is_isolated() {
        let store = MemoryStore::new().failing_batches([1]);
        let report = write_in_batches(&store, "lei", "http://x", &records(45), 20).await;
        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.failed_records, 20);
        assert_eq!(report.written, 25);
        assert!(report.any_written());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(store.rows("lei").len(), 25);
    }

    #[tokio::test]
    async fn invalid_destination_writes_nothing() {
        let store = MemoryStore::new();
        let report = write_in_batches(&store, "bad name", "", &records(3), 20).await;
        assert_eq!(report.written, 0);
        assert_eq!(report.failed_records, 3);
        assert!(store.rows("bad name").is_empty());
    }
}
