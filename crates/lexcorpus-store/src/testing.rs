//! In-memory sink with failure injection, for pipeline tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use lexcorpus_core::ArticleRecord;

use crate::StoreError;
use crate::sink::ArticleSink;

/// In-memory sink, keyed by destination.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Vec<ArticleRecord>>>,
    fail_batches: BTreeSet<usize>,
    calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the listed zero-based batch calls fail.
    pub fn failing_batches(mut self, batches: impl IntoIterator<Item = usize>) -> Self {
        self.fail_batches = batches.into_iter().collect();
        self
    }

    /// Rows stored under `destination`.
    pub fn rows(&self, destination: &str) -> Vec<ArticleRecord> {
        self.tables
            .lock()
            .ok()
            .and_then(|t| t.get(destination).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ArticleSink for MemoryStore {
    async fn insert_batch(
        &self,
        destination: &str,
        _source_url: &str,
        records: &[ArticleRecord],
    ) -> Result<usize, StoreError> {
        let call = {
            let mut calls = self.calls.lock().map_err(|_| StoreError::Poisoned)?;
            *calls += 1;
            *calls - 1
        };
        if self.fail_batches.contains(&call) {
            return Err(StoreError::Other(format!("injected failure on batch {call}")));
        }
        let mut tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        tables
            .entry(destination.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(records.len())
    }
}
