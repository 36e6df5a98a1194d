//! Human-readable progress stream for observers of a running ingestion.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::info;

/// Append-only progress sink. Every line is also logged.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    tx: Option<UnboundedSender<String>>,
}

impl Progress {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    /// A connected sink and its receiving end.
    pub fn channel() -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, line: impl Into<String>) {
        let line = line.into();
        info!(target: "lexcorpus::progress", "{line}");
        if let Some(tx) = &self.tx {
            // A dropped receiver just means nobody is watching.
            let _ = tx.send(line);
        }
    }
}
