//! Ingestion layer: collaborator seams for page fetching and the alternate
//! corpus, the gap-recovery orchestrator, and the end-to-end pipeline.

pub mod fetch;
#[cfg(feature = "http")]
pub mod http;
pub mod pipeline;
pub mod progress;
pub mod recovery;

#[cfg(test)]
mod testing;

pub use fetch::{CorpusLookup, CorpusStatute, FetchOptions, FetchedPage, PageFetcher};
#[cfg(feature = "http")]
pub use http::{CorpusClient, ScrapeClient, SyncError};
pub use pipeline::{IngestError, IngestOutcome, IngestRequest, Pipeline, RunMode};
pub use progress::Progress;
pub use recovery::{RecoveryMethod, RecoveryRun, RecoveryStep};
