//! Storage layer: the record sink seam, batched writes, and DuckDB persistence.

mod error;
pub use error::StoreError;

pub mod sink;
pub use sink::{ArticleSink, WriteReport, validate_destination, write_in_batches};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
#[cfg(any(test, feature = "testing"))]
pub use testing::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;
