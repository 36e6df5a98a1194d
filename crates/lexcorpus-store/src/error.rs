use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid destination name: {0:?}")]
    InvalidDestination(String),

    #[error("no results for query")]
    NoResults,

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("{0}")]
    Other(String),
}
