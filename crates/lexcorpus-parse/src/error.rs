use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no html or markdown in source")]
    NoSource,

    #[error("source text too short: {chars} chars (minimum {min})")]
    TooShort { chars: usize, min: usize },
}
