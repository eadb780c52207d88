// LOADSLOT ERRORS
// EVERY FAILURE BETWEEN POLLING A COUNTER AND ADJUSTING available.
// THE LIBRARY RETURNS LoadError, THE BINARY WRAPS IT IN anyhow.

use thiserror::Error;

use crate::source::Sample;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("sample source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("sample does not advance past the last accepted one (previous {previous:?}, latest {latest:?})")]
    NonMonotonicSample { previous: Sample, latest: Sample },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::SourceUnavailable(e.to_string())
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
