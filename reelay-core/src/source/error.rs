use thiserror::Error;

use crate::browser::BrowserError;
use crate::pools::PoolError;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
    #[error("archive index fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("archive source requires an index url")]
    MissingIndexUrl,
}
