use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("extractor failed to launch: {0}")]
    Launch(String),
    #[error("extractor exited with status {code:?}: {stderr}")]
    Tool { code: Option<i32>, stderr: String },
    #[error("download timed out: {0}")]
    Timeout(String),
    #[error("extractor reported success but produced no file at {0}")]
    MissingOutput(PathBuf),
    #[error("io error at {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
}
