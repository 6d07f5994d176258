use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::fetch::FetchError;
use crate::ledger::LedgerError;
use crate::pools::PoolError;
use crate::publish::PublishError;
use crate::source::SourceError;
use crate::watermark::TranscodeError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Everything a cycle can fail with. The orchestrator catches these at
/// the loop boundary and converts them into a cooldown and retry, unless
/// the error is fatal.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source failed: {0}")]
    Source(#[from] SourceError),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("transcode failed: {0}")]
    Transcode(#[from] TranscodeError),
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
    #[error("ledger failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error("pool failed: {0}")]
    Pool(#[from] PoolError),
    #[error("io error at {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
}

impl PipelineError {
    /// Which stage to blame in logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Source(_) => "source",
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Transcode(_) => "watermark",
            PipelineError::Publish(_) => "publish",
            PipelineError::Ledger(_) => "ledger",
            PipelineError::Pool(_) => "pools",
            PipelineError::Io { .. } => "io",
        }
    }

    /// Fatal errors end the process instead of the cycle. Today that is
    /// only an invalid publisher session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Publish(err) if err.is_fatal())
    }
}
