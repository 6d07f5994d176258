use std::path::PathBuf;

use thiserror::Error;

use crate::browser::BrowserError;
use crate::error::ConfigError;

pub type PublishResult<T> = Result<T, PublishError>;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish playbook unusable: {0}")]
    Playbook(#[from] ConfigError),
    #[error("step {step}: element {target:?} not found within budget")]
    StepNotFound { step: String, target: String },
    #[error("session invalid: composer redirected to {url}")]
    SessionInvalid { url: String },
    #[error("media file missing at {0}")]
    MissingMedia(PathBuf),
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
}

impl PublishError {
    /// An invalid session cannot be retried from inside the process; the
    /// orchestrator must exit instead of spinning against a login wall.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PublishError::SessionInvalid { .. })
    }
}
