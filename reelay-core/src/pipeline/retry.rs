use std::time::Duration;

use super::error::PipelineError;

/// The single place failure delays come from. Every error class maps to
/// one backoff; call sites never carry their own sleep constants.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub source: Duration,
    pub fetch: Duration,
    pub transcode: Duration,
    pub publish: Duration,
    pub persistence: Duration,
}

impl RetryPolicy {
    /// Derives the per-class schedule from the configured base failure
    /// cooldown: upstream hiccups retry sooner, publish failures wait
    /// longer because the composer UI is the least reliable collaborator.
    pub fn from_base(base: Duration) -> Self {
        Self {
            source: base / 2,
            fetch: base,
            transcode: base,
            publish: base * 2,
            persistence: base / 2,
        }
    }

    pub fn backoff(&self, error: &PipelineError) -> Duration {
        match error {
            PipelineError::Source(_) => self.source,
            PipelineError::Fetch(_) => self.fetch,
            PipelineError::Transcode(_) => self.transcode,
            PipelineError::Publish(_) => self.publish,
            PipelineError::Ledger(_) => self.persistence,
            PipelineError::Pool(_) => self.persistence,
            PipelineError::Io { .. } => self.persistence,
        }
    }

    /// Backoff after a publish attempt that completed but reported
    /// failure (no error to classify).
    pub fn rejected(&self) -> Duration {
        self.publish
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_base(Duration::from_secs(180))
    }
}
