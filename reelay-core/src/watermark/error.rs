use std::path::PathBuf;

use thiserror::Error;

pub type TranscodeResult<T> = Result<T, TranscodeError>;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("ffmpeg failed to launch: {0}")]
    Launch(String),
    #[error("ffmpeg exited with status {code:?}: {stderr}")]
    Tool { code: Option<i32>, stderr: String },
    #[error("transcode timed out for {0}")]
    Timeout(PathBuf),
    #[error("ffmpeg reported success but produced no file at {0}")]
    MissingOutput(PathBuf),
}
