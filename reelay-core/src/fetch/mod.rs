mod error;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tracing::{info, warn};

use crate::command::CommandRunner;
use crate::config::FetcherConfig;
use crate::source::ContentItem;

pub use error::{FetchError, FetchResult};

/// Resolves a locator to exactly one local media file. A failed fetch must
/// leave nothing behind that a later stage could mistake for success.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, item: &ContentItem, dest_dir: &Path) -> FetchResult<PathBuf>;
}

/// Drives the configured extractor (yt-dlp) as a subprocess. The download
/// is staged under a `.part` name and renamed into place only on success,
/// so partial artifacts never carry the final name either.
pub struct YtDlpFetcher {
    config: FetcherConfig,
    runner: Arc<dyn CommandRunner>,
}

impl YtDlpFetcher {
    pub fn new(config: FetcherConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    fn build_args(&self, url: &str, staging: &Path) -> Vec<String> {
        let download = &self.config.download;
        let mut args = vec![
            "-f".to_string(),
            download.format.clone(),
            "-o".to_string(),
            staging.display().to_string(),
            "--no-playlist".to_string(),
        ];
        if download.quiet {
            args.push("--quiet".to_string());
        }
        args.extend(download.extra_args.iter().cloned());
        args.push(url.to_string());
        args
    }

    async fn discard_partial(&self, staging: &Path) {
        match fs::remove_file(staging).await {
            Ok(()) => warn!(path = %staging.display(), "discarded partial download"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %staging.display(), error = %err, "failed to remove partial download"),
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, item: &ContentItem, dest_dir: &Path) -> FetchResult<PathBuf> {
        let output = dest_dir.join(format!("{}.mp4", item.id));
        let staging = dest_dir.join(format!("{}.mp4.part", item.id));
        let tool = PathBuf::from(&self.config.download.tool);
        let args = self.build_args(&item.url, &staging);
        let time_limit = Duration::from_secs(self.config.download.timeout_seconds);

        let result = self.runner.run(&tool, &args, time_limit).await;
        let command_output = match result {
            Ok(command_output) => command_output,
            Err(err) if err.kind() == io::ErrorKind::TimedOut => {
                self.discard_partial(&staging).await;
                return Err(FetchError::Timeout(item.url.clone()));
            }
            Err(err) => {
                self.discard_partial(&staging).await;
                return Err(FetchError::Launch(err.to_string()));
            }
        };

        if !command_output.success {
            self.discard_partial(&staging).await;
            return Err(FetchError::Tool {
                code: command_output.code,
                stderr: command_output.stderr,
            });
        }

        if !staging.exists() {
            return Err(FetchError::MissingOutput(staging));
        }
        fs::rename(&staging, &output)
            .await
            .map_err(|source| FetchError::Io {
                source,
                path: output.clone(),
            })?;
        info!(id = %item.id, path = %output.display(), "media fetched");
        Ok(output)
    }
}
