use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use reelay_core::{
    CommandRunner, LinePool, ProcessRunner, QuietWindow, SessionCookies, SourceMode, UiPlaybook,
};

use crate::{AppContext, DisplayFallback, Result};

const TOOL_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Serialize)]
pub struct CheckEntry {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl CheckEntry {
    fn ok(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            detail: detail.into(),
        }
    }

    fn warn(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn,
            detail: detail.into(),
        }
    }

    fn error(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            detail: detail.into(),
        }
    }
}

impl DisplayFallback for CheckEntry {
    fn display(&self) -> String {
        let status = match self.status {
            CheckStatus::Ok => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Error => "error",
        };
        format!("[{status}] {}: {}", self.name, self.detail)
    }
}

/// Preflight for a new deployment: every file, pool and external tool the
/// loop will touch, checked before anything long-running starts.
pub async fn execute(context: &AppContext) -> Result<Vec<CheckEntry>> {
    let reelay = &context.bundle.reelay;
    let mut results = Vec::new();

    results.push(check_schedule(
        &reelay.schedule.quiet_start,
        &reelay.schedule.quiet_end,
    ));

    results.push(check_pool(
        "captions",
        reelay.resolve_path(&reelay.paths.captions_file),
    ));
    results.push(check_pool(
        "hashtags",
        reelay.resolve_path(&reelay.paths.hashtags_file),
    ));
    results.push(check_pool(
        "overlays",
        reelay.resolve_path(&reelay.paths.overlays_file),
    ));
    if reelay.source.mode == SourceMode::Shorts {
        results.push(check_pool(
            "channels",
            reelay.resolve_path(&reelay.paths.channels_file),
        ));
    }

    results.push(check_session(reelay.session_path()));
    results.push(check_playbook(reelay.ui_steps_path()));
    results.push(check_directory("downloads_dir", &reelay.downloads_dir()));

    let runner = ProcessRunner;
    results.push(
        probe_tool(
            &runner,
            "yt-dlp",
            Path::new(&context.bundle.fetcher.download.tool),
            "--version",
        )
        .await,
    );
    results.push(
        probe_tool(
            &runner,
            "ffmpeg",
            Path::new(&context.bundle.watermark.ffmpeg.binary),
            "-version",
        )
        .await,
    );

    Ok(results)
}

fn check_schedule(start: &str, end: &str) -> CheckEntry {
    match QuietWindow::parse(start, end) {
        Ok(_) => CheckEntry::ok("quiet_window", format!("{start}-{end}")),
        Err(err) => CheckEntry::error("quiet_window", err.to_string()),
    }
}

fn check_pool(name: &str, path: PathBuf) -> CheckEntry {
    match LinePool::new(&path).load() {
        Ok(lines) => CheckEntry::ok(name, format!("{} entries", lines.len())),
        Err(err) => CheckEntry::error(name, err.to_string()),
    }
}

fn check_session(path: PathBuf) -> CheckEntry {
    match SessionCookies::load(&path) {
        Ok(cookies) => CheckEntry::ok("session", format!("{} cookies", cookies.len())),
        Err(err) => CheckEntry::error("session", err.to_string()),
    }
}

fn check_playbook(path: PathBuf) -> CheckEntry {
    match UiPlaybook::load(&path) {
        Ok(playbook) => CheckEntry::ok(
            "ui_steps",
            format!("version {}, {} steps", playbook.version, playbook.steps.len()),
        ),
        Err(err) => CheckEntry::error("ui_steps", err.to_string()),
    }
}

fn check_directory(name: &str, path: &Path) -> CheckEntry {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => CheckEntry::ok(name, path.display().to_string()),
        Ok(_) => CheckEntry::error(name, format!("{} is not a directory", path.display())),
        // created on first run
        Err(_) => CheckEntry::warn(name, format!("{} not found", path.display())),
    }
}

async fn probe_tool(
    runner: &ProcessRunner,
    name: &str,
    binary: &Path,
    version_flag: &str,
) -> CheckEntry {
    match runner
        .run(binary, &[version_flag.to_string()], TOOL_PROBE_TIMEOUT)
        .await
    {
        Ok(output) if output.success => {
            let version = output.stdout.lines().next().unwrap_or("unknown").trim();
            CheckEntry::ok(name, version)
        }
        Ok(output) => CheckEntry::error(
            name,
            format!("exited with status {:?}: {}", output.code, output.stderr),
        ),
        Err(err) => CheckEntry::error(name, format!("failed to launch: {err}")),
    }
}
