use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use reelay_core::{
    BrowserLauncher, CaptionBuilder, CommandRunner, ContentSource, Cooldowns, CycleOutcome,
    FfmpegWatermarker, JsonLedgerStore, LinePool, Orchestrator, PipelineStats, ProcessRunner,
    QuietWindow, ReelsPublisher, RetryPolicy, SessionCookies, SourceMode, YtDlpFetcher,
};
use reelay_core::source::{ArchiveSource, ShortsChannelSource};

use crate::{AppContext, AppError, DisplayFallback, Result, RunArgs};

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub mode: &'static str,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    pub stats: PipelineStats,
}

impl DisplayFallback for RunReport {
    fn display(&self) -> String {
        let outcome = self.outcome.as_deref().unwrap_or("loop ended");
        format!(
            "mode={} dry_run={} outcome={} cycles={} published={} failures={}",
            self.mode,
            self.dry_run,
            outcome,
            self.stats.cycles,
            self.stats.published,
            self.stats.failures
        )
    }
}

/// Wires every port to its production adapter and hands control to the
/// orchestrator.
pub async fn execute(context: &AppContext, args: &RunArgs) -> Result<RunReport> {
    let bundle = &context.bundle;
    let reelay = &bundle.reelay;

    if reelay.health.enabled {
        let addr: SocketAddr = format!("{}:{}", reelay.health.bind, reelay.health.port)
            .parse()
            .map_err(|_| {
                AppError::InvalidArgument(format!(
                    "health bind {}:{} is not an address",
                    reelay.health.bind, reelay.health.port
                ))
            })?;
        reelay_core::health::spawn(addr).await?;
    }

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner);
    let fetcher = Arc::new(YtDlpFetcher::new(bundle.fetcher.clone(), runner.clone()));
    let overlayer = Arc::new(FfmpegWatermarker::new(bundle.watermark.clone(), runner));
    let store = Arc::new(JsonLedgerStore::new(reelay.ledger_path()));

    let captions = CaptionBuilder::new(
        LinePool::new(reelay.resolve_path(&reelay.paths.captions_file)),
        LinePool::new(reelay.resolve_path(&reelay.paths.hashtags_file)),
        reelay.caption.hashtag_count,
    );
    let overlays = LinePool::new(reelay.resolve_path(&reelay.paths.overlays_file));

    // Session blob is validated before any browser work; a missing or
    // empty blob is unrecoverable from inside the process.
    let cookies = SessionCookies::load(reelay.session_path())?;

    let launcher = BrowserLauncher::new(bundle.browser.clone());
    let automation = launcher.launch().await?;
    let session = Arc::new(automation.new_session().await?);
    session.install_cookies(cookies.to_params()?).await?;

    let source: Arc<dyn ContentSource> = match reelay.source.mode {
        SourceMode::Shorts => Arc::new(ShortsChannelSource::new(
            session.clone(),
            LinePool::new(reelay.resolve_path(&reelay.paths.channels_file)),
            &reelay.source,
        )),
        SourceMode::Archive => Arc::new(ArchiveSource::new(
            reelay.source.archive_index_url.clone(),
        )?),
    };
    let publisher = Arc::new(ReelsPublisher::new(session, reelay.ui_steps_path()));

    let schedule = &reelay.schedule;
    let window = QuietWindow::parse(&schedule.quiet_start, &schedule.quiet_end)?;
    let retry = RetryPolicy::from_base(Duration::from_secs(
        schedule.failure_cooldown_minutes * 60,
    ));
    let cooldowns = Cooldowns {
        success: Duration::from_secs(schedule.success_cooldown_minutes * 60),
        no_candidate: Duration::from_secs(schedule.no_candidate_cooldown_seconds),
    };

    let mut orchestrator = Orchestrator::new(
        source,
        fetcher,
        overlayer,
        publisher,
        store,
        captions,
        overlays,
        window,
        retry,
        cooldowns,
        reelay.downloads_dir(),
    )
    .with_dry_run(args.dry_run);
    orchestrator.init().await?;

    let run_result = if args.once {
        orchestrator.run_cycle().await.map(Some)
    } else {
        orchestrator.run_forever().await.map(|()| None)
    };
    let stats = orchestrator.stats();

    if let Err(err) = automation.shutdown().await {
        warn!(error = %err, "browser shutdown failed");
    }

    let outcome = run_result?;
    Ok(RunReport {
        mode: if args.once { "once" } else { "loop" },
        dry_run: args.dry_run,
        outcome: outcome.map(describe),
        stats,
    })
}

fn describe(outcome: CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Published(id) => format!("published {id}"),
        CycleOutcome::Rejected(id) => format!("rejected {id}"),
        CycleOutcome::NoCandidate => "no candidate".to_string(),
        CycleOutcome::DryRun(id) => format!("dry run {id}"),
    }
}
