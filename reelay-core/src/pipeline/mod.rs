mod error;
mod retry;
mod workdir;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use rand::thread_rng;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::fetch::MediaFetcher;
use crate::ledger::{LedgerStore, UsedSet};
use crate::pools::{CaptionBuilder, LinePool};
use crate::publish::Publisher;
use crate::schedule::QuietWindow;
use crate::source::{ContentItem, ContentSource};
use crate::watermark::Overlayer;

pub use error::{PipelineError, PipelineResult};
pub use retry::RetryPolicy;
pub use workdir::WorkDir;

/// Pauses between cycles that ended without an error.
#[derive(Debug, Clone, Copy)]
pub struct Cooldowns {
    pub success: Duration,
    pub no_candidate: Duration,
}

/// How one cycle ended. Errors are not outcomes; they propagate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Published and recorded.
    Published(String),
    /// The publisher completed but reported failure; nothing recorded.
    Rejected(String),
    /// The source had nothing fresh to offer.
    NoCandidate,
    /// Full rehearsal without the publish step; nothing recorded.
    DryRun(String),
}

/// Counters since process start. Exposed for the status command; never
/// persisted.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PipelineStats {
    pub cycles: u64,
    pub published: u64,
    pub rejected: u64,
    pub no_candidate: u64,
    pub failures: u64,
}

/// Drives the select-fetch-watermark-publish-record loop. All collaborators
/// come in behind their ports, so the loop itself never talks to a browser,
/// a subprocess or the network directly.
pub struct Orchestrator {
    source: Arc<dyn ContentSource>,
    fetcher: Arc<dyn MediaFetcher>,
    overlayer: Arc<dyn Overlayer>,
    publisher: Arc<dyn Publisher>,
    store: Arc<dyn LedgerStore>,
    captions: CaptionBuilder,
    overlays: LinePool,
    window: QuietWindow,
    retry: RetryPolicy,
    cooldowns: Cooldowns,
    workdir_root: PathBuf,
    used: UsedSet,
    dry_run: bool,
    stats: PipelineStats,
}

#[allow(clippy::too_many_arguments)]
impl Orchestrator {
    pub fn new(
        source: Arc<dyn ContentSource>,
        fetcher: Arc<dyn MediaFetcher>,
        overlayer: Arc<dyn Overlayer>,
        publisher: Arc<dyn Publisher>,
        store: Arc<dyn LedgerStore>,
        captions: CaptionBuilder,
        overlays: LinePool,
        window: QuietWindow,
        retry: RetryPolicy,
        cooldowns: Cooldowns,
        workdir_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
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
            workdir_root: workdir_root.into(),
            used: UsedSet::new(),
            dry_run: false,
            stats: PipelineStats::default(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn used(&self) -> &UsedSet {
        &self.used
    }

    /// Loads the ledger and sweeps scratch space left by a previous run.
    /// Must run once before the first cycle.
    pub async fn init(&mut self) -> PipelineResult<()> {
        self.used = self.store.load().await?;
        let swept =
            WorkDir::sweep_stale(&self.workdir_root).map_err(|source| PipelineError::Io {
                source,
                path: self.workdir_root.clone(),
            })?;
        info!(
            ledger_entries = self.used.len(),
            swept_workdirs = swept,
            dry_run = self.dry_run,
            "orchestrator ready"
        );
        Ok(())
    }

    /// One full cycle. The workdir is removed on every exit path; the
    /// ledger is touched only after the publisher confirmed success.
    pub async fn run_cycle(&mut self) -> PipelineResult<CycleOutcome> {
        self.stats.cycles += 1;

        let Some(item) = self.source.next_candidate(&self.used).await? else {
            self.stats.no_candidate += 1;
            info!("no fresh candidate available");
            return Ok(CycleOutcome::NoCandidate);
        };
        info!(id = %item.id, url = %item.url, "candidate selected");

        let work = WorkDir::create(&self.workdir_root).map_err(|source| PipelineError::Io {
            source,
            path: self.workdir_root.clone(),
        })?;
        let result = self.process(&item, work.path().to_path_buf()).await;
        if let Err(err) = work.cleanup().await {
            warn!(error = %err, "cycle workdir cleanup failed");
        }

        match result? {
            Verdict::Rejected => {
                self.stats.rejected += 1;
                warn!(id = %item.id, "publisher reported failure, item stays unrecorded");
                Ok(CycleOutcome::Rejected(item.id))
            }
            Verdict::DryRun => {
                info!(id = %item.id, "dry run complete, item stays unrecorded");
                Ok(CycleOutcome::DryRun(item.id))
            }
            Verdict::Published => {
                self.used.insert(item.id.clone());
                self.store.record(&self.used).await?;
                self.stats.published += 1;
                info!(id = %item.id, total = self.used.len(), "published and recorded");
                Ok(CycleOutcome::Published(item.id))
            }
        }
    }

    async fn process(&self, item: &ContentItem, work: PathBuf) -> PipelineResult<Verdict> {
        let raw = self.fetcher.fetch(item, &work).await?;
        info!(id = %item.id, file = %raw.display(), "media fetched");

        // RNG is scoped so it is never held across an await.
        let (overlay_text, caption) = {
            let mut rng = thread_rng();
            let overlay_text = self.overlays.pick_one(&mut rng)?;
            let caption = self.captions.compose(&mut rng)?;
            (overlay_text, caption)
        };

        let branded = self.overlayer.apply(&raw, &overlay_text).await?;

        if self.dry_run {
            info!(id = %item.id, file = %branded.display(), "dry run: skipping publish");
            return Ok(Verdict::DryRun);
        }
        if self.publisher.publish(&branded, &caption).await? {
            Ok(Verdict::Published)
        } else {
            Ok(Verdict::Rejected)
        }
    }

    /// The long-running loop: sleep through the quiet window, run a cycle,
    /// cool down, repeat. Returns only on a fatal error.
    pub async fn run_forever(&mut self) -> PipelineResult<()> {
        loop {
            let now = Local::now().naive_local();
            if self.window.is_quiet(now) {
                let wake = self.window.wake_time(now);
                info!(until = %wake, "quiet window, sleeping");
                sleep_until(now, wake).await;
                continue;
            }

            let cooldown = match self.run_cycle().await {
                Ok(CycleOutcome::Published(_)) | Ok(CycleOutcome::DryRun(_)) => {
                    self.cooldowns.success
                }
                Ok(CycleOutcome::Rejected(_)) => self.retry.rejected(),
                Ok(CycleOutcome::NoCandidate) => self.cooldowns.no_candidate,
                Err(err) if err.is_fatal() => {
                    error!(stage = err.stage(), error = %err, "fatal error, stopping");
                    return Err(err);
                }
                Err(err) => {
                    self.stats.failures += 1;
                    let backoff = self.retry.backoff(&err);
                    error!(
                        stage = err.stage(),
                        error = %err,
                        backoff_secs = backoff.as_secs(),
                        "cycle failed"
                    );
                    backoff
                }
            };

            let now = Local::now().naive_local();
            let next_run = self.window.clip(now + to_chrono(cooldown));
            info!(until = %next_run, "cooling down");
            sleep_until(now, next_run).await;
        }
    }
}

enum Verdict {
    Published,
    Rejected,
    DryRun,
}

fn to_chrono(duration: Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::seconds(60))
}

async fn sleep_until(now: NaiveDateTime, target: NaiveDateTime) {
    if target <= now {
        return;
    }
    let wait = (target - now).to_std().unwrap_or_default();
    tokio::time::sleep(wait).await;
}
