use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use reelay_core::fetch::FetchResult;
use reelay_core::publish::{PublishError, PublishResult};
use reelay_core::source::SourceResult;
use reelay_core::watermark::TranscodeResult;
use reelay_core::{
    CaptionBuilder, ContentItem, ContentSource, Cooldowns, CycleOutcome, LedgerStore, LinePool,
    MediaFetcher, MemoryLedgerStore, Orchestrator, Overlayer, PipelineError, Publisher,
    QuietWindow, RetryPolicy, UsedSet,
};

struct QueueSource {
    items: Mutex<Vec<ContentItem>>,
}

impl QueueSource {
    fn new(urls: &[&str]) -> Self {
        Self {
            items: Mutex::new(urls.iter().rev().map(|url| ContentItem::new(*url)).collect()),
        }
    }
}

#[async_trait]
impl ContentSource for QueueSource {
    async fn next_candidate(&self, used: &UsedSet) -> SourceResult<Option<ContentItem>> {
        let mut items = self.items.lock().unwrap();
        while let Some(item) = items.pop() {
            if !used.contains(&item.id) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }
}

struct FileWritingFetcher;

#[async_trait]
impl MediaFetcher for FileWritingFetcher {
    async fn fetch(&self, item: &ContentItem, dest_dir: &Path) -> FetchResult<PathBuf> {
        let path = dest_dir.join(format!("{}.mp4", item.id));
        std::fs::write(&path, b"raw clip").unwrap();
        Ok(path)
    }
}

struct CopyingOverlayer;

#[async_trait]
impl Overlayer for CopyingOverlayer {
    async fn apply(&self, input: &Path, _overlay_text: &str) -> TranscodeResult<PathBuf> {
        let output = input.with_extension("wm.mp4");
        std::fs::copy(input, &output).unwrap();
        Ok(output)
    }
}

enum Behavior {
    Accept,
    Reject,
    FailStep,
    FailSession,
}

struct ScriptedPublisher {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl ScriptedPublisher {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    async fn publish(&self, file: &Path, caption: &str) -> PublishResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(file.exists(), "publisher must receive an existing file");
        assert!(caption.contains('#'), "caption must carry hashtags");
        match self.behavior {
            Behavior::Accept => Ok(true),
            Behavior::Reject => Ok(false),
            Behavior::FailStep => Err(PublishError::StepNotFound {
                step: "submit".to_string(),
                target: "Share".to_string(),
            }),
            Behavior::FailSession => Err(PublishError::SessionInvalid {
                url: "https://www.instagram.com/accounts/login/".to_string(),
            }),
        }
    }
}

struct Harness {
    orchestrator: Orchestrator,
    store: Arc<MemoryLedgerStore>,
    publisher: Arc<ScriptedPublisher>,
    downloads: TempDir,
    _pools: TempDir,
}

fn harness(urls: &[&str], behavior: Behavior, dry_run: bool) -> Harness {
    let pools = TempDir::new().unwrap();
    std::fs::write(pools.path().join("captions.txt"), "great clip\n").unwrap();
    std::fs::write(pools.path().join("hashtags.txt"), "#a\n#b\n#c\n").unwrap();
    std::fs::write(pools.path().join("overlays.txt"), "wait for it\n").unwrap();
    let captions = CaptionBuilder::new(
        LinePool::new(pools.path().join("captions.txt")),
        LinePool::new(pools.path().join("hashtags.txt")),
        2,
    );
    let overlays = LinePool::new(pools.path().join("overlays.txt"));

    let downloads = TempDir::new().unwrap();
    let store = Arc::new(MemoryLedgerStore::new());
    let publisher = ScriptedPublisher::new(behavior);

    let orchestrator = Orchestrator::new(
        Arc::new(QueueSource::new(urls)),
        Arc::new(FileWritingFetcher),
        Arc::new(CopyingOverlayer),
        publisher.clone(),
        store.clone(),
        captions,
        overlays,
        QuietWindow::parse("22:00", "09:00").unwrap(),
        RetryPolicy::from_base(Duration::from_secs(60)),
        Cooldowns {
            success: Duration::from_secs(1),
            no_candidate: Duration::from_secs(1),
        },
        downloads.path(),
    )
    .with_dry_run(dry_run);

    Harness {
        orchestrator,
        store,
        publisher,
        downloads,
        _pools: pools,
    }
}

fn cycle_dirs(root: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(root)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("cycle-"))
        })
        .collect()
}

const SHORT_A: &str = "https://www.youtube.com/shorts/aaaaaaaaaaa";
const SHORT_B: &str = "https://www.youtube.com/shorts/bbbbbbbbbbb";

#[tokio::test]
async fn published_item_is_recorded_and_workdir_removed() {
    let mut h = harness(&[SHORT_A], Behavior::Accept, false);
    h.orchestrator.init().await.unwrap();

    let outcome = h.orchestrator.run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Published("aaaaaaaaaaa".to_string()));

    let recorded = h.store.load().await.unwrap();
    assert!(recorded.contains("aaaaaaaaaaa"));
    assert_eq!(recorded.len(), 1);
    assert!(cycle_dirs(h.downloads.path()).is_empty());
    assert_eq!(h.publisher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_item_is_not_recorded() {
    let mut h = harness(&[SHORT_A], Behavior::Reject, false);
    h.orchestrator.init().await.unwrap();

    let outcome = h.orchestrator.run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Rejected("aaaaaaaaaaa".to_string()));
    assert!(h.store.load().await.unwrap().is_empty());
    assert!(cycle_dirs(h.downloads.path()).is_empty());
}

#[tokio::test]
async fn publish_failure_cleans_up_and_is_retryable() {
    let mut h = harness(&[SHORT_A], Behavior::FailStep, false);
    h.orchestrator.init().await.unwrap();

    let err = h.orchestrator.run_cycle().await.unwrap_err();
    assert!(matches!(err, PipelineError::Publish(_)));
    assert!(!err.is_fatal());
    assert!(h.store.load().await.unwrap().is_empty());
    assert!(cycle_dirs(h.downloads.path()).is_empty());
}

#[tokio::test]
async fn invalid_session_is_fatal() {
    let mut h = harness(&[SHORT_A], Behavior::FailSession, false);
    h.orchestrator.init().await.unwrap();

    let err = h.orchestrator.run_cycle().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(h.store.load().await.unwrap().is_empty());
    assert!(cycle_dirs(h.downloads.path()).is_empty());
}

#[tokio::test]
async fn exhausted_source_reports_no_candidate() {
    let mut h = harness(&[], Behavior::Accept, false);
    h.orchestrator.init().await.unwrap();

    let outcome = h.orchestrator.run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::NoCandidate);
    assert_eq!(h.publisher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dry_run_publishes_and_records_nothing() {
    let mut h = harness(&[SHORT_A], Behavior::Accept, true);
    h.orchestrator.init().await.unwrap();

    let outcome = h.orchestrator.run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::DryRun("aaaaaaaaaaa".to_string()));
    assert!(h.store.load().await.unwrap().is_empty());
    assert_eq!(h.publisher.calls.load(Ordering::SeqCst), 0);
    assert!(cycle_dirs(h.downloads.path()).is_empty());
}

#[tokio::test]
async fn published_items_are_skipped_on_later_cycles() {
    let mut h = harness(&[SHORT_A, SHORT_A, SHORT_B], Behavior::Accept, false);
    h.orchestrator.init().await.unwrap();

    assert_eq!(
        h.orchestrator.run_cycle().await.unwrap(),
        CycleOutcome::Published("aaaaaaaaaaa".to_string())
    );
    // the duplicate locator is filtered by the used-set
    assert_eq!(
        h.orchestrator.run_cycle().await.unwrap(),
        CycleOutcome::Published("bbbbbbbbbbb".to_string())
    );
    assert_eq!(
        h.orchestrator.run_cycle().await.unwrap(),
        CycleOutcome::NoCandidate
    );
    assert_eq!(h.store.load().await.unwrap().len(), 2);
}

#[tokio::test]
async fn init_sweeps_stale_workdirs() {
    let h = harness(&[], Behavior::Accept, false);
    let stale = h.downloads.path().join("cycle-deadbeef");
    std::fs::create_dir(&stale).unwrap();
    std::fs::write(stale.join("orphan.mp4"), b"leftover").unwrap();

    let mut orchestrator = h.orchestrator;
    orchestrator.init().await.unwrap();
    assert!(!stale.exists());
}
