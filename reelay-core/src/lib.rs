pub mod browser;
pub mod command;
pub mod config;
pub mod error;
pub mod fetch;
pub mod health;
pub mod ledger;
pub mod pipeline;
pub mod pools;
pub mod publish;
pub mod schedule;
pub mod source;
pub mod watermark;

pub use browser::{
    BrowserAutomation, BrowserError, BrowserLauncher, BrowserResult, BrowserSession, HumanPacing,
    SessionCookies, ViewportSpec,
};
pub use command::{CommandOutput, CommandRunner, ProcessRunner};
pub use config::{
    BrowserConfig, ConfigBundle, FetcherConfig, ReelayConfig, SourceMode, WatermarkConfig,
};
pub use error::{ConfigError, Result};
pub use fetch::{FetchError, FetchResult, MediaFetcher, YtDlpFetcher};
pub use ledger::{
    JsonLedgerStore, LedgerError, LedgerResult, LedgerStore, MemoryLedgerStore, UsedSet,
};
pub use pipeline::{
    Cooldowns, CycleOutcome, Orchestrator, PipelineError, PipelineResult, PipelineStats,
    RetryPolicy, WorkDir,
};
pub use pools::{CaptionBuilder, LinePool, PoolError, PoolResult};
pub use publish::{
    FindBy, PublishError, PublishResult, Publisher, ReelsPublisher, StepAction, UiPlaybook, UiStep,
};
pub use schedule::{QuietWindow, ScheduleError, ScheduleResult};
pub use source::{
    ArchiveSource, ContentItem, ContentSource, ShortsChannelSource, SourceError, SourceResult,
};
pub use watermark::{
    escape_drawtext, FfmpegWatermarker, Overlayer, TranscodeError, TranscodeResult,
};
