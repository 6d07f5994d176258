use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReelayConfig {
    pub system: SystemSection,
    pub paths: PathsSection,
    pub source: SourceSection,
    pub schedule: ScheduleSection,
    pub caption: CaptionSection,
    pub health: HealthSection,
}

impl ReelayConfig {
    pub fn resolve_path<P: AsRef<Path>>(&self, candidate: P) -> PathBuf {
        let path = candidate.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.paths.base_dir).join(path)
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.resolve_path(&self.paths.ledger_file)
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.downloads_dir)
    }

    pub fn session_path(&self) -> PathBuf {
        self.resolve_path(&self.paths.session_file)
    }

    pub fn ui_steps_path(&self) -> PathBuf {
        self.resolve_path(&self.paths.ui_steps_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemSection {
    pub node_name: String,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    pub base_dir: String,
    pub downloads_dir: String,
    pub logs_dir: String,
    pub ledger_file: String,
    pub captions_file: String,
    pub hashtags_file: String,
    pub overlays_file: String,
    pub channels_file: String,
    pub session_file: String,
    pub ui_steps_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    pub mode: SourceMode,
    pub archive_index_url: Option<String>,
    pub scroll_passes: u32,
    pub scroll_pause_ms: [u64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    Shorts,
    Archive,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    pub quiet_start: String,
    pub quiet_end: String,
    pub success_cooldown_minutes: u64,
    pub failure_cooldown_minutes: u64,
    pub no_candidate_cooldown_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionSection {
    pub hashtag_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthSection {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    pub chromium: ChromiumSection,
    pub flags: FlagsSection,
    pub user_agents: UserAgentSection,
    pub viewport: ViewportSection,
    pub typing: TypingSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChromiumSection {
    pub executable_path: String,
    pub headless: bool,
    pub sandbox: bool,
    pub disable_gpu: bool,
    pub nav_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlagsSection {
    pub no_first_run: bool,
    pub disable_automation_controlled: bool,
    pub mute_audio: bool,
    pub lang: Option<String>,
    pub accept_language: Option<String>,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentSection {
    pub pool: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewportSection {
    pub resolutions: Vec<[u32; 2]>,
    pub jitter_pixels: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypingSection {
    pub cadence_cpm: [u32; 2],
    pub jitter_ms: [u32; 2],
    pub click_hesitation_ms: [u32; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    pub download: DownloadSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSection {
    pub tool: String,
    pub format: String,
    pub timeout_seconds: u64,
    pub quiet: bool,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkConfig {
    pub ffmpeg: FfmpegSection,
    pub brand: BrandSection,
    pub overlay: OverlaySection,
    pub frame: FrameSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FfmpegSection {
    pub binary: String,
    pub preset: String,
    pub threads: u32,
    pub max_muxing_queue_size: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrandSection {
    pub text: String,
    pub fontfile: String,
    pub fontsize: u32,
    pub fontcolor: String,
    pub boxcolor: String,
    pub boxborderw: u32,
    pub margin_x: u32,
    pub margin_y: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverlaySection {
    pub fontfile: String,
    pub fontsize: u32,
    pub fontcolor: String,
    pub borderw: u32,
    pub bordercolor: String,
    pub enable_start_s: f64,
    pub enable_end_s: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameSection {
    pub crop_factor: f64,
}

#[derive(Debug, Clone)]
pub struct ConfigBundle {
    pub reelay: ReelayConfig,
    pub browser: BrowserConfig,
    pub fetcher: FetcherConfig,
    pub watermark: WatermarkConfig,
}

impl ConfigBundle {
    pub fn from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let reelay = load_reelay_config(dir.join("reelay.toml"))?;
        let browser = load_browser_config(dir.join("browser.toml"))?;
        let fetcher = load_fetcher_config(dir.join("fetcher.toml"))?;
        let watermark = load_watermark_config(dir.join("watermark.toml"))?;
        Ok(Self {
            reelay,
            browser,
            fetcher,
            watermark,
        })
    }
}

pub fn load_reelay_config<P: AsRef<Path>>(path: P) -> Result<ReelayConfig> {
    load_toml(path)
}

pub fn load_browser_config<P: AsRef<Path>>(path: P) -> Result<BrowserConfig> {
    load_toml(path)
}

pub fn load_fetcher_config<P: AsRef<Path>>(path: P) -> Result<FetcherConfig> {
    load_toml(path)
}

pub fn load_watermark_config<P: AsRef<Path>>(path: P) -> Result<WatermarkConfig> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
