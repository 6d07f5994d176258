mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use reelay_core::{BrowserError, ConfigBundle, LedgerError, PipelineError, ScheduleError};

pub use commands::doctor::CheckStatus;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] reelay_core::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
    #[error("source error: {0}")]
    Source(#[from] reelay_core::SourceError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("required resource missing: {0}")]
    MissingResource(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("one or more checks failed")]
    ChecksFailed,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Reelay command-line control interface", long_about = None)]
pub struct Cli {
    /// Directory holding reelay.toml, browser.toml, fetcher.toml and
    /// watermark.toml
    #[arg(long, default_value = "configs")]
    pub config_dir: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the repost loop (or a single cycle with --once)
    Run(RunArgs),
    /// Show node, schedule and ledger status
    Status,
    /// Inspect or amend the used-items ledger
    #[command(subcommand)]
    Ledger(LedgerCommands),
    /// Evaluate the quiet window
    #[command(subcommand)]
    Schedule(ScheduleCommands),
    /// Check configs, pools, session blob and external tools
    Doctor,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run exactly one cycle and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,
    /// Full rehearsal: fetch and watermark but never publish or record
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum LedgerCommands {
    /// List recorded item IDs
    List(LedgerListArgs),
    /// Remove one ID so the item becomes eligible again
    Forget(LedgerForgetArgs),
}

#[derive(Args, Debug)]
pub struct LedgerListArgs {
    /// Maximum number of IDs to print
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct LedgerForgetArgs {
    /// The item ID to remove
    pub id: String,
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// Report whether an instant falls inside the quiet window
    Check(ScheduleCheckArgs),
}

#[derive(Args, Debug)]
pub struct ScheduleCheckArgs {
    /// Instant to evaluate: HH:MM (today) or YYYY-MM-DDTHH:MM (defaults to now)
    #[arg(long)]
    pub at: Option<String>,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn run(cli: Cli) -> Result<()> {
    let context = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Run(args) => {
            let report = commands::run::execute(&context, args).await?;
            render(&report, cli.format)?;
        }
        Commands::Status => {
            let status = commands::ops::status(&context).await?;
            render(&status, cli.format)?;
        }
        Commands::Ledger(LedgerCommands::List(args)) => {
            let list = commands::ops::ledger_list(&context, args).await?;
            render(&list, cli.format)?;
        }
        Commands::Ledger(LedgerCommands::Forget(args)) => {
            let result = commands::ops::ledger_forget(&context, args).await?;
            render(&result, cli.format)?;
        }
        Commands::Schedule(ScheduleCommands::Check(args)) => {
            let report = commands::ops::schedule_check(&context, args)?;
            render(&report, cli.format)?;
        }
        Commands::Doctor => {
            let report = commands::doctor::execute(&context).await?;
            render(&report, cli.format)?;
            if report
                .iter()
                .any(|entry| matches!(entry.status, CheckStatus::Error))
            {
                return Err(AppError::ChecksFailed);
            }
        }
    }

    Ok(())
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

impl<T: DisplayFallback> DisplayFallback for Vec<T> {
    fn display(&self) -> String {
        self.iter()
            .map(DisplayFallback::display)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug)]
pub struct AppContext {
    pub bundle: ConfigBundle,
    pub config_dir: PathBuf,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let bundle = ConfigBundle::from_directory(&cli.config_dir)?;
        Ok(Self {
            bundle,
            config_dir: cli.config_dir.clone(),
        })
    }
}
