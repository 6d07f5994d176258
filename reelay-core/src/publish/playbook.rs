use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Versioned description of the composer flow. Selectors and labels live
/// here, not in code: the target UI has no stable contract, so the one
/// volatile part of the system must be editable without a rebuild. The
/// file is re-read on every publish attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct UiPlaybook {
    pub version: u32,
    pub composer_url: String,
    /// URL fragment that marks a bounce to the login page.
    pub login_marker: String,
    #[serde(rename = "step")]
    pub steps: Vec<UiStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiStep {
    pub name: String,
    pub action: StepAction,
    pub find_by: FindBy,
    pub target: String,
    /// Pause sampled uniformly from this range before the step runs.
    pub wait_ms: [u64; 2],
    /// How long to poll for the element before giving up.
    #[serde(default = "default_budget_ms")]
    pub budget_ms: u64,
    /// Optional steps (consent popups, transient dialogs) are skipped
    /// when their element never appears.
    #[serde(default)]
    pub optional: bool,
}

fn default_budget_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Click,
    Attach,
    TypeCaption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindBy {
    Css,
    SpanText,
    ButtonText,
    RoleText,
}

impl UiPlaybook {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            source,
            path: path.to_path_buf(),
        })?;
        let playbook: UiPlaybook =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                source,
                path: path.to_path_buf(),
            })?;
        if playbook.steps.is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                message: "playbook has no steps".to_string(),
            });
        }
        Ok(playbook)
    }
}
