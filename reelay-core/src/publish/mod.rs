mod error;
mod playbook;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::browser::{BrowserError, BrowserSession};

pub use error::{PublishError, PublishResult};
pub use playbook::{FindBy, StepAction, UiPlaybook, UiStep};

/// Hands a finished file and caption to the composer UI. `Ok(true)` means
/// confirmed (or assumed) success; only then may the item be recorded.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, file: &Path, caption: &str) -> PublishResult<bool>;
}

/// Executes the externally configured playbook against a browser session,
/// strictly in order. Any required step that cannot find its element
/// aborts the whole attempt; there is no partial-progress resumption.
pub struct ReelsPublisher {
    session: Arc<BrowserSession>,
    playbook_path: PathBuf,
}

impl ReelsPublisher {
    pub fn new(session: Arc<BrowserSession>, playbook_path: impl Into<PathBuf>) -> Self {
        Self {
            session,
            playbook_path: playbook_path.into(),
        }
    }

    async fn run_step(
        &self,
        step: &UiStep,
        file: &Path,
        caption: &str,
    ) -> PublishResult<bool> {
        self.session.pacing().pause_in(step.wait_ms).await;
        let budget = Duration::from_millis(step.budget_ms);

        let found = match step.find_by {
            FindBy::Css => self.session.wait_for_css(&step.target, budget).await,
            FindBy::SpanText => self.session.wait_for_text("span", &step.target, budget).await,
            FindBy::ButtonText => {
                self.session
                    .wait_for_text("button", &step.target, budget)
                    .await
            }
            FindBy::RoleText => {
                self.session
                    .wait_for_text("div[role=button]", &step.target, budget)
                    .await
            }
        };

        let element = match found {
            Ok(element) => element,
            Err(BrowserError::Timeout(_)) if step.optional => {
                debug!(step = %step.name, "optional step target absent, skipping");
                return Ok(false);
            }
            Err(BrowserError::Timeout(_)) => {
                return Err(PublishError::StepNotFound {
                    step: step.name.clone(),
                    target: step.target.clone(),
                })
            }
            Err(err) => return Err(err.into()),
        };

        match step.action {
            StepAction::Click => self.session.click(&element).await?,
            StepAction::Attach => self.session.attach_file(&element, file).await?,
            StepAction::TypeCaption => self.session.type_text(&element, caption).await?,
        }
        debug!(step = %step.name, "playbook step done");
        Ok(true)
    }
}

#[async_trait]
impl Publisher for ReelsPublisher {
    async fn publish(&self, file: &Path, caption: &str) -> PublishResult<bool> {
        if !file.exists() {
            return Err(PublishError::MissingMedia(file.to_path_buf()));
        }
        // Hot reload: selector drift is fixed by editing the playbook, so
        // every attempt reads the current file.
        let playbook = UiPlaybook::load(&self.playbook_path)?;
        info!(
            version = playbook.version,
            steps = playbook.steps.len(),
            "starting publish attempt"
        );

        self.session.goto(&playbook.composer_url).await?;
        let landed = self.session.current_url().await?;
        if landed.contains(&playbook.login_marker) {
            warn!(url = %landed, "composer bounced to login");
            return Err(PublishError::SessionInvalid { url: landed });
        }

        for step in &playbook.steps {
            self.run_step(step, file, caption).await?;
        }

        info!(version = playbook.version, "publish attempt completed");
        Ok(true)
    }
}
