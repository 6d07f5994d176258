use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport as ChromiumViewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::{seq::SliceRandom, thread_rng, Rng};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;

use super::error::{BrowserError, BrowserResult};
use super::human::HumanPacing;

#[derive(Debug, Clone)]
pub struct ViewportSpec {
    pub width: u32,
    pub height: u32,
}

/// Builds and launches Chromium instances with a randomized viewport and
/// user agent drawn from the configured pools.
#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    config: Arc<BrowserConfig>,
}

impl BrowserLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub async fn launch(&self) -> BrowserResult<BrowserAutomation> {
        let viewport = self.select_viewport();
        let user_agent = self.select_user_agent();
        let chromium_config = self.build_chromium_config(&viewport, &user_agent)?;
        info!(
            ua = %user_agent,
            width = viewport.width,
            height = viewport.height,
            headless = self.config.chromium.headless,
            "launching Chromium instance"
        );

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "chromium handler reported error");
                }
            }
        });

        Ok(BrowserAutomation {
            browser,
            handler_task: Some(handler_task),
            config: Arc::clone(&self.config),
            user_agent,
            viewport,
        })
    }

    fn select_viewport(&self) -> ViewportSpec {
        let mut rng = thread_rng();
        let base = self
            .config
            .viewport
            .resolutions
            .choose(&mut rng)
            .cloned()
            .unwrap_or([1366, 768]);
        let jitter = self.config.viewport.jitter_pixels as i32;
        let width = (base[0] as i32 + rng.gen_range(-jitter..=jitter)).clamp(640, 2560) as u32;
        let height = (base[1] as i32 + rng.gen_range(-jitter..=jitter)).clamp(480, 1600) as u32;
        ViewportSpec { width, height }
    }

    fn select_user_agent(&self) -> String {
        let mut rng = thread_rng();
        self.config
            .user_agents
            .pool
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_4) AppleWebKit/605.1.15 (KHTML, like Gecko)"
                    .to_string()
            })
    }

    fn build_chromium_config(
        &self,
        viewport: &ViewportSpec,
        user_agent: &str,
    ) -> BrowserResult<ChromiumConfig> {
        let mut builder = ChromiumConfig::builder()
            .chrome_executable(&self.config.chromium.executable_path)
            .viewport(ChromiumViewport {
                width: viewport.width,
                height: viewport.height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: viewport.width >= viewport.height,
                has_touch: false,
            });

        if !self.config.chromium.headless {
            builder = builder.with_head();
        }
        if !self.config.chromium.sandbox {
            builder = builder.no_sandbox();
        }
        builder = builder.request_timeout(Duration::from_secs(
            self.config.chromium.nav_timeout_seconds,
        ));

        let mut args = vec![
            format!("--user-agent={user_agent}"),
            format!("--window-size={},{}", viewport.width, viewport.height),
        ];
        if self.config.chromium.disable_gpu {
            args.push("--disable-gpu".into());
        }
        if self.config.flags.mute_audio {
            args.push("--mute-audio".into());
        }
        if self.config.flags.no_first_run {
            args.push("--no-first-run".into());
        }
        if self.config.flags.disable_automation_controlled {
            args.push("--disable-features=AutomationControlled".into());
            args.push("--disable-blink-features=AutomationControlled".into());
        }
        if let Some(lang) = &self.config.flags.lang {
            args.push(format!("--lang={lang}"));
        }
        if let Some(accept) = &self.config.flags.accept_language {
            args.push(format!("--accept-lang={accept}"));
        }
        args.extend(self.config.flags.extra_args.iter().cloned());
        builder = builder.args(args);

        builder.build().map_err(BrowserError::Configuration)
    }
}

/// A running Chromium instance plus its CDP event pump.
#[derive(Debug)]
pub struct BrowserAutomation {
    browser: Browser,
    handler_task: Option<JoinHandle<()>>,
    config: Arc<BrowserConfig>,
    user_agent: String,
    viewport: ViewportSpec,
}

impl BrowserAutomation {
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn viewport(&self) -> &ViewportSpec {
        &self.viewport
    }

    pub async fn new_session(&self) -> BrowserResult<BrowserSession> {
        let page = self.browser.new_page("about:blank").await?;
        page.enable_stealth_mode_with_agent(&self.user_agent)
            .await?;
        Ok(BrowserSession {
            page,
            pacing: HumanPacing::new(self.config.typing.clone()),
            nav_timeout: Duration::from_secs(self.config.chromium.nav_timeout_seconds),
            viewport: self.viewport.clone(),
        })
    }

    pub async fn shutdown(mut self) -> BrowserResult<()> {
        info!("shutting down Chromium instance");
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "failed to close browser gracefully");
        }
        if let Some(handle) = self.handler_task.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "browser handler join error");
            }
        }
        Ok(())
    }
}

impl Drop for BrowserAutomation {
    fn drop(&mut self) {
        if let Some(handle) = &self.handler_task {
            if !handle.is_finished() {
                warn!("BrowserAutomation dropped without explicit shutdown");
            }
        }
    }
}

/// One page plus the pacing rules every interaction goes through.
#[derive(Debug)]
pub struct BrowserSession {
    page: Page,
    pacing: HumanPacing,
    nav_timeout: Duration,
    viewport: ViewportSpec,
}

impl BrowserSession {
    pub fn pacing(&self) -> &HumanPacing {
        &self.pacing
    }

    pub fn viewport(&self) -> &ViewportSpec {
        &self.viewport
    }

    pub async fn goto(&self, url: &str) -> BrowserResult<()> {
        self.page.goto(url).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    pub async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    pub async fn install_cookies(&self, cookies: Vec<CookieParam>) -> BrowserResult<()> {
        self.page.set_cookies(cookies).await?;
        Ok(())
    }

    /// First element matching a CSS selector, polled until `budget` runs out.
    pub async fn wait_for_css(&self, selector: &str, budget: Duration) -> BrowserResult<Element> {
        let deadline = Instant::now() + budget;
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!("css selector {selector}")));
            }
            sleep(Duration::from_millis(250)).await;
        }
    }

    /// First element of `tag` whose trimmed visible text equals `text`,
    /// polled until `budget` runs out.
    pub async fn wait_for_text(
        &self,
        tag: &str,
        text: &str,
        budget: Duration,
    ) -> BrowserResult<Element> {
        let deadline = Instant::now() + budget;
        loop {
            if let Some(element) = self.find_by_text(tag, text).await? {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!("{tag} with text {text:?}")));
            }
            sleep(Duration::from_millis(250)).await;
        }
    }

    async fn find_by_text(&self, tag: &str, text: &str) -> BrowserResult<Option<Element>> {
        let elements = self.page.find_elements(tag).await.unwrap_or_default();
        for element in elements {
            let inner = element.inner_text().await.unwrap_or(None).unwrap_or_default();
            if inner.trim() == text {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    pub async fn click(&self, element: &Element) -> BrowserResult<()> {
        self.pacing.hesitate_before_click().await;
        element
            .click()
            .await
            .map_err(|err| BrowserError::Unexpected(format!("failed to click element: {err}")))?;
        Ok(())
    }

    pub async fn type_text(&self, element: &Element, text: &str) -> BrowserResult<()> {
        element.click().await.map_err(|err| {
            BrowserError::Unexpected(format!("failed to focus element before typing: {err}"))
        })?;
        for ch in text.chars() {
            element.type_str(ch.to_string()).await.map_err(|err| {
                BrowserError::Unexpected(format!("failed to type character: {err}"))
            })?;
            self.pacing.keystroke_gap().await;
        }
        Ok(())
    }

    /// Injects a local file into a file input element via CDP.
    pub async fn attach_file(&self, element: &Element, file: &Path) -> BrowserResult<()> {
        let params = SetFileInputFilesParams::builder()
            .file(file.display().to_string())
            .node_id(element.node_id)
            .build()
            .map_err(BrowserError::Configuration)?;
        self.page.execute(params).await?;
        Ok(())
    }

    pub async fn scroll_by(&self, delta_y: f64) -> BrowserResult<()> {
        let js = format!("window.scrollBy({{ top: {delta_y}, behavior: 'smooth' }});");
        self.page
            .evaluate(js.as_str())
            .await
            .map_err(|err| BrowserError::Unexpected(format!("scroll script failed: {err}")))?;
        Ok(())
    }

    /// Every anchor href on the page, for link harvesting.
    pub async fn collect_hrefs(&self) -> BrowserResult<Vec<String>> {
        let js = "Array.from(document.querySelectorAll('a')).map(a => a.href)";
        let hrefs: Vec<String> = self
            .page
            .evaluate(js)
            .await?
            .into_value()
            .map_err(|err| BrowserError::Unexpected(format!("href harvest failed: {err}")))?;
        Ok(hrefs)
    }

    pub fn nav_timeout(&self) -> Duration {
        self.nav_timeout
    }
}
