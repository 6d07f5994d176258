use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use rand::thread_rng;
use regex::Regex;
use tracing::{debug, info};

use crate::browser::BrowserSession;
use crate::config::SourceSection;
use crate::ledger::UsedSet;
use crate::pools::LinePool;

use super::{pick_candidate, ContentItem, ContentSource, SourceResult};

/// Scrapes the shorts tab of a randomly chosen channel. The channel list
/// is a newline-delimited file re-read on every call, so channels can be
/// rotated without a restart.
pub struct ShortsChannelSource {
    session: Arc<BrowserSession>,
    channels: LinePool,
    scroll_passes: u32,
    scroll_pause_ms: [u64; 2],
    link_pattern: Regex,
}

impl ShortsChannelSource {
    pub fn new(session: Arc<BrowserSession>, channels: LinePool, config: &SourceSection) -> Self {
        Self {
            session,
            channels,
            scroll_passes: config.scroll_passes,
            scroll_pause_ms: config.scroll_pause_ms,
            // hrefs the lazy-loaded grid exposes for individual shorts
            link_pattern: Regex::new(r"/shorts/[A-Za-z0-9_-]+").expect("static pattern"),
        }
    }

    async fn harvest(&self, channel: &str) -> SourceResult<Vec<ContentItem>> {
        self.session.goto(channel).await?;
        let burst = f64::from(self.session.viewport().height);
        for _ in 0..self.scroll_passes {
            self.session.scroll_by(burst).await?;
            self.session.pacing().pause_in(self.scroll_pause_ms).await;
        }

        let hrefs = self.session.collect_hrefs().await?;
        let unique: BTreeSet<String> = hrefs
            .into_iter()
            .filter(|href| self.link_pattern.is_match(href))
            .collect();
        debug!(channel, links = unique.len(), "harvested shorts links");
        Ok(unique.into_iter().map(ContentItem::new).collect())
    }
}

#[async_trait]
impl ContentSource for ShortsChannelSource {
    async fn next_candidate(&self, used: &UsedSet) -> SourceResult<Option<ContentItem>> {
        let channel = {
            let mut rng = thread_rng();
            self.channels.pick_one(&mut rng)?
        };
        let items = self.harvest(&channel).await?;
        let total = items.len();
        let candidate = {
            let mut rng = thread_rng();
            pick_candidate(items, used, &mut rng)
        };
        match &candidate {
            Some(item) => info!(channel, id = %item.id, "candidate selected"),
            None => info!(channel, harvested = total, "channel exhausted, no fresh candidate"),
        }
        Ok(candidate)
    }
}
