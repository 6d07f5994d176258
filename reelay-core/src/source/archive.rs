use async_trait::async_trait;
use rand::thread_rng;
use reqwest::Client;
use tracing::{debug, info};

use crate::ledger::UsedSet;

use super::{pick_candidate, ContentItem, ContentSource, SourceError, SourceResult};

/// Static-archive variant of the content source: a newline-delimited index
/// of media locators served over HTTP, fetched fresh each cycle.
pub struct ArchiveSource {
    client: Client,
    index_url: String,
}

impl ArchiveSource {
    pub fn new(index_url: Option<String>) -> SourceResult<Self> {
        let index_url = index_url.ok_or(SourceError::MissingIndexUrl)?;
        Ok(Self {
            client: Client::new(),
            index_url,
        })
    }
}

#[async_trait]
impl ContentSource for ArchiveSource {
    async fn next_candidate(&self, used: &UsedSet) -> SourceResult<Option<ContentItem>> {
        let body = self
            .client
            .get(&self.index_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let items: Vec<ContentItem> = body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ContentItem::new)
            .collect();
        debug!(index = %self.index_url, entries = items.len(), "archive index fetched");

        let candidate = {
            let mut rng = thread_rng();
            pick_candidate(items, used, &mut rng)
        };
        if let Some(item) = &candidate {
            info!(id = %item.id, "archive candidate selected");
        }
        Ok(candidate)
    }
}
