mod archive;
mod error;
mod shorts;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use sha2::{Digest, Sha256};
use url::Url;

use crate::ledger::UsedSet;

pub use archive::ArchiveSource;
pub use error::{SourceError, SourceResult};
pub use shorts::ShortsChannelSource;

/// One piece of source media, identified by its locator. Only the derived
/// ID is ever persisted (in the used-set, after a confirmed publish).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub url: String,
    pub id: String,
}

impl ContentItem {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let id = derive_id(&url);
        Self { url, id }
    }
}

/// The short's own video ID when the locator is a `/shorts/<id>` URL,
/// otherwise a sha-256 digest of the raw locator. Stable across query
/// string noise for shorts links, opaque but deterministic for the rest.
fn derive_id(raw: &str) -> String {
    if let Ok(parsed) = Url::parse(raw) {
        if let Some(mut segments) = parsed.path_segments() {
            while let Some(segment) = segments.next() {
                if segment == "shorts" {
                    if let Some(id) = segments.next().filter(|id| !id.is_empty()) {
                        return id.to_string();
                    }
                }
            }
        }
    }
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(digest)
}

/// Produces a candidate not yet in the used-set. `Ok(None)` means
/// exhaustion, which the orchestrator treats as a back-off, not an error.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn next_candidate(&self, used: &UsedSet) -> SourceResult<Option<ContentItem>>;
}

/// Shared selection policy: drop used items, pick uniformly from whatever
/// remains.
pub(crate) fn pick_candidate<R: Rng + ?Sized>(
    items: Vec<ContentItem>,
    used: &UsedSet,
    rng: &mut R,
) -> Option<ContentItem> {
    let fresh: Vec<ContentItem> = items
        .into_iter()
        .filter(|item| !used.contains(&item.id))
        .collect();
    fresh.choose(rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn shorts_url_id_is_the_video_id() {
        let item = ContentItem::new("https://www.youtube.com/shorts/dQw4w9WgXcQ?feature=share");
        assert_eq!(item.id, "dQw4w9WgXcQ");
    }

    #[test]
    fn non_shorts_url_id_is_a_digest() {
        let item = ContentItem::new("https://archive.example.com/clips/042.mp4");
        assert_eq!(item.id.len(), 64);
        assert!(item.id.chars().all(|c| c.is_ascii_hexdigit()));
        // deterministic
        assert_eq!(
            item.id,
            ContentItem::new("https://archive.example.com/clips/042.mp4").id
        );
    }

    #[test]
    fn used_items_are_never_candidates() {
        let items: Vec<ContentItem> = ["a", "b", "c"]
            .iter()
            .map(|id| ContentItem {
                url: format!("https://www.youtube.com/shorts/{id}"),
                id: id.to_string(),
            })
            .collect();
        let mut used = UsedSet::new();
        used.insert("a");
        used.insert("c");

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..64 {
            let picked = pick_candidate(items.clone(), &used, &mut rng).unwrap();
            assert_eq!(picked.id, "b");
        }
    }

    #[test]
    fn exhausted_pool_yields_none() {
        let items = vec![ContentItem::new("https://www.youtube.com/shorts/only")];
        let mut used = UsedSet::new();
        used.insert("only");
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert!(pick_candidate(items, &used, &mut rng).is_none());
    }
}
