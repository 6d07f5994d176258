use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("io error at {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("ledger file {path} is not a JSON array of strings: {source}")]
    Malformed {
        source: serde_json::Error,
        path: PathBuf,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// IDs of items already published. An ID enters at most once, and only
/// after a confirmed successful publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedSet {
    ids: BTreeSet<String>,
}

impl UsedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns false if the ID was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }
}

impl FromIterator<String> for UsedSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Persistence port for the used-set. `record` must be durable before it
/// returns; the orchestrator does not advance until it has.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load(&self) -> LedgerResult<UsedSet>;
    async fn record(&self, set: &UsedSet) -> LedgerResult<()>;
}

/// JSON-array file store. The whole array is rewritten on every mutation,
/// staged to a sibling temp file and renamed so a crash mid-write never
/// truncates the live ledger.
#[derive(Debug, Clone)]
pub struct JsonLedgerStore {
    path: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> LedgerError {
        LedgerError::Io {
            source,
            path: self.path.clone(),
        }
    }
}

#[async_trait]
impl LedgerStore for JsonLedgerStore {
    async fn load(&self) -> LedgerResult<UsedSet> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "ledger file absent, starting empty");
                return Ok(UsedSet::new());
            }
            Err(err) => return Err(self.io_err(err)),
        };
        let ids: Vec<String> =
            serde_json::from_str(&contents).map_err(|source| LedgerError::Malformed {
                source,
                path: self.path.clone(),
            })?;
        Ok(ids.into_iter().collect())
    }

    async fn record(&self, set: &UsedSet) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_err(err))?;
        }
        let ids: Vec<&str> = set.iter().collect();
        let body = serde_json::to_vec_pretty(&ids).map_err(|source| LedgerError::Malformed {
            source,
            path: self.path.clone(),
        })?;
        let staging = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&staging)
            .await
            .map_err(|err| self.io_err(err))?;
        file.write_all(&body).await.map_err(|err| self.io_err(err))?;
        file.sync_all().await.map_err(|err| self.io_err(err))?;
        drop(file);
        fs::rename(&staging, &self.path)
            .await
            .map_err(|err| self.io_err(err))?;
        debug!(path = %self.path.display(), entries = set.len(), "ledger persisted");
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    inner: Mutex<UsedSet>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids<I: IntoIterator<Item = String>>(ids: I) -> Self {
        Self {
            inner: Mutex::new(ids.into_iter().collect()),
        }
    }

    pub fn snapshot(&self) -> UsedSet {
        self.inner.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load(&self) -> LedgerResult<UsedSet> {
        Ok(self.inner.lock().unwrap().clone())
    }

    async fn record(&self, set: &UsedSet) -> LedgerResult<()> {
        *self.inner.lock().unwrap() = set.clone();
        Ok(())
    }
}
