use std::io;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to read pool {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("pool {path} has no usable entries")]
    Empty { path: PathBuf },
}

pub type PoolResult<T> = Result<T, PoolError>;

/// A newline-delimited text pool, re-read from disk on every use so edits
/// take effect on the next cycle without a restart.
#[derive(Debug, Clone)]
pub struct LinePool {
    path: PathBuf,
}

impl LinePool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> PoolResult<Vec<String>> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| PoolError::Io {
            source,
            path: self.path.clone(),
        })?;
        let lines: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if lines.is_empty() {
            return Err(PoolError::Empty {
                path: self.path.clone(),
            });
        }
        Ok(lines)
    }

    pub fn pick_one<R: Rng + ?Sized>(&self, rng: &mut R) -> PoolResult<String> {
        let lines = self.load()?;
        Ok(lines[rng.gen_range(0..lines.len())].clone())
    }

    /// Up to `count` distinct entries, order not significant.
    pub fn pick_distinct<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> PoolResult<Vec<String>> {
        let lines = self.load()?;
        Ok(lines
            .choose_multiple(rng, count.min(lines.len()))
            .cloned()
            .collect())
    }
}

/// Composes the publish caption: one caption line plus N hashtags.
#[derive(Debug, Clone)]
pub struct CaptionBuilder {
    captions: LinePool,
    hashtags: LinePool,
    hashtag_count: usize,
}

impl CaptionBuilder {
    pub fn new(captions: LinePool, hashtags: LinePool, hashtag_count: usize) -> Self {
        Self {
            captions,
            hashtags,
            hashtag_count,
        }
    }

    pub fn compose<R: Rng + ?Sized>(&self, rng: &mut R) -> PoolResult<String> {
        let caption = self.captions.pick_one(rng)?;
        let tags = self.hashtags.pick_distinct(self.hashtag_count, rng)?;
        Ok(format!("{caption}\n\n{}", tags.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn pool_file(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn blank_lines_are_skipped() {
        let file = pool_file(&["one", "", "  ", "two"]);
        let pool = LinePool::new(file.path());
        assert_eq!(pool.load().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn empty_pool_is_an_error() {
        let file = pool_file(&["", "   "]);
        let pool = LinePool::new(file.path());
        assert!(matches!(pool.load(), Err(PoolError::Empty { .. })));
    }

    #[test]
    fn pick_distinct_never_repeats() {
        let file = pool_file(&["#a", "#b", "#c"]);
        let pool = LinePool::new(file.path());
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let picked = pool.pick_distinct(3, &mut rng).unwrap();
        let mut sorted = picked.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 3);
    }

    #[test]
    fn pick_distinct_is_capped_at_pool_size() {
        let file = pool_file(&["#a", "#b"]);
        let pool = LinePool::new(file.path());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(pool.pick_distinct(15, &mut rng).unwrap().len(), 2);
    }

    #[test]
    fn edits_take_effect_on_next_read() {
        let mut file = pool_file(&["old"]);
        let pool = LinePool::new(file.path());
        assert_eq!(pool.load().unwrap(), vec!["old"]);
        writeln!(file, "new").unwrap();
        file.flush().unwrap();
        assert_eq!(pool.load().unwrap(), vec!["old", "new"]);
    }

    #[test]
    fn caption_has_text_then_tags() {
        let captions = pool_file(&["hello world"]);
        let hashtags = pool_file(&["#a", "#b", "#c", "#d"]);
        let builder = CaptionBuilder::new(
            LinePool::new(captions.path()),
            LinePool::new(hashtags.path()),
            2,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let caption = builder.compose(&mut rng).unwrap();
        assert!(caption.starts_with("hello world\n\n"));
        assert_eq!(caption.matches('#').count(), 2);
    }
}
