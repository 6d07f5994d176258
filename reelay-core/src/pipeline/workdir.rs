use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

const CYCLE_PREFIX: &str = "cycle-";

/// Per-cycle scratch directory. Every intermediate file of one cycle lives
/// here and nowhere else, so cleanup is a single directory removal. The
/// `Drop` fallback covers early returns and panics; callers still invoke
/// `cleanup` on the normal path to surface removal errors.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    cleaned: bool,
}

impl WorkDir {
    pub fn create(root: &Path) -> io::Result<Self> {
        let path = root.join(format!("{CYCLE_PREFIX}{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&path)?;
        debug!(path = %path.display(), "cycle workdir created");
        Ok(Self {
            path,
            cleaned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn cleanup(mut self) -> io::Result<()> {
        self.cleaned = true;
        tokio::fs::remove_dir_all(&self.path).await?;
        debug!(path = %self.path.display(), "cycle workdir removed");
        Ok(())
    }

    /// Removes leftover cycle directories from earlier runs that died
    /// before their own cleanup. Returns how many were swept.
    pub fn sweep_stale(root: &Path) -> io::Result<usize> {
        if !root.exists() {
            return Ok(0);
        }
        let mut swept = 0;
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            let is_cycle_dir = entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(CYCLE_PREFIX));
            if !is_cycle_dir {
                continue;
            }
            match std::fs::remove_dir_all(entry.path()) {
                Ok(()) => {
                    warn!(path = %entry.path().display(), "swept stale cycle workdir");
                    swept += 1;
                }
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "failed to sweep stale workdir")
                }
            }
        }
        Ok(swept)
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %err, "workdir drop cleanup failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn cleanup_removes_the_directory_and_contents() {
        let root = tempdir().unwrap();
        let work = WorkDir::create(root.path()).unwrap();
        let file = work.path().join("clip.mp4");
        std::fs::write(&file, b"data").unwrap();

        let path = work.path().to_path_buf();
        work.cleanup().await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_the_directory() {
        let root = tempdir().unwrap();
        let path = {
            let work = WorkDir::create(root.path()).unwrap();
            work.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn sweep_only_touches_cycle_directories() {
        let root = tempdir().unwrap();
        std::fs::create_dir(root.path().join("cycle-deadbeef")).unwrap();
        std::fs::create_dir(root.path().join("cycle-cafe")).unwrap();
        std::fs::create_dir(root.path().join("keep-me")).unwrap();
        std::fs::write(root.path().join("cycle-not-a-dir"), b"x").unwrap();

        let swept = WorkDir::sweep_stale(root.path()).unwrap();
        assert_eq!(swept, 2);
        assert!(root.path().join("keep-me").exists());
        assert!(root.path().join("cycle-not-a-dir").exists());
        assert!(!root.path().join("cycle-deadbeef").exists());
    }

    #[test]
    fn sweeping_a_missing_root_is_a_no_op() {
        let root = tempdir().unwrap();
        let missing = root.path().join("nope");
        assert_eq!(WorkDir::sweep_stale(&missing).unwrap(), 0);
    }
}
