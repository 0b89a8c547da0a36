use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::fs::remove_if_exists;

/// The run's working directory and who owns it
///
/// A caller-supplied directory is never removed. A directory allocated here
/// is removed by [`WorkDir::remove`], which the orchestrator only calls after
/// a successful run.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    owned: bool,
}

impl WorkDir {
    pub fn resolve(requested: Option<&Path>) -> Result<Self> {
        match requested {
            Some(path) => {
                fs::create_dir_all(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let path = fs::canonicalize(path)?;
                Ok(Self { path, owned: false })
            }
            None => Self::allocate(),
        }
    }

    /// Fresh uniquely named directory under the system temp dir
    ///
    /// The directory is detached from `tempfile`'s cleanup; only
    /// [`WorkDir::remove`] deletes it.
    pub fn allocate() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("appbundler-")
            .tempdir()
            .context("Failed to create temporary working directory")?;
        let path = fs::canonicalize(dir.keep())?;
        debug!(work_dir = %path.display(), "Allocated temporary working directory");
        Ok(Self { path, owned: true })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Delete the directory if it was allocated here
    pub fn remove(self) -> Result<()> {
        if self.owned {
            remove_if_exists(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_caller_dir_survives_remove() {
        let dir = TempDir::new().unwrap();
        let requested = dir.path().join("build");
        let work = WorkDir::resolve(Some(&requested)).unwrap();
        assert!(!work.is_owned());
        assert!(requested.is_dir());
        assert_eq!(work.path(), fs::canonicalize(&requested).unwrap());
        work.remove().unwrap();
        assert!(requested.is_dir());
    }

    #[test]
    fn test_allocated_dir_is_unique_and_removed() {
        let first = WorkDir::allocate().unwrap();
        let second = WorkDir::allocate().unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.is_owned());

        let path = first.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("appbundler-"));
        first.remove().unwrap();
        second.remove().unwrap();
        assert!(!path.exists());
    }
}
