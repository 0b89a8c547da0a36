//! Version label for the final artifact
//!
//! Releases carry an explicit version in the versions file. Anything else is a
//! nightly build, labelled `YYYY-MM-DD-<8 hex>` where the hex part is a SHA-256
//! over each repository's `git describe` output in processing order.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::tools::SourceControl;

/// Value of the `version` key requesting a computed version
pub const NIGHTLY: &str = "nightly";

/// Substituted for a repository whose state cannot be described
pub const UNKNOWN_STATE: &str = "unknown";

const DIGEST_PREFIX_LEN: usize = 8;

/// Answers "what is checked out in this repository right now"
pub trait RepoStateProvider {
    fn describe(&self, repo: &str) -> Result<String>;
}

impl<F> RepoStateProvider for F
where
    F: Fn(&str) -> Result<String>,
{
    fn describe(&self, repo: &str) -> Result<String> {
        self(repo)
    }
}

/// Describes repositories cloned under a working directory
pub struct GitStateProvider<'a> {
    git: &'a dyn SourceControl,
    work_dir: PathBuf,
}

impl<'a> GitStateProvider<'a> {
    pub fn new(git: &'a dyn SourceControl, work_dir: &Path) -> Self {
        Self {
            git,
            work_dir: work_dir.to_path_buf(),
        }
    }
}

impl RepoStateProvider for GitStateProvider<'_> {
    fn describe(&self, repo: &str) -> Result<String> {
        self.git.describe(&self.work_dir.join(repo))
    }
}

/// Resolve the version using today's local date
pub fn resolve(
    explicit: Option<&str>,
    repos: &[String],
    provider: &dyn RepoStateProvider,
) -> String {
    resolve_on(explicit, repos, provider, Local::now().date_naive())
}

/// Resolve the version as if it were `date`
///
/// An explicit version other than [`NIGHTLY`] is returned untouched. Otherwise
/// the per-repository descriptors are hashed in order; a repository that
/// cannot be described contributes [`UNKNOWN_STATE`].
pub fn resolve_on(
    explicit: Option<&str>,
    repos: &[String],
    provider: &dyn RepoStateProvider,
    date: NaiveDate,
) -> String {
    if let Some(version) = explicit.filter(|v| *v != NIGHTLY) {
        debug!(version, "Using explicit version");
        return version.to_string();
    }

    let mut hasher = Sha256::new();
    for repo in repos {
        let descriptor = match provider.describe(repo) {
            Ok(d) => d.trim().to_string(),
            Err(e) => {
                warn!(repo = %repo, error = %e, "Could not describe repository, using '{}'", UNKNOWN_STATE);
                UNKNOWN_STATE.to_string()
            }
        };
        debug!(repo = %repo, descriptor = %descriptor, "Hashing repository state");
        hasher.update(descriptor.as_bytes());
    }

    let digest = hex::encode(hasher.finalize());
    format!(
        "{}-{}",
        date.format("%Y-%m-%d"),
        &digest[..DIGEST_PREFIX_LEN]
    )
}
