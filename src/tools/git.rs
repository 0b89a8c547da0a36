use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};

use super::runner::{CommandRunner, ToolCommand};

/// Source-control operations the pipeline needs
pub trait SourceControl: Send + Sync {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;
    fn fetch(&self, repo: &Path) -> Result<()>;
    fn checkout(&self, repo: &Path, target: &str) -> Result<()>;
    fn reset_hard(&self, repo: &Path, target: &str) -> Result<()>;
    /// Human-readable description of the checked-out state (nearest tag,
    /// distance and commit)
    fn describe(&self, repo: &Path) -> Result<String>;
}

/// `git` command-line client
pub struct GitClient {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl GitClient {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    fn git_in(&self, repo: &Path) -> ToolCommand {
        ToolCommand::new(&self.program).current_dir(repo)
    }
}

impl SourceControl for GitClient {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let cmd = ToolCommand::new(&self.program)
            .arg("clone")
            .arg(url)
            .path_arg(dest);
        self.runner.run(&cmd)?;
        Ok(())
    }

    fn fetch(&self, repo: &Path) -> Result<()> {
        self.runner.run(&self.git_in(repo).arg("fetch"))?;
        Ok(())
    }

    fn checkout(&self, repo: &Path, target: &str) -> Result<()> {
        self.runner
            .run(&self.git_in(repo).args(["checkout", "--quiet", target]))?;
        Ok(())
    }

    fn reset_hard(&self, repo: &Path, target: &str) -> Result<()> {
        self.runner
            .run(&self.git_in(repo).args(["reset", "--hard", target]))?;
        Ok(())
    }

    fn describe(&self, repo: &Path) -> Result<String> {
        if !repo.is_dir() {
            bail!("repository not found: {}", repo.display());
        }
        let out = self.runner.run(&self.git_in(repo).arg("describe"))?;
        let described = out.trim();
        if described.is_empty() {
            bail!("git describe returned nothing in {}", repo.display());
        }
        Ok(described.to_string())
    }
}
