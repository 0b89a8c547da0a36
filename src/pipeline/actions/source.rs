use anyhow::{Context, Result};
use tracing::info;

use super::ActionKind;
use crate::fs::remove_if_exists;
use crate::pipeline::action::{Action, ActionOutcome};
use crate::pipeline::context::PipelineContext;

/// Fresh clone of every profile repository into the working directory
pub struct GitClone;

impl Action for GitClone {
    fn name(&self) -> &'static str {
        ActionKind::GitClone.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        for repo in &ctx.profile.repositories {
            let dest = ctx.repo_dir(&repo.name);
            remove_if_exists(&dest)?;

            info!(repo = %repo.name, url = %repo.url, "Cloning repository");
            ctx.tools
                .git
                .clone_repo(&repo.url, &dest)
                .with_context(|| format!("Failed to clone {}", repo.name))?;
        }
        Ok(ActionOutcome::Done)
    }
}

/// Move each pinned repository to the ref from the versions file
///
/// Repositories without an entry stay at whatever was cloned.
pub struct GitCheckout;

impl Action for GitCheckout {
    fn name(&self) -> &'static str {
        ActionKind::GitCheckout.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let git = ctx.tools.git.as_ref();

        for repo in &ctx.profile.repositories {
            let Some(target) = ctx.build.versions.target(&repo.name) else {
                info!(repo = %repo.name, "No pinned ref, leaving checkout as is");
                continue;
            };

            let dir = ctx.repo_dir(&repo.name);
            info!(repo = %repo.name, target, "Checking out");
            git.fetch(&dir)
                .and_then(|_| git.checkout(&dir, target))
                .and_then(|_| git.reset_hard(&dir, target))
                .with_context(|| format!("Failed to check out {} at {}", repo.name, target))?;
        }
        Ok(ActionOutcome::Done)
    }
}
