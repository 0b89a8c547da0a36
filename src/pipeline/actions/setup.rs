use anyhow::{Context, Result};
use tracing::{debug, info};

use super::ActionKind;
use crate::pipeline::action::{Action, ActionOutcome};
use crate::pipeline::context::PipelineContext;
use crate::profile::SetupStep;
use crate::tools::ToolCommand;

/// Per-repository setup commands, in repository order
pub struct Setup;

impl Setup {
    fn command(ctx: &PipelineContext, repo: &str, step: &SetupStep) -> Result<ToolCommand> {
        let (program, args) = step
            .command
            .split_first()
            .with_context(|| format!("empty setup command for {}", repo))?;

        let mut dir = ctx.repo_dir(repo);
        if let Some(sub) = &step.dir {
            dir.push(sub);
        }

        let mut cmd = ToolCommand::new(ctx.layout.render(program)?).current_dir(&dir);
        for arg in args {
            cmd = cmd.arg(ctx.layout.render(arg)?);
        }
        for (key, value) in &step.env {
            cmd = cmd.env(key, ctx.layout.render(value)?);
        }
        Ok(cmd)
    }
}

impl Action for Setup {
    fn name(&self) -> &'static str {
        ActionKind::Setup.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        for repo in &ctx.profile.repositories {
            if repo.setup.is_empty() {
                debug!(repo = %repo.name, "No setup steps");
                continue;
            }

            for step in &repo.setup {
                let cmd = Self::command(ctx, &repo.name, step)?;
                info!(repo = %repo.name, command = %cmd, "Running setup step");
                ctx.tools
                    .runner
                    .run(&cmd)
                    .with_context(|| format!("Setup of {} failed", repo.name))?;
            }
        }
        Ok(ActionOutcome::Done)
    }
}
