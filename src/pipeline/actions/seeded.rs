use anyhow::{Context, Result};
use tracing::info;

use super::ActionKind;
use crate::fs::copy_tree;
use crate::pipeline::action::{Action, ActionOutcome};
use crate::pipeline::context::PipelineContext;

/// Copy the caller's configuration directory into the bundle
pub struct SeededConfig;

impl Action for SeededConfig {
    fn name(&self) -> &'static str {
        ActionKind::SeededConfig.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let Some(source) = &ctx.build.seeded_config else {
            info!("No seeded config given");
            return Ok(ActionOutcome::Done);
        };

        let dest = ctx.expand(&ctx.profile.seeded_config)?;
        copy_tree(source, &dest)
            .with_context(|| format!("Failed to seed config from {}", source.display()))?;
        info!(dest = %dest.display(), "Seeded config copied");
        Ok(ActionOutcome::Done)
    }
}
