use anyhow::{Context, Result};
use tracing::info;

use super::ActionKind;
use crate::pipeline::action::{Action, ActionOutcome};
use crate::pipeline::context::PipelineContext;
use crate::tools::ToolCommand;

/// Embed side-by-side manifests into the copied executables with `mt.exe`
pub struct EmbedManifests;

impl Action for EmbedManifests {
    fn name(&self) -> &'static str {
        ActionKind::EmbedManifests.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        for target in &ctx.profile.windows.manifests {
            let dir = ctx.expand(&target.dir)?;
            let cmd = ToolCommand::new(&ctx.tools.programs.mt)
                .args(["-nologo", "-manifest", target.manifest.as_str()])
                .arg(format!("-outputresource:{};#1", target.executable))
                .current_dir(&dir);

            info!(executable = %target.executable, manifest = %target.manifest, "Embedding manifest");
            ctx.tools
                .runner
                .run(&cmd)
                .with_context(|| format!("Failed to embed manifest into {}", target.executable))?;
        }
        Ok(ActionOutcome::Done)
    }
}
