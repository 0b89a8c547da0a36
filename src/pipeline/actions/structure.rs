use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::{apply_copy_rules, ActionKind};
use crate::fs::symlink;
use crate::pipeline::action::{Action, ActionOutcome};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::platform::Platform;

/// Platform skeleton plus the profile's directories under `{app}`
pub struct CreateDirs;

impl Action for CreateDirs {
    fn name(&self) -> &'static str {
        ActionKind::CreateDirs.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let layout = &ctx.layout;
        let extra = &ctx.profile.section(ctx.platform()).directories;

        let dirs = layout.skeleton().into_iter().chain(
            ctx.profile
                .directories
                .iter()
                .chain(extra)
                .map(|d| layout.app().join(d)),
        );
        for dir in dirs {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        if ctx.platform() == Platform::MacOs {
            symlink(Path::new("/Applications"), &layout.root().join("Applications"))?;
        }

        info!(root = %layout.root().display(), "Bundle structure created");
        Ok(ActionOutcome::Done)
    }
}

/// Prebuilt binaries into the tree: platform rules first, then common ones
pub struct CopyBinaries;

impl Action for CopyBinaries {
    fn name(&self) -> &'static str {
        ActionKind::CopyBinaries.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let platform_rules = &ctx.profile.section(ctx.platform()).binaries;
        let copied = apply_copy_rules(ctx, platform_rules)?
            + apply_copy_rules(ctx, &ctx.profile.binaries)?;
        info!(copied, "Binaries copied");
        Ok(ActionOutcome::Done)
    }
}
