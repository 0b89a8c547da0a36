use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::ActionKind;
use crate::fs::{remove_if_exists, NamePatterns};
use crate::pipeline::action::{Action, ActionOutcome};
use crate::pipeline::context::PipelineContext;
use crate::tools::ToolCommand;

/// Entries below `root` matching `patterns`; matched directories are not descended
fn matching_entries(root: &Path, patterns: &NamePatterns, files_only: bool) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if patterns.is_empty() {
        return Ok(found);
    }

    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry?;
        let file_type = entry.file_type();
        if files_only && !file_type.is_file() {
            continue;
        }
        if patterns.matches(entry.path(), file_type.is_dir()) {
            if file_type.is_dir() {
                walker.skip_current_dir();
            }
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Drop byte-code and strip shared objects in the assembled tree
pub struct Cleanup;

impl Action for Cleanup {
    fn name(&self) -> &'static str {
        ActionKind::Cleanup.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let root = ctx.layout.root();
        if !root.is_dir() {
            debug!(root = %root.display(), "No assembled tree to clean");
            return Ok(ActionOutcome::Done);
        }
        let spec = &ctx.profile.cleanup;

        let removable = NamePatterns::new(root, &spec.remove)?;
        let removed = matching_entries(root, &removable, true)?;
        for path in &removed {
            fs::remove_file(path)?;
        }
        info!(removed = removed.len(), "Removed byte-code files");

        if !ctx.strategy.strips_libraries() {
            return Ok(ActionOutcome::Done);
        }

        let strippable = NamePatterns::new(root, &spec.strip)?;
        for path in matching_entries(root, &strippable, true)? {
            debug!(file = %path.display(), "Stripping");
            let cmd = ToolCommand::new(&ctx.tools.programs.strip).path_arg(&path);
            // Not every match is an object file strip understands
            if let Err(e) = ctx.tools.runner.run(&cmd) {
                warn!(file = %path.display(), error = %e, "strip failed, keeping file as is");
            }
        }
        Ok(ActionOutcome::Done)
    }
}

/// Remove test suites and other payload the bundle never loads
pub struct RemoveUnused;

impl Action for RemoveUnused {
    fn name(&self) -> &'static str {
        ActionKind::RemoveUnused.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let root = ctx.layout.root();
        if !root.is_dir() {
            debug!(root = %root.display(), "No assembled tree to trim");
            return Ok(ActionOutcome::Done);
        }

        let unused = NamePatterns::new(root, &ctx.profile.cleanup.unused)?;
        let doomed = matching_entries(root, &unused, false)?;
        for path in &doomed {
            remove_if_exists(path)?;
        }
        info!(removed = doomed.len(), "Removed unused entries");
        Ok(ActionOutcome::Done)
    }
}
