use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::ActionKind;
use crate::fs::remove_if_exists;
use crate::pipeline::action::{Action, ActionOutcome};
use crate::pipeline::context::PipelineContext;
use crate::tools::CollectRequest;

/// Dependency closure of the entry point into `{app}/lib`, then pruning
pub struct CollectDeps;

impl Action for CollectDeps {
    fn name(&self) -> &'static str {
        ActionKind::CollectDeps.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let spec = &ctx.profile.collect;
        if spec.entry_point.trim().is_empty() {
            info!("No entry point configured, nothing to collect");
            return Ok(ActionOutcome::Done);
        }

        let search_paths = ctx
            .profile
            .repositories
            .iter()
            .flat_map(|repo| {
                repo.sources
                    .iter()
                    .map(move |src| ctx.repo_dir(&repo.name).join(src))
            })
            .collect();

        let request = CollectRequest {
            entry_point: ctx.expand(&spec.entry_point)?,
            destination: ctx.expand(&spec.destination)?,
            paths_file: ctx.build.paths_file.clone(),
            search_paths,
        };
        ctx.tools
            .collector
            .collect(&request)
            .context("Dependency collection failed")?;

        if let Some(package) = &spec.prune_within {
            let removed = prune(&request.destination.join(package), &spec.keep)?;
            info!(package = %package, removed, "Pruned collected package");
        }
        Ok(ActionOutcome::Done)
    }
}

/// Remove every entry below `dir` whose name is not in `keep`
///
/// Kept directories are descended into; removed ones go with their contents.
fn prune(dir: &Path, keep: &[String]) -> Result<usize> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "Nothing to prune");
        return Ok(0);
    }

    let mut doomed = Vec::new();
    let mut walker = WalkDir::new(dir).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        if keep.iter().any(|k| *k == name) {
            continue;
        }
        if entry.file_type().is_dir() {
            walker.skip_current_dir();
        }
        doomed.push(entry.into_path());
    }

    for path in &doomed {
        remove_if_exists(path)?;
    }
    Ok(doomed.len())
}
