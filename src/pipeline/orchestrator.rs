use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::action::{Action, ActionOutcome};
use super::actions::ActionKind;
use super::context::PipelineContext;
use super::platform::{Platform, PlatformStrategy};
use super::workdir::WorkDir;
use crate::config::BuildContext;
use crate::fs::{remove_if_exists, ScopedDir};
use crate::profile::BundleProfile;
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use crate::tools::Toolbox;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to prepare working directory: {0:#}")]
    WorkDir(anyhow::Error),

    #[error("Action '{action}' failed: {source:#}")]
    ActionFailed {
        action: String,
        source: anyhow::Error,
    },

    #[error("Failed to deliver artifact: {0:#}")]
    ArtifactDelivery(anyhow::Error),
}

impl PipelineError {
    /// Name of the action that failed, if an action failed
    pub fn action(&self) -> Option<&str> {
        match self {
            PipelineError::ActionFailed { action, .. } => Some(action),
            _ => None,
        }
    }
}

/// Result of a run that did not fail
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Final artifact; `None` if the packaging action was deselected
    pub artifact: Option<PathBuf>,
    pub executed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

/// Drives the fixed action sequence for one platform
pub struct Orchestrator {
    strategy: PlatformStrategy,
    tools: Toolbox,
    progress: Arc<dyn ProgressHandler>,
}

impl Orchestrator {
    pub fn new(platform: Platform, tools: Toolbox) -> Self {
        Self {
            strategy: PlatformStrategy::new(platform),
            tools,
            progress: Arc::new(LoggingHandler),
        }
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = handler;
        self
    }

    pub fn strategy(&self) -> PlatformStrategy {
        self.strategy
    }

    /// Universal prefix, platform tail, optional config seeding, packager
    pub fn plan(&self, build: &BuildContext) -> Vec<ActionKind> {
        self.plan_with(
            build.codesign_identity.is_some(),
            build.seeded_config.is_some(),
        )
    }

    pub fn plan_with(&self, signing: bool, seeded_config: bool) -> Vec<ActionKind> {
        let mut plan = ActionKind::UNIVERSAL.to_vec();
        plan.extend(self.strategy.tail_actions(signing));
        if seeded_config {
            plan.push(ActionKind::SeededConfig);
        }
        plan.push(ActionKind::Package(self.strategy.packager()));
        plan
    }

    /// Run the planned sequence for `build`
    pub fn execute(
        &self,
        build: BuildContext,
        profile: BundleProfile,
    ) -> Result<BuildOutcome, PipelineError> {
        let actions: Vec<Box<dyn Action>> = self
            .plan(&build)
            .iter()
            .map(ActionKind::instantiate)
            .collect();
        self.execute_actions(build, profile, &actions)
    }

    /// Run an explicit action sequence with the full working-directory policy
    ///
    /// A temporary working directory is removed only after success. On
    /// failure it stays on disk for inspection and its path is logged.
    pub fn execute_actions(
        &self,
        build: BuildContext,
        profile: BundleProfile,
        actions: &[Box<dyn Action>],
    ) -> Result<BuildOutcome, PipelineError> {
        let work = WorkDir::resolve(build.work_dir.as_deref()).map_err(PipelineError::WorkDir)?;
        let output_dir = build.output_dir.clone();
        let ctx = PipelineContext::new(
            build,
            profile,
            self.strategy,
            self.tools.clone(),
            work.path(),
        );

        let delivered = self.run_sequence(actions, &ctx).and_then(|mut outcome| {
            if let Some(artifact) = outcome.artifact.take() {
                let dest = delivery_dir(output_dir.as_deref(), work.is_owned())
                    .map_err(PipelineError::ArtifactDelivery)?;
                outcome.artifact = Some(match dest {
                    Some(dir) => deliver(&artifact, &dir).map_err(PipelineError::ArtifactDelivery)?,
                    None => artifact,
                });
            }
            Ok(outcome)
        });

        match delivered {
            Ok(outcome) => {
                if work.is_owned() {
                    let path = work.path().to_path_buf();
                    if let Err(e) = work.remove() {
                        warn!(work_dir = %path.display(), error = %e, "Failed to remove temporary working directory");
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                if work.is_owned() {
                    warn!(work_dir = %work.path().display(), "Keeping temporary working directory for inspection");
                }
                Err(e)
            }
        }
    }

    /// Execute actions strictly in order, stopping at the first failure
    ///
    /// Each action runs with the process working directory set to the run's
    /// working directory; the previous directory is restored afterwards
    /// whether the action succeeds or not.
    pub fn run_sequence(
        &self,
        actions: &[Box<dyn Action>],
        ctx: &PipelineContext,
    ) -> Result<BuildOutcome, PipelineError> {
        let start = Instant::now();
        self.progress.on_progress(&ProgressEvent::Started {
            work_dir: ctx.work_dir.display().to_string(),
            platform: ctx.platform().to_string(),
            planned: actions.len(),
        });

        let mut outcome = BuildOutcome::default();
        for action in actions {
            let name = action.name();

            if !action.should_run(&ctx.build.selection) {
                self.progress.on_progress(&ProgressEvent::ActionSkipped {
                    action: name.to_string(),
                });
                outcome.skipped.push(name);
                continue;
            }

            self.progress.on_progress(&ProgressEvent::ActionStarted {
                action: name.to_string(),
            });
            let action_start = Instant::now();

            let result =
                ScopedDir::enter(&ctx.work_dir).and_then(|_cwd| action.run(ctx));

            match result {
                Ok(ActionOutcome::Done) => {}
                Ok(ActionOutcome::Artifact(path)) => {
                    debug!(action = name, artifact = %path.display(), "Artifact produced");
                    outcome.artifact = Some(path);
                }
                Err(source) => {
                    self.progress.on_progress(&ProgressEvent::ActionFailed {
                        action: name.to_string(),
                        error: format!("{:#}", source),
                    });
                    return Err(PipelineError::ActionFailed {
                        action: name.to_string(),
                        source,
                    });
                }
            }

            self.progress.on_progress(&ProgressEvent::ActionComplete {
                action: name.to_string(),
                duration: action_start.elapsed(),
            });
            outcome.executed.push(name);
        }

        self.progress.on_progress(&ProgressEvent::Completed {
            executed: outcome.executed.len(),
            skipped: outcome.skipped.len(),
            total_time: start.elapsed(),
        });
        Ok(outcome)
    }
}

/// Where the artifact should end up, if it has to move at all
///
/// An artifact in a temporary working directory always moves, by default to
/// the invocation directory.
fn delivery_dir(output_dir: Option<&Path>, owned: bool) -> Result<Option<PathBuf>> {
    match (output_dir, owned) {
        (Some(dir), _) => Ok(Some(dir.to_path_buf())),
        (None, true) => Ok(Some(
            env::current_dir().context("Failed to read current directory")?,
        )),
        (None, false) => Ok(None),
    }
}

fn deliver(artifact: &Path, dir: &Path) -> Result<PathBuf> {
    let name = artifact
        .file_name()
        .with_context(|| format!("Artifact has no file name: {}", artifact.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let dest = dir.join(name);
    if dest == artifact {
        return Ok(dest);
    }

    remove_if_exists(&dest)?;
    // Temporary directories are often on another filesystem
    if fs::rename(artifact, &dest).is_err() {
        fs::copy(artifact, &dest)
            .with_context(|| format!("Failed to copy artifact to {}", dest.display()))?;
        fs::remove_file(artifact)?;
    }
    info!(artifact = %dest.display(), "Artifact delivered");
    Ok(dest)
}
