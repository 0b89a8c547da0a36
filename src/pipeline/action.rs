use std::path::PathBuf;

use anyhow::Result;

use super::context::PipelineContext;
use super::selection::SelectionPolicy;

/// What a completed action produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    /// The terminal packaging action's output file
    Artifact(PathBuf),
}

/// One named, independently skippable unit of pipeline work
///
/// Actions are stateless; everything they need comes from the
/// [`PipelineContext`]. The orchestrator consults [`Action::should_run`]
/// before calling [`Action::run`], so `run` never sees a deselected call.
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;

    fn should_run(&self, policy: &SelectionPolicy) -> bool {
        policy.should_run(self.name())
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome>;
}
