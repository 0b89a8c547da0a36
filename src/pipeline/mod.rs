pub mod action;
pub mod actions;
pub mod context;
pub mod layout;
pub mod orchestrator;
pub mod platform;
pub mod selection;
pub mod version;
pub mod workdir;

pub use action::{Action, ActionOutcome};
pub use actions::ActionKind;
pub use context::PipelineContext;
pub use layout::BundleLayout;
pub use orchestrator::{BuildOutcome, Orchestrator, PipelineError};
pub use platform::{Platform, PlatformStrategy};
pub use selection::SelectionPolicy;
pub use workdir::WorkDir;
