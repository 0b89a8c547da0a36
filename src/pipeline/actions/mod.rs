//! Concrete pipeline actions
//!
//! [`ActionKind`] is the catalogue: every action the orchestrator can plan,
//! with the name `--skip`/`--do` refer to it by.

mod cleanup;
mod darwin;
mod deps;
mod misc;
mod package;
mod seeded;
mod setup;
mod source;
mod structure;
mod windows;

use std::fmt;

use anyhow::{bail, Context, Result};
use tracing::debug;

use super::action::Action;
use super::context::PipelineContext;
use crate::fs::{copy_into, expand};
use crate::package::PackagerKind;
use crate::profile::CopyRule;

pub use cleanup::{Cleanup, RemoveUnused};
pub use darwin::{Codesign, CopyAssets, FixDylibs, Launcher, Plist};
pub use deps::CollectDeps;
pub use misc::CopyMisc;
pub use package::PackageAction;
pub use seeded::SeededConfig;
pub use setup::Setup;
pub use source::{GitCheckout, GitClone};
pub use structure::{CopyBinaries, CreateDirs};
pub use windows::EmbedManifests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    GitClone,
    GitCheckout,
    Setup,
    CreateDirs,
    CollectDeps,
    CopyBinaries,
    CopyMisc,
    Cleanup,
    Plist,
    Launcher,
    CopyAssets,
    FixDylibs,
    Codesign,
    EmbedManifests,
    RemoveUnused,
    SeededConfig,
    Package(PackagerKind),
}

impl ActionKind {
    /// Steps every platform runs, in order
    pub const UNIVERSAL: [ActionKind; 8] = [
        ActionKind::GitClone,
        ActionKind::GitCheckout,
        ActionKind::Setup,
        ActionKind::CreateDirs,
        ActionKind::CollectDeps,
        ActionKind::CopyBinaries,
        ActionKind::CopyMisc,
        ActionKind::Cleanup,
    ];

    pub const ALL: [ActionKind; 19] = [
        ActionKind::GitClone,
        ActionKind::GitCheckout,
        ActionKind::Setup,
        ActionKind::CreateDirs,
        ActionKind::CollectDeps,
        ActionKind::CopyBinaries,
        ActionKind::CopyMisc,
        ActionKind::Cleanup,
        ActionKind::Plist,
        ActionKind::Launcher,
        ActionKind::CopyAssets,
        ActionKind::FixDylibs,
        ActionKind::Codesign,
        ActionKind::EmbedManifests,
        ActionKind::RemoveUnused,
        ActionKind::SeededConfig,
        ActionKind::Package(PackagerKind::DiskImage),
        ActionKind::Package(PackagerKind::Zip),
        ActionKind::Package(PackagerKind::Tarball),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::GitClone => "gitclone",
            ActionKind::GitCheckout => "gitcheckout",
            ActionKind::Setup => "setup",
            ActionKind::CreateDirs => "createdirs",
            ActionKind::CollectDeps => "collectdeps",
            ActionKind::CopyBinaries => "copybinaries",
            ActionKind::CopyMisc => "copymisc",
            ActionKind::Cleanup => "cleanup",
            ActionKind::Plist => "plist",
            ActionKind::Launcher => "launcher",
            ActionKind::CopyAssets => "copyassets",
            ActionKind::FixDylibs => "fixdylibs",
            ActionKind::Codesign => "codesign",
            ActionKind::EmbedManifests => "embedmanifests",
            ActionKind::RemoveUnused => "rmunused",
            ActionKind::SeededConfig => "seededconfig",
            ActionKind::Package(kind) => kind.action_name(),
        }
    }

    /// Every name `--skip`/`--do` accept
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(ActionKind::name).collect()
    }

    pub fn is_packaging(&self) -> bool {
        matches!(self, ActionKind::Package(_))
    }

    pub fn instantiate(&self) -> Box<dyn Action> {
        match self {
            ActionKind::GitClone => Box::new(GitClone),
            ActionKind::GitCheckout => Box::new(GitCheckout),
            ActionKind::Setup => Box::new(Setup),
            ActionKind::CreateDirs => Box::new(CreateDirs),
            ActionKind::CollectDeps => Box::new(CollectDeps),
            ActionKind::CopyBinaries => Box::new(CopyBinaries),
            ActionKind::CopyMisc => Box::new(CopyMisc),
            ActionKind::Cleanup => Box::new(Cleanup),
            ActionKind::Plist => Box::new(Plist),
            ActionKind::Launcher => Box::new(Launcher),
            ActionKind::CopyAssets => Box::new(CopyAssets),
            ActionKind::FixDylibs => Box::new(FixDylibs),
            ActionKind::Codesign => Box::new(Codesign),
            ActionKind::EmbedManifests => Box::new(EmbedManifests),
            ActionKind::RemoveUnused => Box::new(RemoveUnused),
            ActionKind::SeededConfig => Box::new(SeededConfig),
            ActionKind::Package(kind) => Box::new(PackageAction::new(*kind)),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Apply copy rules in order, returning how many entries were copied
///
/// A rule matching nothing fails the action unless it is optional.
pub(crate) fn apply_copy_rules(ctx: &PipelineContext, rules: &[CopyRule]) -> Result<usize> {
    let mut copied = 0;
    for rule in rules {
        let pattern = ctx.expand(&rule.from)?;
        let dest = ctx.expand(&rule.to)?;
        let matches = expand(&pattern)?;

        if matches.is_empty() {
            if rule.optional {
                debug!(pattern = %pattern.display(), "Optional rule matched nothing");
                continue;
            }
            bail!("nothing matches {}", pattern.display());
        }

        for source in matches {
            debug!(from = %source.display(), to = %dest.display(), "Copying");
            copy_into(&source, &dest)
                .with_context(|| format!("Failed to copy {}", source.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}
