//! Final distributable for each platform
//!
//! Every packager turns the assembled tree into exactly one file named
//! `<product>-<platform tag>-<version>.<ext>`. The version is resolved by the
//! caller once and passed in, so the renamed tree and the file name always
//! agree.

pub mod dmg;
pub mod tarball;
pub mod zip_archive;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use thiserror::Error;
use tracing::debug;

use crate::pipeline::platform::Platform;

pub use dmg::DiskImagePackager;
pub use tarball::TarballPackager;
pub use zip_archive::ZipPackager;

/// The three terminal packaging variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackagerKind {
    DiskImage,
    Zip,
    Tarball,
}

impl PackagerKind {
    /// Action name used by `--skip`/`--do`
    pub fn action_name(&self) -> &'static str {
        match self {
            PackagerKind::DiskImage => "dmg",
            PackagerKind::Zip => "zip",
            PackagerKind::Tarball => "tarball",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            PackagerKind::DiskImage => "dmg",
            PackagerKind::Zip => "zip",
            PackagerKind::Tarball => "tar.bz2",
        }
    }
}

impl fmt::Display for PackagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action_name())
    }
}

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("{packager} packaging failed: {source:#}")]
    Failed {
        packager: PackagerKind,
        source: anyhow::Error,
    },
}

impl PackageError {
    pub fn packager(&self) -> PackagerKind {
        match self {
            PackageError::Failed { packager, .. } => *packager,
        }
    }
}

/// Produces the final artifact from an assembled tree
pub trait ArtifactPackager {
    fn kind(&self) -> PackagerKind;

    /// Package `tree_root`, returning the artifact path
    ///
    /// No file exists under the artifact's final name unless this succeeds.
    fn package(&self, tree_root: &Path, version: &str) -> Result<PathBuf, PackageError>;
}

/// `<product>-<tag>-<version>`, shared by the renamed tree and the artifact
pub fn artifact_stem(product: &str, platform: Platform, version: &str) -> String {
    format!("{}-{}-{}", product, platform.tag(), version)
}

pub fn artifact_name(product: &str, platform: Platform, version: &str, kind: PackagerKind) -> String {
    format!(
        "{}.{}",
        artifact_stem(product, platform, version),
        kind.extension()
    )
}

fn failed(packager: PackagerKind) -> impl FnOnce(anyhow::Error) -> PackageError {
    move |source| PackageError::Failed { packager, source }
}

/// Move the assembled tree to `renamed` beside it
///
/// A tree already renamed by an earlier packaging run is reused as is, so
/// `--do <packager>` can be repeated on the same working directory.
fn rename_tree(tree_root: &Path, renamed: &Path) -> anyhow::Result<()> {
    if renamed == tree_root {
        return Ok(());
    }
    if !tree_root.exists() {
        if renamed.is_dir() {
            debug!(tree = %renamed.display(), "Tree already renamed, packaging it as is");
            return Ok(());
        }
        anyhow::bail!("assembled tree not found: {}", tree_root.display());
    }

    crate::fs::remove_if_exists(renamed)?;
    fs::rename(tree_root, renamed).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            tree_root.display(),
            renamed.display()
        )
    })
}

fn output_dir(tree_root: &Path) -> anyhow::Result<&Path> {
    tree_root
        .parent()
        .ok_or_else(|| anyhow::anyhow!("{} has no parent directory", tree_root.display()))
}
