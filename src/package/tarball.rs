use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bzip2::write::BzEncoder;
use bzip2::Compression;
use tracing::{debug, info};

use super::{
    artifact_stem, failed, output_dir, rename_tree, ArtifactPackager, PackageError, PackagerKind,
};
use crate::fs::remove_if_exists;
use crate::pipeline::platform::Platform;

/// bzip2-compressed tarball whose sole top-level entry is the renamed tree
pub struct TarballPackager {
    product: String,
    platform: Platform,
}

impl TarballPackager {
    pub fn new(product: impl Into<String>, platform: Platform) -> Self {
        Self {
            product: product.into(),
            platform,
        }
    }

    fn build(&self, tree_root: &Path, version: &str) -> Result<PathBuf> {
        let parent = output_dir(tree_root)?;
        let stem = artifact_stem(&self.product, self.platform, version);
        let renamed = parent.join(&stem);

        rename_tree(tree_root, &renamed)?;

        let output = parent.join(format!("{}.{}", stem, PackagerKind::Tarball.extension()));
        let partial = parent.join(format!("{}.tar.bz2.partial", stem));

        let written = write_tarball(&renamed, &stem, &partial);
        if let Err(e) = written {
            remove_if_exists(&partial)?;
            return Err(e);
        }

        remove_if_exists(&output)?;
        fs::rename(&partial, &output)
            .with_context(|| format!("Failed to move tarball to {}", output.display()))?;
        info!(artifact = %output.display(), "Tarball created");
        Ok(output)
    }
}

fn write_tarball(tree: &Path, top_level: &str, dest: &Path) -> Result<()> {
    debug!(tree = %tree.display(), dest = %dest.display(), "Writing tarball");

    let file =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let encoder = BzEncoder::new(file, Compression::best());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(top_level, tree)
        .with_context(|| format!("Failed to archive {}", tree.display()))?;

    let encoder = builder.into_inner().context("Failed to finish tar stream")?;
    encoder.finish().context("Failed to finish bzip2 stream")?;
    Ok(())
}

impl ArtifactPackager for TarballPackager {
    fn kind(&self) -> PackagerKind {
        PackagerKind::Tarball
    }

    fn package(&self, tree_root: &Path, version: &str) -> Result<PathBuf, PackageError> {
        self.build(tree_root, version)
            .map_err(failed(PackagerKind::Tarball))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::read::BzDecoder;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn tree(dir: &TempDir) -> PathBuf {
        let root = dir.path().join("Bundle");
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("bitmask"), b"#!/bin/sh\n").unwrap();
        fs::write(root.join("lib/libQtCore.so.4"), b"elf").unwrap();
        root
    }

    fn entries(archive: &Path) -> Vec<String> {
        let file = File::open(archive).unwrap();
        let mut archive = tar::Archive::new(BzDecoder::new(file));
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_tarball_has_single_top_level_entry() {
        let dir = TempDir::new().unwrap();
        let root = tree(&dir);

        let packager = TarballPackager::new("Bundle", Platform::Linux);
        let output = packager.package(&root, "2024-01-01-abc12345").unwrap();

        let stem = artifact_stem("Bundle", Platform::Linux, "2024-01-01-abc12345");
        assert_eq!(
            output.file_name().unwrap().to_string_lossy(),
            format!("{}.tar.bz2", stem)
        );
        assert!(!root.exists());
        assert!(dir.path().join(&stem).is_dir());

        let names = entries(&output);
        let tops: BTreeSet<&str> = names
            .iter()
            .map(|n| n.split('/').next().unwrap())
            .collect();
        assert_eq!(tops.into_iter().collect::<Vec<_>>(), vec![stem.as_str()]);
        assert!(names.iter().any(|n| n.ends_with("lib/libQtCore.so.4")));
        assert!(!dir.path().join(format!("{}.tar.bz2.partial", stem)).exists());
    }

    #[test]
    fn test_missing_tree_fails_without_artifact() {
        let dir = TempDir::new().unwrap();
        let packager = TarballPackager::new("Bundle", Platform::Linux);
        let err = packager
            .package(&dir.path().join("Bundle"), "1.0")
            .unwrap_err();
        assert_eq!(err.packager(), PackagerKind::Tarball);

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_repackaging_reuses_renamed_tree() {
        let dir = TempDir::new().unwrap();
        let root = tree(&dir);
        let packager = TarballPackager::new("Bundle", Platform::Linux);

        let first = packager.package(&root, "1.0").unwrap();
        let second = packager.package(&root, "1.0").unwrap();

        let stem = artifact_stem("Bundle", Platform::Linux, "1.0");
        assert_eq!(first, second);
        assert!(dir.path().join(&stem).join("lib/libQtCore.so.4").is_file());
        assert!(entries(&second)
            .iter()
            .any(|n| n.ends_with("lib/libQtCore.so.4")));
    }

    #[test]
    fn test_missing_tree_keeps_other_version_tree() {
        let dir = TempDir::new().unwrap();
        let root = tree(&dir);
        let packager = TarballPackager::new("Bundle", Platform::Linux);
        packager.package(&root, "1.0").unwrap();

        // A different version finds neither tree; nothing is removed
        let err = packager.package(&root, "2.0").unwrap_err();
        assert!(format!("{}", err).contains("assembled tree not found"));
        let stem = artifact_stem("Bundle", Platform::Linux, "1.0");
        assert!(dir.path().join(stem).is_dir());
    }
}
