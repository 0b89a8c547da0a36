use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{
    artifact_stem, failed, output_dir, rename_tree, ArtifactPackager, PackageError, PackagerKind,
};
use crate::fs::remove_if_exists;
use crate::pipeline::platform::Platform;

/// Deflate zip of every regular file under the renamed tree
///
/// Entry names keep the renamed top-level directory; directory entries are
/// implied by file paths and never stored.
pub struct ZipPackager {
    product: String,
    platform: Platform,
}

impl ZipPackager {
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

        let output = parent.join(format!("{}.{}", stem, PackagerKind::Zip.extension()));
        let partial = parent.join(format!("{}.zip.partial", stem));

        if let Err(e) = write_zip(&renamed, parent, &partial) {
            remove_if_exists(&partial)?;
            return Err(e);
        }

        remove_if_exists(&output)?;
        fs::rename(&partial, &output)
            .with_context(|| format!("Failed to move archive to {}", output.display()))?;
        info!(artifact = %output.display(), "Zip archive created");
        Ok(output)
    }
}

fn write_zip(tree: &Path, base: &Path, dest: &Path) -> Result<()> {
    let file =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut zip = ZipWriter::new(file);
    let mut count = 0usize;

    for entry in WalkDir::new(tree).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", tree.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry.path().strip_prefix(base)?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(file_mode(&entry.metadata()?));
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {}", name))?;
        let mut source = File::open(entry.path())?;
        io::copy(&mut source, &mut zip)?;
        count += 1;
    }

    zip.finish().context("Failed to finish zip archive")?;
    debug!(files = count, dest = %dest.display(), "Zip written");
    Ok(())
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn file_mode(_meta: &fs::Metadata) -> u32 {
    0o644
}

impl ArtifactPackager for ZipPackager {
    fn kind(&self) -> PackagerKind {
        PackagerKind::Zip
    }

    fn package(&self, tree_root: &Path, version: &str) -> Result<PathBuf, PackageError> {
        self.build(tree_root, version).map_err(failed(PackagerKind::Zip))
    }
}
