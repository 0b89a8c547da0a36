use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::{artifact_stem, failed, output_dir, ArtifactPackager, PackageError, PackagerKind};
use crate::fs::{copy_entry, copy_into, dir_size, remove_if_exists};
use crate::pipeline::platform::Platform;
use crate::tools::DiskImageTool;

const STAGING_DIR: &str = "dmg";
const VOLUME_ICON: &str = ".VolumeIcon.icns";
/// Slack added on top of twice the staged size
const SIZE_HEADROOM_KB: u64 = 50 * 1024;

/// Compressed read-only disk image built through a writable intermediate
pub struct DiskImagePackager {
    tool: Arc<dyn DiskImageTool>,
    product: String,
    volume_name: String,
    /// Entries copied to the volume root
    contents: Vec<PathBuf>,
    volume_icon: Option<PathBuf>,
}

impl DiskImagePackager {
    pub fn new(tool: Arc<dyn DiskImageTool>, product: impl Into<String>) -> Self {
        let product = product.into();
        Self {
            tool,
            volume_name: product.clone(),
            product,
            contents: Vec::new(),
            volume_icon: None,
        }
    }

    pub fn with_volume_name(mut self, name: impl Into<String>) -> Self {
        self.volume_name = name.into();
        self
    }

    pub fn with_contents(mut self, contents: Vec<PathBuf>) -> Self {
        self.contents = contents;
        self
    }

    pub fn with_volume_icon(mut self, icon: Option<PathBuf>) -> Self {
        self.volume_icon = icon;
        self
    }

    fn stage(&self, staging: &Path) -> Result<()> {
        remove_if_exists(staging)?;
        fs::create_dir_all(staging)
            .with_context(|| format!("Failed to create {}", staging.display()))?;

        for entry in &self.contents {
            copy_into(entry, staging)
                .with_context(|| format!("Failed to stage {}", entry.display()))?;
        }

        if let Some(icon) = &self.volume_icon {
            let dest = staging.join(VOLUME_ICON);
            copy_entry(icon, &dest)?;
            self.tool.set_icon_creator(&dest)?;
        }
        Ok(())
    }

    fn build(&self, tree_root: &Path, version: &str) -> Result<PathBuf> {
        let work = output_dir(tree_root)?;
        let staging = work.join(STAGING_DIR);
        self.stage(&staging)?;

        let stem = artifact_stem(&self.product, Platform::MacOs, version);
        let raw = work.join(format!("raw-{}.dmg", stem));
        let output = work.join(format!("{}.{}", stem, PackagerKind::DiskImage.extension()));
        remove_if_exists(&output)?;

        let size_kb = dir_size(&staging)? / 1024 * 2 + SIZE_HEADROOM_KB;
        debug!(size_kb, staging = %staging.display(), "Creating writable image");
        self.tool
            .create(&staging, &self.volume_name, size_kb, &raw)?;

        // Reuse the emptied staging directory as the mountpoint
        remove_if_exists(&staging)?;
        fs::create_dir_all(&staging)?;
        self.tool.attach(&raw, &staging)?;
        let flagged = self.tool.set_custom_icon_flag(&staging);
        self.tool.detach(&staging)?;
        flagged?;
        remove_if_exists(&staging)?;

        if let Err(e) = self.tool.convert(&raw, &output) {
            remove_if_exists(&output)?;
            return Err(e).context("Failed to convert disk image");
        }
        if let Err(e) = remove_if_exists(&raw) {
            warn!(image = %raw.display(), error = %e, "Failed to remove intermediate image");
        }

        info!(artifact = %output.display(), "Disk image created");
        Ok(output)
    }
}

impl ArtifactPackager for DiskImagePackager {
    fn kind(&self) -> PackagerKind {
        PackagerKind::DiskImage
    }

    fn package(&self, tree_root: &Path, version: &str) -> Result<PathBuf, PackageError> {
        self.build(tree_root, version)
            .map_err(failed(PackagerKind::DiskImage))
    }
}
