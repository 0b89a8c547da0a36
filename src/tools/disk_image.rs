use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use super::runner::{CommandRunner, ToolCommand};

/// Disk image operations used by the macOS packager
pub trait DiskImageTool: Send + Sync {
    /// Create a writable HFS+ image of `size_kb` from `source`
    fn create(&self, source: &Path, volume_name: &str, size_kb: u64, dest: &Path) -> Result<()>;
    fn attach(&self, image: &Path, mountpoint: &Path) -> Result<()>;
    fn detach(&self, mountpoint: &Path) -> Result<()>;
    /// Convert to a compressed read-only image
    fn convert(&self, image: &Path, dest: &Path) -> Result<()>;
    /// Mark `path` as carrying a custom icon creator code
    fn set_icon_creator(&self, path: &Path) -> Result<()>;
    /// Flag the volume mounted at `path` as having a custom icon
    fn set_custom_icon_flag(&self, path: &Path) -> Result<()>;
}

/// `hdiutil` plus `SetFile` for finder attributes
pub struct Hdiutil {
    runner: Arc<dyn CommandRunner>,
    hdiutil: String,
    setfile: String,
}

impl Hdiutil {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        hdiutil: impl Into<String>,
        setfile: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            hdiutil: hdiutil.into(),
            setfile: setfile.into(),
        }
    }
}

impl DiskImageTool for Hdiutil {
    fn create(&self, source: &Path, volume_name: &str, size_kb: u64, dest: &Path) -> Result<()> {
        let cmd = ToolCommand::new(&self.hdiutil)
            .args(["create", "-srcfolder"])
            .path_arg(source)
            .args(["-volname", volume_name])
            .args(["-fsargs", "-c c=64,a=16,e=16", "-fs", "HFS+"])
            .args(["-format", "UDRW", "-ov", "-size"])
            .arg(format!("{}k", size_kb))
            .path_arg(dest);
        self.runner.run(&cmd)?;
        Ok(())
    }

    fn attach(&self, image: &Path, mountpoint: &Path) -> Result<()> {
        let cmd = ToolCommand::new(&self.hdiutil)
            .arg("attach")
            .path_arg(image)
            .arg("-mountpoint")
            .path_arg(mountpoint);
        self.runner.run(&cmd)?;
        Ok(())
    }

    fn detach(&self, mountpoint: &Path) -> Result<()> {
        let cmd = ToolCommand::new(&self.hdiutil)
            .arg("detach")
            .path_arg(mountpoint);
        self.runner.run(&cmd)?;
        Ok(())
    }

    fn convert(&self, image: &Path, dest: &Path) -> Result<()> {
        let cmd = ToolCommand::new(&self.hdiutil)
            .arg("convert")
            .path_arg(image)
            .args(["-format", "UDZO", "-imagekey", "zlib-level=9", "-o"])
            .path_arg(dest);
        self.runner.run(&cmd)?;
        Ok(())
    }

    fn set_icon_creator(&self, path: &Path) -> Result<()> {
        let cmd = ToolCommand::new(&self.setfile)
            .args(["-c", "icnC"])
            .path_arg(path);
        self.runner.run(&cmd)?;
        Ok(())
    }

    fn set_custom_icon_flag(&self, path: &Path) -> Result<()> {
        let cmd = ToolCommand::new(&self.setfile).args(["-a", "C"]).path_arg(path);
        self.runner.run(&cmd)?;
        Ok(())
    }
}
