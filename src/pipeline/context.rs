use std::path::{Path, PathBuf};

use anyhow::Result;

use super::layout::BundleLayout;
use super::platform::{Platform, PlatformStrategy};
use crate::config::BuildContext;
use crate::profile::BundleProfile;
use crate::tools::Toolbox;

/// Read-only state shared by every action of one run
pub struct PipelineContext {
    pub build: BuildContext,
    pub profile: BundleProfile,
    pub strategy: PlatformStrategy,
    pub layout: BundleLayout,
    pub tools: Toolbox,
    pub work_dir: PathBuf,
}

impl PipelineContext {
    pub fn new(
        build: BuildContext,
        profile: BundleProfile,
        strategy: PlatformStrategy,
        tools: Toolbox,
        work_dir: &Path,
    ) -> Self {
        let layout = BundleLayout::new(
            strategy.platform(),
            work_dir,
            &build.binaries,
            &profile.product.name,
        );
        Self {
            build,
            profile,
            strategy,
            layout,
            tools,
            work_dir: work_dir.to_path_buf(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.strategy.platform()
    }

    /// Clone location of a repository
    pub fn repo_dir(&self, repo: &str) -> PathBuf {
        self.work_dir.join(repo)
    }

    pub fn expand(&self, template: &str) -> Result<PathBuf> {
        self.layout.expand(template)
    }
}
