use anyhow::Result;
use tracing::info;

use crate::package::{
    ArtifactPackager, DiskImagePackager, PackagerKind, TarballPackager, ZipPackager,
};
use crate::pipeline::action::{Action, ActionOutcome};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::version::{self, GitStateProvider};

/// Terminal step: resolve the version once and package the tree
pub struct PackageAction {
    kind: PackagerKind,
}

impl PackageAction {
    pub fn new(kind: PackagerKind) -> Self {
        Self { kind }
    }

    fn packager(&self, ctx: &PipelineContext) -> Result<Box<dyn ArtifactPackager>> {
        let product = &ctx.profile.product.name;
        let packager: Box<dyn ArtifactPackager> = match self.kind {
            PackagerKind::DiskImage => {
                let spec = &ctx.profile.macos.disk_image;
                let contents = spec
                    .contents
                    .iter()
                    .map(|c| ctx.expand(c))
                    .collect::<Result<Vec<_>>>()?;
                let icon = spec.volume_icon.as_deref().map(|i| ctx.expand(i)).transpose()?;
                let volume = spec.volume_name.clone().unwrap_or_else(|| product.clone());

                Box::new(
                    DiskImagePackager::new(ctx.tools.disk_image.clone(), product.as_str())
                        .with_volume_name(volume)
                        .with_contents(contents)
                        .with_volume_icon(icon),
                )
            }
            PackagerKind::Zip => Box::new(ZipPackager::new(product.as_str(), ctx.platform())),
            PackagerKind::Tarball => {
                Box::new(TarballPackager::new(product.as_str(), ctx.platform()))
            }
        };
        Ok(packager)
    }
}

impl Action for PackageAction {
    fn name(&self) -> &'static str {
        self.kind.action_name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let packager = self.packager(ctx)?;

        let provider = GitStateProvider::new(ctx.tools.git.as_ref(), &ctx.work_dir);
        let version = version::resolve(
            ctx.build.explicit_version(),
            &ctx.profile.repository_names(),
            &provider,
        );
        info!(version = %version, packager = %self.kind, "Packaging");

        let artifact = packager.package(ctx.layout.root(), &version)?;
        Ok(ActionOutcome::Artifact(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_follow_packager() {
        assert_eq!(PackageAction::new(PackagerKind::DiskImage).name(), "dmg");
        assert_eq!(PackageAction::new(PackagerKind::Tarball).name(), "tarball");
    }
}
