use std::fs;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use super::{apply_copy_rules, ActionKind};
use crate::config::UpdateChannel;
use crate::pipeline::action::{Action, ActionOutcome};
use crate::pipeline::context::PipelineContext;
use crate::profile::MiscSpec;

/// Extension download, update metadata, launcher config and loose files
pub struct CopyMisc;

fn launcher_config(mirror: &str) -> String {
    format!(
        "[General]\nupdater_delay = 60\n\n[Mirror.localhost]\nurl_prefix = {}\n",
        mirror
    )
}

/// Mirror for the requested channel; `None` means no launcher config at all
fn channel_mirror(misc: &MiscSpec, channel: UpdateChannel) -> Result<Option<&str>> {
    let mirror = match channel {
        UpdateChannel::None => return Ok(None),
        UpdateChannel::Stable => misc.stable_mirror.as_deref(),
        UpdateChannel::Unstable => misc.unstable_mirror.as_deref(),
    };
    match mirror {
        Some(url) => Ok(Some(url)),
        None => bail!("update channel {:?} requested but the profile has no mirror for it", channel),
    }
}

impl Action for CopyMisc {
    fn name(&self) -> &'static str {
        ActionKind::CopyMisc.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let misc = &ctx.profile.misc;

        if let (Some(url), Some(dest)) = (&misc.extension_url, &misc.extension_dest) {
            let dest = ctx.expand(dest)?;
            info!(url = %url, "Downloading extension");
            ctx.tools.downloader.download(url, &dest)?;
        }

        for dir in &misc.directories {
            let dir = ctx.expand(dir)?;
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        match (channel_mirror(misc, ctx.build.update_channel)?, &misc.launcher_config) {
            (Some(mirror), Some(path)) => {
                let path = ctx.expand(path)?;
                fs::write(&path, launcher_config(mirror))
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(mirror, path = %path.display(), "Launcher update config written");
            }
            (Some(_), None) => bail!("update channel requested but the profile has no launcher_config path"),
            (None, _) => debug!("No update channel, skipping launcher config"),
        }

        let copied = apply_copy_rules(ctx, &misc.files)?;
        info!(copied, "Misc files copied");
        Ok(ActionOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn misc() -> MiscSpec {
        MiscSpec {
            stable_mirror: Some("https://dl.example.org/tuf".to_string()),
            unstable_mirror: Some("https://dl.example.org/tuf-unstable".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_channel_mirror() {
        let misc = misc();
        assert_eq!(channel_mirror(&misc, UpdateChannel::None).unwrap(), None);
        assert_eq!(
            channel_mirror(&misc, UpdateChannel::Unstable).unwrap(),
            Some("https://dl.example.org/tuf-unstable")
        );
        assert!(channel_mirror(&MiscSpec::default(), UpdateChannel::Stable).is_err());
    }

    #[test]
    fn test_launcher_config_text() {
        let text = launcher_config("https://dl.example.org/tuf");
        assert!(text.starts_with("[General]\nupdater_delay = 60\n"));
        assert!(text.ends_with("url_prefix = https://dl.example.org/tuf\n"));
    }
}
