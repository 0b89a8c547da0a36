//! macOS-only tail: bundle metadata, launcher, assets, load paths, signing

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{apply_copy_rules, ActionKind};
use crate::fs::set_mode;
use crate::pipeline::action::{Action, ActionOutcome};
use crate::pipeline::context::PipelineContext;
use crate::profile::BundleProfile;
use crate::tools::ToolCommand;

const LAUNCHER_MODE: u32 = 0o755;

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn info_plist(profile: &BundleProfile) -> String {
    let product = &profile.product;
    let mut entries = vec![
        ("CFBundleDisplayName", product.name.clone()),
        (
            "CFBundleExecutable",
            format!("MacOS/{}", profile.macos.launcher_name),
        ),
    ];
    if let Some(icon) = &product.icon {
        entries.push(("CFBundleIconFile", icon.clone()));
    }
    entries.extend([
        ("CFBundleInfoDictionaryVersion", "6.0".to_string()),
        ("CFBundleName", product.name.clone()),
        ("CFBundlePackageType", "APPL".to_string()),
        ("CFBundleShortVersionString", product.short_version.clone()),
        ("CFBundleIdentifier", product.identifier.clone()),
    ]);

    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \
         \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
         <plist version=\"1.0\">\n<dict>\n",
    );
    for (key, value) in entries {
        out.push_str(&format!(
            "    <key>{}</key>\n    <string>{}</string>\n",
            key,
            escape_xml(&value)
        ));
    }
    out.push_str("    <key>LSBackgroundOnly</key>\n    <false/>\n</dict>\n</plist>\n");
    out
}

fn launcher_script(product: &str, target: &str) -> String {
    format!(
        r#"#!/bin/bash
#
# Launcher for {product} under OSX
#
DIR="$( cd "$( dirname "${{BASH_SOURCE[0]}}" )" && pwd)"
export DYLD_LIBRARY_PATH=$DIR/lib
export PATH=$DIR/../Resources/:$PATH

cd "${{DIR}}" && ./{target} "$@"
"#
    )
}

/// `Info.plist` plus the profile's generated resource files
pub struct Plist;

impl Action for Plist {
    fn name(&self) -> &'static str {
        ActionKind::Plist.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let contents = ctx
            .layout
            .contents()
            .context("Info.plist only applies to .app bundles")?;
        let plist = contents.join("Info.plist");
        fs::write(&plist, info_plist(&ctx.profile))
            .with_context(|| format!("Failed to write {}", plist.display()))?;

        for resource in &ctx.profile.macos.resource_files {
            let path = ctx.expand(&resource.path)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &resource.contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        info!(plist = %plist.display(), "Bundle metadata written");
        Ok(ActionOutcome::Done)
    }
}

/// Shell launcher that sets up library paths and starts the real executable
pub struct Launcher;

impl Action for Launcher {
    fn name(&self) -> &'static str {
        ActionKind::Launcher.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let path = ctx.layout.app().join(&ctx.profile.macos.launcher_name);
        let script = launcher_script(&ctx.profile.product.name, ctx.profile.launcher_target());
        fs::write(&path, script).with_context(|| format!("Failed to write {}", path.display()))?;
        set_mode(&path, LAUNCHER_MODE)?;
        info!(launcher = %path.display(), "Launcher script written");
        Ok(ActionOutcome::Done)
    }
}

pub struct CopyAssets;

impl Action for CopyAssets {
    fn name(&self) -> &'static str {
        ActionKind::CopyAssets.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let copied = apply_copy_rules(ctx, &ctx.profile.macos.assets)?;
        info!(copied, "Assets copied");
        Ok(ActionOutcome::Done)
    }
}

const MACH_O_MAGIC: [[u8; 4]; 5] = [
    [0xfe, 0xed, 0xfa, 0xce],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xca, 0xfe, 0xba, 0xbe],
];

fn is_mach_o(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| MACH_O_MAGIC.contains(&magic))
        .unwrap_or(false)
}

/// Absolute load commands from `otool -L` output that must be rewritten
fn foreign_references(otool_output: &str) -> Vec<&str> {
    otool_output
        .lines()
        .skip(1)
        .filter_map(|line| line.trim().split(" (").next())
        .filter(|dep| dep.starts_with('/'))
        .filter(|dep| !dep.starts_with("/usr/lib/") && !dep.starts_with("/System/"))
        .collect()
}

/// Point non-system library references at the bundled `lib` directory
pub struct FixDylibs;

impl Action for FixDylibs {
    fn name(&self) -> &'static str {
        ActionKind::FixDylibs.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let programs = &ctx.tools.programs;
        let mut rewritten = 0;

        for entry in WalkDir::new(ctx.layout.app()).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_mach_o(entry.path()) {
                continue;
            }

            let file = entry.path();
            let listing = ctx
                .tools
                .runner
                .run(&ToolCommand::new(&programs.otool).arg("-L").path_arg(file))
                .with_context(|| format!("Failed to list load commands of {}", file.display()))?;

            for dep in foreign_references(&listing) {
                let Some(lib) = Path::new(dep).file_name() else {
                    continue;
                };
                let replacement = format!("@executable_path/lib/{}", lib.to_string_lossy());
                debug!(file = %file.display(), from = dep, to = %replacement, "Rewriting load path");
                let cmd = ToolCommand::new(&programs.install_name_tool)
                    .args(["-change", dep, replacement.as_str()])
                    .path_arg(file);
                ctx.tools.runner.run(&cmd)?;
                rewritten += 1;
            }
        }
        info!(rewritten, "Library load paths fixed");
        Ok(ActionOutcome::Done)
    }
}

/// Sign profile targets in order, nested components before the bundle
pub struct Codesign;

impl Action for Codesign {
    fn name(&self) -> &'static str {
        ActionKind::Codesign.name()
    }

    fn run(&self, ctx: &PipelineContext) -> Result<ActionOutcome> {
        let Some(identity) = ctx.build.codesign_identity.as_deref() else {
            info!("No signing identity, nothing to sign");
            return Ok(ActionOutcome::Done);
        };

        for target in &ctx.profile.macos.sign {
            let path = ctx.expand(&target.path)?;
            info!(target = %path.display(), "Signing");
            let report = ctx
                .tools
                .signer
                .sign(identity, &path, target.force)
                .with_context(|| format!("Failed to sign {}", path.display()))?;
            if !report.trim().is_empty() {
                debug!(report = %report.trim(), "codesign output");
            }
        }
        Ok(ActionOutcome::Done)
    }
}
