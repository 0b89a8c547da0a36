//! Run configuration for appbundler
//!
//! A [`BuildContext`] is assembled once from the command line, validated, and
//! then treated as immutable for the whole run. Anything missing or malformed
//! is reported as a [`ConfigError`] before a single action executes.
//!
//! # Environment Variables
//!
//! External programs are located through [`ToolConfig`], which reads:
//! - `APPBUNDLER_GIT` - default: "git"
//! - `APPBUNDLER_HDIUTIL` - default: "hdiutil"
//! - `APPBUNDLER_SETFILE` - default: "SetFile"
//! - `APPBUNDLER_CODESIGN` - default: "codesign"
//! - `APPBUNDLER_MT` - default: "mt.exe"
//! - `APPBUNDLER_STRIP` - default: "strip"
//! - `APPBUNDLER_OTOOL` - default: "otool"
//! - `APPBUNDLER_INSTALL_NAME_TOOL` - default: "install_name_tool"
//! - `APPBUNDLER_DEPCOLLECTOR` - default: "depcollector"
//!
//! Logging is configured separately, see [`crate::util::logging`].

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::cli::CliArgs;
use crate::pipeline::selection::SelectionPolicy;

/// Key in the versions file carrying the release version
pub const VERSION_KEY: &str = "version";

/// Configuration errors, all fatal before the pipeline starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required argument {flag}: {hint}")]
    MissingArgument {
        flag: &'static str,
        hint: &'static str,
    },

    #[error("Invalid path for {flag}: {path} ({reason})")]
    InvalidPath {
        flag: &'static str,
        path: String,
        reason: String,
    },

    #[error("Failed to load versions file {path}: {reason}")]
    VersionsFile { path: String, reason: String },

    #[error("Invalid profile {path}: {reason}")]
    Profile { path: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Checkout targets per repository plus the optional release version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionsManifest {
    targets: BTreeMap<String, String>,
    version: Option<String>,
}

impl VersionsManifest {
    pub fn new(targets: BTreeMap<String, String>, version: Option<String>) -> Self {
        Self { targets, version }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::VersionsFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content).map_err(|reason| ConfigError::VersionsFile {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Parse `{ "<repo>": "<ref>", ..., "version": "<version>" }`
    pub fn parse(content: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let Value::Object(map) = value else {
            return Err("expected a JSON object".to_string());
        };

        let mut manifest = Self::default();
        for (key, value) in map {
            match (key.as_str(), value) {
                (VERSION_KEY, Value::Null) => {}
                (VERSION_KEY, Value::String(v)) => manifest.version = Some(v),
                (_, Value::String(target)) => {
                    manifest.targets.insert(key, target);
                }
                (_, other) => {
                    return Err(format!(
                        "value for '{}' must be a string, got {}",
                        key, other
                    ))
                }
            }
        }
        Ok(manifest)
    }

    /// Checkout target for a repository, if one was pinned
    pub fn target(&self, repo: &str) -> Option<&str> {
        self.targets.get(repo).map(String::as_str)
    }

    /// Explicit version as written, which may be the nightly sentinel
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn targets(&self) -> &BTreeMap<String, String> {
        &self.targets
    }
}

/// Which update mirror the bundled launcher is pointed at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateChannel {
    Stable,
    Unstable,
    #[default]
    None,
}

/// Locations of the external programs actions shell out to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub git: String,
    pub hdiutil: String,
    pub setfile: String,
    pub codesign: String,
    pub mt: String,
    pub strip: String,
    pub otool: String,
    pub install_name_tool: String,
    pub depcollector: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let program = |var: &str, fallback: &str| {
            env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            git: program("APPBUNDLER_GIT", "git"),
            hdiutil: program("APPBUNDLER_HDIUTIL", "hdiutil"),
            setfile: program("APPBUNDLER_SETFILE", "SetFile"),
            codesign: program("APPBUNDLER_CODESIGN", "codesign"),
            mt: program("APPBUNDLER_MT", "mt.exe"),
            strip: program("APPBUNDLER_STRIP", "strip"),
            otool: program("APPBUNDLER_OTOOL", "otool"),
            install_name_tool: program("APPBUNDLER_INSTALL_NAME_TOOL", "install_name_tool"),
            depcollector: program("APPBUNDLER_DEPCOLLECTOR", "depcollector"),
        }
    }
}

/// Everything one pipeline run needs, fixed before the first action
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Caller-supplied working directory; `None` means allocate a temporary one
    pub work_dir: Option<PathBuf>,
    pub paths_file: PathBuf,
    pub versions_file: PathBuf,
    pub binaries: PathBuf,
    pub seeded_config: Option<PathBuf>,
    pub codesign_identity: Option<String>,
    pub versions: VersionsManifest,
    pub selection: SelectionPolicy,
    pub update_channel: UpdateChannel,
    /// Where the final artifact is delivered
    pub output_dir: Option<PathBuf>,
}

impl BuildContext {
    /// Validate command-line input into a context
    ///
    /// Fails on the first missing or unusable required input. Nothing on disk
    /// is created or modified.
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let paths_file = require(
            &args.paths_file,
            "--paths-file",
            "the dependency collector needs a paths file",
        )?;
        let binaries = require(
            &args.binaries,
            "--binaries",
            "building from source is not supported, point this at the prebuilt binaries",
        )?;
        let versions_file = require(
            &args.versions_file,
            "--versions-file",
            "a versions file is needed to pin each repository",
        )?;

        let paths_file = canonical(&paths_file, "--paths-file")?;
        let binaries = canonical(&binaries, "--binaries")?;
        let versions_file = canonical(&versions_file, "--versions-file")?;
        let seeded_config = args
            .seeded_config
            .as_deref()
            .map(|p| canonical(p, "--seeded-config"))
            .transpose()?;

        let work_dir = args
            .workon
            .as_deref()
            .map(|dir| absolute(dir, "--workon"))
            .transpose()?;

        let versions = VersionsManifest::load(&versions_file)?;

        let codesign_identity = Some(args.codesign.trim().to_string()).filter(|s| !s.is_empty());

        let context = Self {
            work_dir,
            paths_file,
            versions_file,
            binaries,
            seeded_config,
            codesign_identity,
            versions,
            selection: SelectionPolicy::new(args.skip.clone(), args.only.clone()),
            update_channel: args.update_channel.into(),
            output_dir: args.output_dir.clone(),
        };
        context.validate()?;
        Ok(context)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.binaries.is_dir() {
            return Err(ConfigError::ValidationFailed(format!(
                "binaries path is not a directory: {}",
                self.binaries.display()
            )));
        }
        if let Some(seeded) = &self.seeded_config {
            if !seeded.is_dir() {
                return Err(ConfigError::ValidationFailed(format!(
                    "seeded config is not a directory: {}",
                    seeded.display()
                )));
            }
        }
        if let Some(work) = &self.work_dir {
            if work.exists() && !work.is_dir() {
                return Err(ConfigError::ValidationFailed(format!(
                    "working directory path is not a directory: {}",
                    work.display()
                )));
            }
        }
        Ok(())
    }

    /// Explicit version from the versions file, possibly the nightly sentinel
    pub fn explicit_version(&self) -> Option<&str> {
        self.versions.version()
    }
}

fn require(
    value: &Option<PathBuf>,
    flag: &'static str,
    hint: &'static str,
) -> Result<PathBuf, ConfigError> {
    value
        .clone()
        .ok_or(ConfigError::MissingArgument { flag, hint })
}

fn canonical(path: &Path, flag: &'static str) -> Result<PathBuf, ConfigError> {
    fs::canonicalize(path).map_err(|e| ConfigError::InvalidPath {
        flag,
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

// A caller-supplied working directory may not exist yet; it is created when
// the run starts, never while the command line is being validated.
fn absolute(path: &Path, flag: &'static str) -> Result<PathBuf, ConfigError> {
    if path.exists() {
        return canonical(path, flag);
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| ConfigError::InvalidPath {
            flag,
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}
