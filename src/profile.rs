//! Bundle profile: the product-specific data the pipeline assembles
//!
//! A profile names the product, lists the component repositories in their
//! fixed processing order, and describes where every piece of the bundle
//! comes from and where it lands. The pipeline itself knows nothing about
//! any particular product; it only interprets a profile.
//!
//! Profiles are TOML documents. A default profile is embedded in the binary
//! and `--profile <file>` replaces it wholesale.
//!
//! Paths inside a profile are templates. See [`crate::pipeline::layout`] for
//! the anchors they may use.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::pipeline::platform::Platform;

const DEFAULT_PROFILE: &str = include_str!("../profiles/default.toml");

/// Complete description of one bundle product
#[derive(Debug, Clone, Deserialize)]
pub struct BundleProfile {
    pub product: ProductInfo,

    /// Component repositories, in processing order
    #[serde(default)]
    pub repositories: Vec<RepositorySpec>,

    /// Directories created under `{app}` on every platform
    #[serde(default)]
    pub directories: Vec<String>,

    #[serde(default)]
    pub collect: CollectSpec,

    /// Copy rules applied on every platform after the platform rules
    #[serde(default)]
    pub binaries: Vec<CopyRule>,

    #[serde(default)]
    pub misc: MiscSpec,

    #[serde(default)]
    pub cleanup: CleanupSpec,

    /// Destination of the seeded configuration directory
    #[serde(default = "default_seeded_config")]
    pub seeded_config: String,

    #[serde(default)]
    pub macos: MacosSection,

    #[serde(default)]
    pub windows: WindowsSection,

    #[serde(default)]
    pub linux: PlatformSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInfo {
    /// Product name, used for the assembled tree and artifact names
    pub name: String,
    pub identifier: String,
    pub executable: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_short_version")]
    pub short_version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositorySpec {
    pub name: String,
    pub url: String,

    /// Source roots (relative to the repository) handed to the dependency collector
    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default)]
    pub setup: Vec<SetupStep>,
}

/// One command run while setting up a repository
#[derive(Debug, Clone, Deserialize)]
pub struct SetupStep {
    /// Sub-directory of the repository to run in
    #[serde(default)]
    pub dir: Option<String>,
    pub command: Vec<String>,
    /// Extra environment for this command only; values are templates
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectSpec {
    #[serde(default)]
    pub entry_point: String,
    #[serde(default = "default_collect_destination")]
    pub destination: String,
    /// Package directory pruned down to `keep` after collection
    #[serde(default)]
    pub prune_within: Option<String>,
    #[serde(default)]
    pub keep: Vec<String>,
}

impl Default for CollectSpec {
    fn default() -> Self {
        Self {
            entry_point: String::new(),
            destination: default_collect_destination(),
            prune_within: None,
            keep: Vec::new(),
        }
    }
}

/// Copy `from` (which may contain wildcards) into the directory `to`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CopyRule {
    pub from: String,
    pub to: String,
    /// A rule matching nothing is an error unless optional
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiscSpec {
    #[serde(default)]
    pub extension_url: Option<String>,
    #[serde(default)]
    pub extension_dest: Option<String>,
    #[serde(default)]
    pub launcher_config: Option<String>,
    #[serde(default)]
    pub stable_mirror: Option<String>,
    #[serde(default)]
    pub unstable_mirror: Option<String>,
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub files: Vec<CopyRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CleanupSpec {
    /// File name patterns deleted from the assembled tree
    #[serde(default)]
    pub remove: Vec<String>,
    /// File name patterns passed through `strip`
    #[serde(default)]
    pub strip: Vec<String>,
    /// Entry name patterns removed before archiving on Linux
    #[serde(default)]
    pub unused: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformSection {
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub binaries: Vec<CopyRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MacosSection {
    #[serde(flatten)]
    pub common: PlatformSection,
    #[serde(default)]
    pub assets: Vec<CopyRule>,
    #[serde(default)]
    pub resource_files: Vec<ResourceFile>,
    #[serde(default)]
    pub sign: Vec<SignTarget>,
    #[serde(default = "default_launcher_name")]
    pub launcher_name: String,
    /// Executable the launcher script starts; defaults to the product executable
    #[serde(default)]
    pub launcher_target: Option<String>,
    #[serde(default)]
    pub disk_image: DiskImageSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceFile {
    pub path: String,
    pub contents: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignTarget {
    pub path: String,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiskImageSpec {
    /// Entries staged at the volume root
    #[serde(default)]
    pub contents: Vec<String>,
    #[serde(default)]
    pub volume_icon: Option<String>,
    #[serde(default)]
    pub volume_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowsSection {
    #[serde(flatten)]
    pub common: PlatformSection,
    #[serde(default)]
    pub manifests: Vec<ManifestTarget>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestTarget {
    pub dir: String,
    pub manifest: String,
    pub executable: String,
}

fn default_seeded_config() -> String {
    "{app}/config".to_string()
}

fn default_short_version() -> String {
    "1".to_string()
}

fn default_collect_destination() -> String {
    "{app}/lib".to_string()
}

fn default_launcher_name() -> String {
    "launcher".to_string()
}

impl BundleProfile {
    /// The profile shipped with the binary
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(DEFAULT_PROFILE, "<builtin>")
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Profile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let profile: Self = toml::from_str(content).map_err(|e| ConfigError::Profile {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        profile.validate().map_err(|reason| ConfigError::Profile {
            path: origin.to_string(),
            reason,
        })?;
        Ok(profile)
    }

    fn validate(&self) -> Result<(), String> {
        if self.product.name.trim().is_empty() {
            return Err("product.name must not be empty".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for repo in &self.repositories {
            if repo.name.trim().is_empty() {
                return Err("repository name must not be empty".to_string());
            }
            if !seen.insert(repo.name.as_str()) {
                return Err(format!("repository '{}' listed twice", repo.name));
            }
            if let Some(step) = repo.setup.iter().find(|s| s.command.is_empty()) {
                return Err(format!(
                    "repository '{}' has a setup step without a command (dir: {:?})",
                    repo.name, step.dir
                ));
            }
        }
        Ok(())
    }

    /// Repository names in processing order
    pub fn repository_names(&self) -> Vec<String> {
        self.repositories.iter().map(|r| r.name.clone()).collect()
    }

    pub fn section(&self, platform: Platform) -> &PlatformSection {
        match platform {
            Platform::MacOs => &self.macos.common,
            Platform::Windows => &self.windows.common,
            Platform::Linux => &self.linux,
        }
    }

    pub fn launcher_target(&self) -> &str {
        self.macos
            .launcher_target
            .as_deref()
            .unwrap_or(&self.product.executable)
    }
}
