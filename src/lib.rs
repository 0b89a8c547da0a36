//! appbundler - assembles multi-repository desktop application bundles
//!
//! The build takes a set of independently versioned source repositories, a
//! directory of prebuilt third-party binaries and some static assets, lays
//! them out as a platform-native application tree and packages the result:
//! a disk image on macOS, a zip archive on Windows, a bzip2 tarball on Linux.
//!
//! # Core Concepts
//!
//! - **Action**: a named, independently skippable unit of work
//!   ([`pipeline::Action`]). `--skip` and `--do` select actions by name.
//! - **Orchestrator**: runs the fixed action sequence strictly in order and
//!   stops at the first failure ([`pipeline::Orchestrator`]).
//! - **Platform strategy**: decides the platform-only tail of the sequence and
//!   the single terminal packager ([`pipeline::PlatformStrategy`]).
//! - **Version**: either the explicit release version from the versions file,
//!   or a nightly label derived from the date and every repository's state
//!   ([`pipeline::version`]).
//! - **Profile**: the product-specific data (repositories, copy rules, assets)
//!   the actions interpret ([`profile::BundleProfile`]).
//!
//! # Example Usage
//!
//! ```no_run
//! use appbundler::{BuildContext, BundleProfile, CliArgs, Orchestrator, Platform, ToolConfig, Toolbox};
//! use clap::Parser;
//!
//! # fn main() -> anyhow::Result<()> {
//! let args = CliArgs::parse();
//! let build = BuildContext::from_args(&args)?;
//! let profile = BundleProfile::builtin()?;
//!
//! let orchestrator = Orchestrator::new(Platform::current(), Toolbox::system(ToolConfig::default()));
//! let outcome = orchestrator.execute(build, profile)?;
//! if let Some(artifact) = outcome.artifact {
//!     println!("{}", artifact.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod fs;
pub mod package;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod tools;
pub mod util;

pub use cli::CliArgs;
pub use config::{BuildContext, ConfigError, ToolConfig, UpdateChannel, VersionsManifest};
pub use package::{ArtifactPackager, PackageError, PackagerKind};
pub use pipeline::{
    Action, ActionKind, ActionOutcome, BuildOutcome, Orchestrator, PipelineError, Platform,
    PlatformStrategy, SelectionPolicy,
};
pub use profile::BundleProfile;
pub use tools::Toolbox;
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
