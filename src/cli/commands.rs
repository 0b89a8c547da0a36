use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::UpdateChannel;

/// Assemble a desktop application bundle from component repositories and prebuilt binaries
#[derive(Parser, Debug, Clone)]
#[command(
    name = "appbundler",
    about = "Assemble a platform-native desktop application bundle",
    version,
    author,
    long_about = "appbundler clones the component repositories named by the bundle profile, \
                  checks them out at the refs pinned in the versions file, lays out the \
                  bundle tree with prebuilt binaries and assets, and packages it as a disk \
                  image (macOS), zip archive (Windows) or bzip2 tarball (Linux).\n\n\
                  Examples:\n  \
                  appbundler --paths-file paths.txt --versions-file versions.json --binaries bin/\n  \
                  appbundler --workon build/ --skip gitclone gitcheckout ...\n  \
                  appbundler --workon build/ --do tarball ...\n  \
                  appbundler --list-actions"
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "DIR",
        help = "Working directory (defaults to a fresh temporary directory)"
    )]
    pub workon: Option<PathBuf>,

    #[arg(
        long,
        num_args = 0..,
        value_name = "ACTION",
        help = "Actions to skip (takes precedence over --do)"
    )]
    pub skip: Vec<String>,

    #[arg(
        long = "do",
        num_args = 0..,
        value_name = "ACTION",
        help = "Only run these actions"
    )]
    pub only: Vec<String>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Paths file handed to the dependency collector (required)"
    )]
    pub paths_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "JSON file mapping repository names to refs, plus an optional \"version\" (required)"
    )]
    pub versions_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory holding the prebuilt third-party binaries (required)"
    )]
    pub binaries: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Configuration directory to seed into the bundle"
    )]
    pub seeded_config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "IDENTITY",
        default_value = "",
        help = "Codesigning identity (macOS only, empty disables signing)"
    )]
    pub codesign: String,

    #[arg(long, value_name = "FILE", help = "Bundle profile (TOML)")]
    pub profile: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        default_value = "none",
        help = "Update mirror the bundled launcher uses"
    )]
    pub update_channel: UpdateChannelArg,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory the final artifact is moved to"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(long, help = "Print the action plan for this host and exit")]
    pub list_actions: bool,

    #[arg(long, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, help = "Verbose output")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateChannelArg {
    Stable,
    Unstable,
    None,
}

impl From<UpdateChannelArg> for UpdateChannel {
    fn from(arg: UpdateChannelArg) -> Self {
        match arg {
            UpdateChannelArg::Stable => UpdateChannel::Stable,
            UpdateChannelArg::Unstable => UpdateChannel::Unstable,
            UpdateChannelArg::None => UpdateChannel::None,
        }
    }
}
