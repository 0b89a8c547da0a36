//! External collaborators the pipeline drives
//!
//! Each collaborator is a trait with one production implementation that
//! shells out through a [`CommandRunner`]. Actions only see the traits.

pub mod collector;
pub mod disk_image;
pub mod download;
pub mod git;
pub mod runner;
pub mod signing;

use std::sync::Arc;

pub use collector::{CollectRequest, DependencyCollector, ExternalCollector};
pub use disk_image::{DiskImageTool, Hdiutil};
pub use download::{Downloader, HttpDownloader};
pub use git::{GitClient, SourceControl};
pub use runner::{CommandRunner, RecordingRunner, SystemRunner, ToolCommand};
pub use signing::{CodesignTool, Codesigner};

use crate::config::ToolConfig;

/// The set of collaborators shared by all actions in a run
#[derive(Clone)]
pub struct Toolbox {
    pub runner: Arc<dyn CommandRunner>,
    pub programs: ToolConfig,
    pub git: Arc<dyn SourceControl>,
    pub collector: Arc<dyn DependencyCollector>,
    pub signer: Arc<dyn Codesigner>,
    pub disk_image: Arc<dyn DiskImageTool>,
    pub downloader: Arc<dyn Downloader>,
}

impl Toolbox {
    /// Real tools, run as child processes
    pub fn system(programs: ToolConfig) -> Self {
        Self::with_runner(Arc::new(SystemRunner), programs)
    }

    /// Every command-line collaborator routed through `runner`
    pub fn with_runner(runner: Arc<dyn CommandRunner>, programs: ToolConfig) -> Self {
        Self {
            git: Arc::new(GitClient::new(runner.clone(), &programs.git)),
            collector: Arc::new(ExternalCollector::new(
                runner.clone(),
                &programs.depcollector,
            )),
            signer: Arc::new(CodesignTool::new(runner.clone(), &programs.codesign)),
            disk_image: Arc::new(Hdiutil::new(
                runner.clone(),
                &programs.hdiutil,
                &programs.setfile,
            )),
            downloader: Arc::new(HttpDownloader),
            runner,
            programs,
        }
    }

    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }
}
