use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use super::runner::{CommandRunner, ToolCommand};

/// Inputs for one dependency collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectRequest {
    /// Program entry point whose import closure is collected
    pub entry_point: PathBuf,
    /// Directory the closure is copied into
    pub destination: PathBuf,
    /// Opaque paths manifest supplied on the command line
    pub paths_file: PathBuf,
    /// Source roots of the component repositories, in processing order
    pub search_paths: Vec<PathBuf>,
}

/// Computes and copies an entry point's dependency closure
pub trait DependencyCollector: Send + Sync {
    fn collect(&self, request: &CollectRequest) -> Result<()>;
}

/// Delegates collection to an external program
///
/// Invoked as `<program> --entry <file> --dest <dir> --paths-file <file>
/// [--search-path <dir>]...`.
pub struct ExternalCollector {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl ExternalCollector {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

impl DependencyCollector for ExternalCollector {
    fn collect(&self, request: &CollectRequest) -> Result<()> {
        let mut cmd = ToolCommand::new(&self.program)
            .arg("--entry")
            .path_arg(&request.entry_point)
            .arg("--dest")
            .path_arg(&request.destination)
            .arg("--paths-file")
            .path_arg(&request.paths_file);
        for path in &request.search_paths {
            cmd = cmd.arg("--search-path").path_arg(path);
        }
        self.runner.run(&cmd)?;
        Ok(())
    }
}
