use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use super::runner::{CommandRunner, ToolCommand};

/// Signs a bundle component with a codesigning identity
pub trait Codesigner: Send + Sync {
    /// Returns the signer's report, if any
    fn sign(&self, identity: &str, path: &Path, force: bool) -> Result<String>;
}

/// macOS `codesign`, always signing nested code (`--deep`)
pub struct CodesignTool {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl CodesignTool {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

impl Codesigner for CodesignTool {
    fn sign(&self, identity: &str, path: &Path, force: bool) -> Result<String> {
        let mut cmd = ToolCommand::new(&self.program).args(["-s", identity]);
        if force {
            cmd = cmd.args(["--force", "--deep", "--verbose"]);
        } else {
            cmd = cmd.arg("--deep");
        }
        self.runner.run(&cmd.path_arg(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::RecordingRunner;

    #[test]
    fn test_sign_arguments() {
        let runner = Arc::new(RecordingRunner::new());
        let signer = CodesignTool::new(runner.clone(), "codesign");
        signer.sign("Dev ID", Path::new("/b/tun.kext"), false).unwrap();
        signer.sign("Dev ID", Path::new("/b/App.app"), true).unwrap();

        let commands = runner.commands();
        assert_eq!(commands[0].args, vec!["-s", "Dev ID", "--deep", "/b/tun.kext"]);
        assert_eq!(
            commands[1].args,
            vec!["-s", "Dev ID", "--force", "--deep", "--verbose", "/b/App.app"]
        );
    }
}
