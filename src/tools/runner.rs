//! Running external programs
//!
//! Every external tool the pipeline touches (git, hdiutil, codesign, mt.exe,
//! strip, ...) is invoked through a [`CommandRunner`], so a test can record
//! invocations or script failures without the tool being installed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// A single external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Directory the program runs in; the caller's directory is never changed
    pub cwd: Option<PathBuf>,
    /// Variables added to the child's environment only
    pub env: BTreeMap<String, String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Executes tool commands, returning stdout
///
/// A non-zero exit status is an error.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &ToolCommand) -> Result<String>;
}

/// Runs commands as child processes and waits for them
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<String> {
        debug!(command = %command, cwd = ?command.cwd, "Running external tool");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).envs(&command.env);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to start '{}'", command.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "'{}' exited with {}: {}",
                command,
                output.status,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Records commands instead of running them
///
/// Responses and failures are keyed by a prefix of the rendered command line,
/// e.g. `"git describe"` or `"hdiutil"`.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<ToolCommand>>,
    responses: Mutex<Vec<(String, String)>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `stdout` for commands starting with `prefix`
    pub fn respond(&self, prefix: &str, stdout: &str) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push((prefix.to_string(), stdout.to_string()));
        }
    }

    /// Fail commands starting with `prefix`
    pub fn fail_on(&self, prefix: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(prefix.to_string());
        }
    }

    pub fn commands(&self) -> Vec<ToolCommand> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Rendered command lines, in invocation order
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &ToolCommand) -> Result<String> {
        let line = command.to_string();
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }

        let failing = self
            .failures
            .lock()
            .map(|f| f.iter().any(|prefix| line.starts_with(prefix.as_str())))
            .unwrap_or(false);
        if failing {
            bail!("'{}' exited with exit status: 1", line);
        }

        let response = self.responses.lock().ok().and_then(|responses| {
            responses
                .iter()
                .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                .map(|(_, out)| out.clone())
        });
        Ok(response.unwrap_or_default())
    }
}
