//! Scoped invocation of version control executables.
//!
//! Every call spawns the executable, waits for it, and collects its output.
//! Nothing is kept alive between calls.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use docsweep_core::{DocsweepError, VcsKind};
use tracing::debug;

/// A version control executable together with the environment it runs in.
#[derive(Debug, Clone)]
pub(crate) struct Executable {
    vcs: VcsKind,
    path: PathBuf,
    envs: &'static [(&'static str, &'static str)],
}

/// Captured result of one finished command.
#[derive(Debug)]
pub(crate) struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Executable {
    pub(crate) fn new(
        vcs: VcsKind,
        path: impl Into<PathBuf>,
        envs: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            vcs,
            path: path.into(),
            envs,
        }
    }

    /// Run the executable with `args` and wait for it to exit.
    ///
    /// A non-zero exit status is not an error here; backends decide which
    /// statuses mean "not found" and which are unexpected.
    pub(crate) fn run<I, S>(&self, args: I) -> Result<CommandOutput, DocsweepError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.path);
        command
            .args(args)
            .envs(self.envs.iter().copied())
            .stdin(Stdio::null());
        debug!(vcs = %self.vcs, command = ?command, "running version control command");

        let output = command.output().map_err(|e| DocsweepError::VcsExecutable {
            vcs: self.vcs,
            executable: self.path.clone(),
            reason: format!("failed to run: {e}"),
        })?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(vcs = %self.vcs, status = ?result.status, "command finished");
        Ok(result)
    }

    /// Wrap an exit that no backend rule accounts for.
    pub(crate) fn unexpected(&self, output: &CommandOutput) -> DocsweepError {
        let status = output
            .status
            .map_or_else(|| "a signal".to_string(), |code| format!("status {code}"));
        DocsweepError::VcsExecutable {
            vcs: self.vcs,
            executable: self.path.clone(),
            reason: format!("exited with {status}: {}", output.stderr.trim()),
        }
    }

    /// Reject output that could not have come from a working backend.
    pub(crate) fn malformed(&self, what: &str) -> DocsweepError {
        DocsweepError::VcsExecutable {
            vcs: self.vcs,
            executable: self.path.clone(),
            reason: format!("unexpected output: {what}"),
        }
    }
}

impl CommandOutput {
    pub(crate) fn success(&self) -> bool {
        self.status == Some(0)
    }
}
