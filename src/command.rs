//! Command runner abstraction used by the `exec` provider.

use std::ffi::OsString;
use std::fmt::Debug;
use std::process::Command;

use crate::provider::ProviderError;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Returns stdout followed by stderr, trimmed.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        combined.push_str(self.stdout.trim_end());
        if !self.stdout.trim().is_empty() && !self.stderr.trim().is_empty() {
            combined.push('\n');
        }
        combined.push_str(self.stderr.trim_end());
        combined.trim().to_owned()
    }
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner: Send + Sync + Debug {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// The child inherits the current process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProviderError>;
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProviderError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| ProviderError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
