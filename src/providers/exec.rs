//! Provider that hands record changes to an external program.
//!
//! The program named by `EXEC_PATH` is invoked as
//! `<program> present|cleanup <fqdn> <value>`. With `EXEC_MODE=RAW` it
//! receives the raw ACME arguments instead:
//! `<program> present|cleanup -- <domain> <token> <key_auth>`. The program
//! inherits the process environment, including any active overrides.

use std::ffi::OsString;

use camino::Utf8PathBuf;
use tracing::debug;

use super::{RAW_MODE, non_blank};
use crate::challenge::ChallengeInfo;
use crate::command::{CommandRunner, ProcessCommandRunner};
use crate::environment::EnvSource;
use crate::provider::{Provider, ProviderError};

/// Registry name of the provider.
pub const NAME: &str = "exec";
/// Path of the program to run.
pub const EXEC_PATH_ENV: &str = "EXEC_PATH";
/// Set to `RAW` to pass raw ACME arguments.
pub const EXEC_MODE_ENV: &str = "EXEC_MODE";

/// Argument style passed to the program.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecMode {
    /// `<fqdn> <value>`.
    Default,
    /// `-- <domain> <token> <key_auth>`.
    Raw,
}

/// Runs an external program to present and clean up records.
#[derive(Clone, Debug)]
pub struct ExecProvider<R = ProcessCommandRunner> {
    program: Utf8PathBuf,
    mode: ExecMode,
    runner: R,
}

impl ExecProvider {
    /// Reads `EXEC_PATH` and `EXEC_MODE` from `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredentials`] when `EXEC_PATH` is unset
    /// or blank.
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ProviderError> {
        Self::from_env_with_runner(env, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> ExecProvider<R> {
    /// Reads configuration from `env` and runs the program through `runner`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredentials`] when `EXEC_PATH` is unset
    /// or blank.
    pub fn from_env_with_runner(env: &dyn EnvSource, runner: R) -> Result<Self, ProviderError> {
        let program =
            non_blank(env, EXEC_PATH_ENV).ok_or_else(|| ProviderError::MissingCredentials {
                provider: NAME.to_owned(),
                variables: vec![EXEC_PATH_ENV.to_owned()],
            })?;
        let mode = if env.var(EXEC_MODE_ENV).as_deref() == Some(RAW_MODE) {
            ExecMode::Raw
        } else {
            ExecMode::Default
        };
        Ok(Self {
            program: Utf8PathBuf::from(program),
            mode,
            runner,
        })
    }

    /// Returns the configured program path.
    #[must_use]
    pub const fn program(&self) -> &Utf8PathBuf {
        &self.program
    }

    /// Returns the configured argument style.
    #[must_use]
    pub const fn mode(&self) -> ExecMode {
        self.mode
    }

    fn build_args(&self, action: &str, domain: &str, token: &str, key_auth: &str) -> Vec<OsString> {
        let mut args = vec![OsString::from(action)];
        match self.mode {
            ExecMode::Raw => {
                args.push(OsString::from("--"));
                args.push(OsString::from(domain));
                args.push(OsString::from(token));
                args.push(OsString::from(key_auth));
            }
            ExecMode::Default => {
                let info = ChallengeInfo::new(domain, key_auth);
                args.push(OsString::from(info.fqdn));
                args.push(OsString::from(info.value));
            }
        }
        args
    }

    fn execute(
        &self,
        action: &str,
        domain: &str,
        token: &str,
        key_auth: &str,
    ) -> Result<(), ProviderError> {
        let args = self.build_args(action, domain, token, key_auth);
        let output = self.runner.run(self.program.as_str(), &args)?;
        let combined = output.combined();
        if !combined.is_empty() {
            debug!(program = %self.program, action, output = %combined, "exec provider output");
        }
        if output.is_success() {
            return Ok(());
        }

        let status_text = output
            .code
            .map_or_else(|| String::from("unknown"), |code| code.to_string());
        Err(ProviderError::CommandFailure {
            program: self.program.to_string(),
            status: output.code,
            status_text,
            output: combined,
        })
    }
}

impl<R: CommandRunner> Provider for ExecProvider<R> {
    fn name(&self) -> &str {
        NAME
    }

    fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        self.execute("present", domain, token, key_auth)
    }

    fn cleanup(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        self.execute("cleanup", domain, token, key_auth)
    }
}
