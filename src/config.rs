//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Defaults for the command-line front end, merged from configuration files
/// and `DNSSCOPE_*` environment variables.
///
/// Provider credentials are not read from here; they travel in the override
/// set of each invocation.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "DNSSCOPE")]
pub struct DnsScopeConfig {
    /// Provider used when `--provider` is not given.
    pub provider: Option<String>,
    /// Upper bound, in seconds, on waiting for the environment lock. Unset
    /// waits indefinitely.
    pub lock_timeout_secs: Option<u64>,
}

impl DnsScopeConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge configuration files and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("dnsscope")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Returns the configured bound on waiting for the environment lock.
    #[must_use]
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_secs.map(Duration::from_secs)
    }

    /// Checks that configured values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the default provider is blank or
    /// the lock timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .provider
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ConfigError::Invalid(String::from(
                "provider must not be blank: set DNSSCOPE_PROVIDER or pass --provider",
            )));
        }
        if self.lock_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(String::from(
                "lock_timeout_secs must be at least 1: unset DNSSCOPE_LOCK_TIMEOUT_SECS to wait indefinitely",
            )));
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a configured value cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
