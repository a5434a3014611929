//! DNS-01 provider capability and error taxonomy.

use std::fmt::Debug;

use thiserror::Error;

use crate::environment::{EnvError, EnvSource};
use crate::options::ChallengeOption;

/// Errors raised while building or invoking DNS providers.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProviderError {
    /// Raised when no provider is registered under the requested name.
    #[error("unknown DNS provider '{name}'")]
    UnknownProvider {
        /// Name passed by the caller.
        name: String,
    },
    /// Raised when required configuration variables are absent.
    #[error("{provider}: missing required configuration: {}", .variables.join(", "))]
    MissingCredentials {
        /// Provider that rejected its configuration.
        provider: String,
        /// Environment variables that must be set.
        variables: Vec<String>,
    },
    /// Raised when configuration is present but unusable.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// Raised when challenge options cannot be applied to a provider.
    #[error("challenge options rejected: {0}")]
    OptionWrapping(String),
    /// Raised by a provider when presenting or cleaning up a record fails.
    #[error("{provider}: {message}")]
    Operation {
        /// Provider reporting the failure.
        provider: String,
        /// Description of the failure.
        message: String,
    },
    /// Raised when a helper program cannot be started.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// OS error message.
        message: String,
    },
    /// Raised when a helper program exits unsuccessfully.
    #[error("{program} exited with status {status_text}: {output}")]
    CommandFailure {
        /// Program that failed.
        program: String,
        /// Exit status reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Output captured from the program.
        output: String,
    },
    /// Raised when an HTTP request to a DNS API fails.
    #[error("HTTP request failed: {0}")]
    Http(String),
    /// Raised when the environment scope cannot be entered.
    #[error(transparent)]
    Environment(#[from] EnvError),
    /// Raised when the environment cannot be restored after an operation.
    ///
    /// Any error the operation itself produced is kept in `pending` rather
    /// than being replaced.
    #[error("failed to restore environment: {source}")]
    Restore {
        /// Restoration failure.
        source: EnvError,
        /// Error returned by the wrapped operation, if it failed as well.
        pending: Option<Box<ProviderError>>,
    },
}

/// Capability implemented by DNS providers.
///
/// Calls block until the record change has been submitted.
pub trait Provider: Send + Sync + Debug {
    /// Returns the provider name (for example `exec`).
    fn name(&self) -> &str;

    /// Creates the TXT record answering the challenge for `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the record cannot be created.
    fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError>;

    /// Removes the TXT record created by [`Provider::present`].
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the record cannot be removed.
    fn cleanup(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError>;

    /// Returns the challenge options the DNS-01 solver should honour.
    fn challenge_options(&self) -> &[ChallengeOption] {
        &[]
    }
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        (**self).present(domain, token, key_auth)
    }

    fn cleanup(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        (**self).cleanup(domain, token, key_auth)
    }

    fn challenge_options(&self) -> &[ChallengeOption] {
        (**self).challenge_options()
    }
}

/// Creates providers by name.
pub trait ProviderFactory: Send + Sync {
    /// Instantiates the provider registered as `name`, reading its
    /// configuration from `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownProvider`] for unregistered names, or
    /// whatever the provider constructor reports.
    fn create(&self, name: &str, env: &dyn EnvSource) -> Result<Box<dyn Provider>, ProviderError>;
}
