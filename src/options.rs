//! DNS-01 challenge options derived from provider overrides.
//!
//! Two override keys tune the DNS-01 solver instead of the provider itself:
//! [`DISABLE_CP_ENV`] skips the wait for every authoritative nameserver, and
//! [`DNS_RESOLVERS_ENV`] replaces the recursive nameservers used for
//! propagation checks. All other keys are left for the provider.

use std::collections::BTreeSet;

use tracing::debug;

use crate::overrides::EnvOverrides;
use crate::provider::{Provider, ProviderError};

/// Override key disabling the complete-propagation requirement.
pub const DISABLE_CP_ENV: &str = "LEGO_DISABLE_CP";

/// Override key holding comma-separated recursive nameservers.
pub const DNS_RESOLVERS_ENV: &str = "LEGO_DNS_RESOLVERS";

/// A tuning knob for the DNS-01 solver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChallengeOption {
    /// Accept the record once any authoritative nameserver serves it.
    DisableCompletePropagation,
    /// Use these recursive nameservers, in order, for propagation checks.
    RecursiveNameservers(Vec<String>),
}

impl ChallengeOption {
    /// Stable name of the option kind, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DisableCompletePropagation => "disable-complete-propagation",
            Self::RecursiveNameservers(_) => "recursive-nameservers",
        }
    }
}

/// Translates the recognised keys of `overrides` into challenge options.
///
/// `LEGO_DISABLE_CP` counts when its value is `true` in any case or exactly
/// `1`. `LEGO_DNS_RESOLVERS` is split on commas without trimming or dropping
/// empty entries.
#[must_use]
pub fn challenge_options(overrides: &EnvOverrides) -> Vec<ChallengeOption> {
    let mut options = Vec::new();

    if overrides
        .get(DISABLE_CP_ENV)
        .is_some_and(disables_complete_propagation)
    {
        options.push(ChallengeOption::DisableCompletePropagation);
    }

    if let Some(nameservers) = overrides.get(DNS_RESOLVERS_ENV) {
        let resolvers = nameservers.split(',').map(str::to_owned).collect();
        options.push(ChallengeOption::RecursiveNameservers(resolvers));
    }

    options
}

fn disables_complete_propagation(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Layers challenge options on top of a base provider.
pub trait OptionDecorator: Send + Sync {
    /// Returns a provider that carries `options` and delegates to `base`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::OptionWrapping`] when the options cannot be
    /// combined.
    fn wrap(
        &self,
        base: Box<dyn Provider>,
        options: Vec<ChallengeOption>,
    ) -> Result<Box<dyn Provider>, ProviderError>;
}

/// Default decorator producing a [`Dns01Provider`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ChallengeOptionsDecorator;

impl OptionDecorator for ChallengeOptionsDecorator {
    fn wrap(
        &self,
        base: Box<dyn Provider>,
        options: Vec<ChallengeOption>,
    ) -> Result<Box<dyn Provider>, ProviderError> {
        Ok(Box::new(Dns01Provider::new(base, options)?))
    }
}

/// Provider decorated with DNS-01 solver options.
#[derive(Debug)]
pub struct Dns01Provider {
    inner: Box<dyn Provider>,
    options: Vec<ChallengeOption>,
}

impl Dns01Provider {
    /// Decorates `inner` with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::OptionWrapping`] when `options` is empty or
    /// names the same kind twice.
    pub fn new(
        inner: Box<dyn Provider>,
        options: Vec<ChallengeOption>,
    ) -> Result<Self, ProviderError> {
        if options.is_empty() {
            return Err(ProviderError::OptionWrapping(String::from(
                "no challenge options supplied",
            )));
        }
        let mut seen = BTreeSet::new();
        if let Some(duplicate) = options.iter().find(|option| !seen.insert(option.kind())) {
            return Err(ProviderError::OptionWrapping(format!(
                "{} given more than once",
                duplicate.kind()
            )));
        }
        debug!(
            provider = inner.name(),
            options = ?options.iter().map(ChallengeOption::kind).collect::<Vec<_>>(),
            "applied DNS-01 challenge options"
        );
        Ok(Self { inner, options })
    }

    /// Returns `false` when the solver may skip waiting for every
    /// authoritative nameserver.
    ///
    /// This crate never waits for propagation itself. The DNS-01 solver that
    /// drives the wrapper reads this flag before its propagation check.
    #[must_use]
    pub fn requires_complete_propagation(&self) -> bool {
        !self
            .options
            .contains(&ChallengeOption::DisableCompletePropagation)
    }

    /// Returns the configured recursive nameservers, if any.
    ///
    /// Consumed by the DNS-01 solver, which queries these servers instead of
    /// the system resolver while checking propagation.
    #[must_use]
    pub fn recursive_nameservers(&self) -> Option<&[String]> {
        self.options.iter().find_map(|option| match option {
            ChallengeOption::RecursiveNameservers(servers) => Some(servers.as_slice()),
            ChallengeOption::DisableCompletePropagation => None,
        })
    }
}

impl Provider for Dns01Provider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        self.inner.present(domain, token, key_auth)
    }

    fn cleanup(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        self.inner.cleanup(domain, token, key_auth)
    }

    fn challenge_options(&self) -> &[ChallengeOption] {
        &self.options
    }
}
