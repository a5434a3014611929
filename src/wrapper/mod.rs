//! Providers pinned to their own environment overrides.
//!
//! A [`ProviderWrapper`] remembers the [`EnvOverrides`] it was built with
//! and re-applies them around every call, so the wrapped provider always
//! sees its own configuration no matter what other wrappers in the process
//! are doing. All wrappers sharing an [`EnvLock`] are serialised while their
//! overrides are applied.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{self, AnswerCache};
use crate::environment::{EnvGuard, EnvLock, EnvSource};
use crate::options::{ChallengeOption, ChallengeOptionsDecorator, OptionDecorator, challenge_options};
use crate::overrides::EnvOverrides;
use crate::provider::{Provider, ProviderError, ProviderFactory};
use crate::registry::ProviderRegistry;

/// A provider whose calls always run under its own environment overrides.
pub struct ProviderWrapper {
    delegate: Box<dyn Provider>,
    overrides: EnvOverrides,
    lock: Arc<EnvLock>,
    lock_timeout: Option<Duration>,
    cache: Arc<dyn AnswerCache>,
}

impl ProviderWrapper {
    /// Builds the built-in provider `name` against the real environment.
    ///
    /// `overrides` are applied while the provider is constructed and again
    /// around each call.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider is unknown, rejects its
    /// configuration, or the challenge options cannot be applied.
    pub fn build(name: &str, overrides: EnvOverrides) -> Result<Self, ProviderError> {
        Self::builder().build(name, overrides)
    }

    /// Starts a builder for injecting the lock, factory, decorator or cache.
    #[must_use]
    pub fn builder() -> ProviderWrapperBuilder {
        ProviderWrapperBuilder::default()
    }

    /// Returns the overrides applied around each call.
    #[must_use]
    pub const fn overrides(&self) -> &EnvOverrides {
        &self.overrides
    }

    fn run(
        &self,
        operation: &'static str,
        domain: &str,
        call: impl FnOnce(&dyn Provider) -> Result<(), ProviderError>,
    ) -> Result<(), ProviderError> {
        let guard = enter_scope(&self.lock, &self.overrides, self.lock_timeout)?;
        let outcome = call(self.delegate.as_ref());
        if let Err(err) = &outcome {
            warn!(
                provider = self.delegate.name(),
                operation,
                domain,
                error = %err,
                "DNS-01 provider call failed, clearing FQDN cache"
            );
            self.cache.clear_all();
        }
        finish_scope(guard, outcome)
    }
}

impl Provider for ProviderWrapper {
    fn name(&self) -> &str {
        self.delegate.name()
    }

    fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        self.run("present", domain, |provider| {
            provider.present(domain, token, key_auth)
        })
    }

    fn cleanup(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        self.run("cleanup", domain, |provider| {
            provider.cleanup(domain, token, key_auth)
        })
    }

    fn challenge_options(&self) -> &[ChallengeOption] {
        self.delegate.challenge_options()
    }
}

impl fmt::Debug for ProviderWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderWrapper")
            .field("delegate", &self.delegate)
            .field("overrides", &self.overrides)
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ProviderWrapper`] with injectable collaborators.
///
/// Unset collaborators default to the process environment lock, the
/// built-in provider registry, [`ChallengeOptionsDecorator`] and the global
/// FQDN cache.
#[derive(Clone, Default)]
pub struct ProviderWrapperBuilder {
    lock: Option<Arc<EnvLock>>,
    factory: Option<Arc<dyn ProviderFactory>>,
    decorator: Option<Arc<dyn OptionDecorator>>,
    cache: Option<Arc<dyn AnswerCache>>,
    lock_timeout: Option<Duration>,
}

impl ProviderWrapperBuilder {
    /// Uses `lock` instead of the process environment lock.
    #[must_use]
    pub fn env_lock(mut self, lock: Arc<EnvLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Resolves provider names through `factory`.
    #[must_use]
    pub fn factory(mut self, factory: Arc<dyn ProviderFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Applies challenge options through `decorator`.
    #[must_use]
    pub fn decorator(mut self, decorator: Arc<dyn OptionDecorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    /// Clears `cache` when a delegated call fails.
    #[must_use]
    pub fn answer_cache(mut self, cache: Arc<dyn AnswerCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Bounds the wait for the environment lock; `None` waits indefinitely.
    #[must_use]
    pub fn lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Builds provider `name` with `overrides` applied.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the scope cannot be entered, the
    /// factory rejects the name or configuration, the decorator rejects the
    /// challenge options, or the environment cannot be restored.
    pub fn build(self, name: &str, overrides: EnvOverrides) -> Result<ProviderWrapper, ProviderError> {
        let lock = self.lock.unwrap_or_else(EnvLock::process);
        let factory: Arc<dyn ProviderFactory> = match self.factory {
            Some(factory) => factory,
            None => Arc::new(ProviderRegistry::with_builtins()),
        };
        let decorator: Arc<dyn OptionDecorator> = match self.decorator {
            Some(decorator) => decorator,
            None => Arc::new(ChallengeOptionsDecorator),
        };
        let answer_cache: Arc<dyn AnswerCache> = match self.cache {
            Some(answer_cache) => answer_cache,
            None => cache::global(),
        };

        let guard = enter_scope(&lock, &overrides, self.lock_timeout)?;
        let resolved = resolve(
            factory.as_ref(),
            decorator.as_ref(),
            &*lock,
            name,
            &overrides,
        );
        let delegate = finish_scope(guard, resolved)?;
        debug!(provider = name, overrides = ?overrides, "built scoped DNS provider");

        Ok(ProviderWrapper {
            delegate,
            overrides,
            lock,
            lock_timeout: self.lock_timeout,
            cache: answer_cache,
        })
    }
}

impl fmt::Debug for ProviderWrapperBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderWrapperBuilder")
            .field("lock", &self.lock)
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

fn resolve(
    factory: &dyn ProviderFactory,
    decorator: &dyn OptionDecorator,
    env: &dyn EnvSource,
    name: &str,
    overrides: &EnvOverrides,
) -> Result<Box<dyn Provider>, ProviderError> {
    let base = factory.create(name, env)?;
    let options = challenge_options(overrides);
    if options.is_empty() {
        return Ok(base);
    }
    decorator.wrap(base, options)
}

fn enter_scope<'a>(
    lock: &'a EnvLock,
    overrides: &EnvOverrides,
    timeout: Option<Duration>,
) -> Result<EnvGuard<'a>, ProviderError> {
    let guard = match timeout {
        Some(limit) => lock.enter_timeout(overrides, limit),
        None => lock.enter(overrides),
    }?;
    Ok(guard)
}

/// Restores the environment and merges the outcome without hiding either
/// failure.
fn finish_scope<T>(
    guard: EnvGuard<'_>,
    outcome: Result<T, ProviderError>,
) -> Result<T, ProviderError> {
    match guard.exit() {
        Ok(()) => outcome,
        Err(source) => Err(ProviderError::Restore {
            source,
            pending: outcome.err().map(Box::new),
        }),
    }
}
