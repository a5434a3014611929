//! Open registry mapping provider names to constructors.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::environment::EnvSource;
use crate::provider::{Provider, ProviderError, ProviderFactory};
use crate::providers::{exec, httpreq};

/// Builds a provider from the configuration visible in an environment.
pub type ProviderConstructor =
    Arc<dyn Fn(&dyn EnvSource) -> Result<Box<dyn Provider>, ProviderError> + Send + Sync>;

/// Name-keyed collection of provider constructors.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: BTreeMap<String, ProviderConstructor>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `exec` and `httpreq`
    /// providers.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(exec::NAME, |env| {
            Ok(Box::new(exec::ExecProvider::from_env(env)?) as Box<dyn Provider>)
        });
        registry.register(httpreq::NAME, |env| {
            Ok(Box::new(httpreq::HttpReqProvider::from_env(env)?) as Box<dyn Provider>)
        });
        registry
    }

    /// Registers `constructor` under `name`, returning the constructor it
    /// replaces.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        constructor: F,
    ) -> Option<ProviderConstructor>
    where
        F: Fn(&dyn EnvSource) -> Result<Box<dyn Provider>, ProviderError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor))
    }

    /// Returns `true` when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Iterates over registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl ProviderFactory for ProviderRegistry {
    fn create(&self, name: &str, env: &dyn EnvSource) -> Result<Box<dyn Provider>, ProviderError> {
        let constructor =
            self.constructors
                .get(name)
                .ok_or_else(|| ProviderError::UnknownProvider {
                    name: name.to_owned(),
                })?;
        let provider = constructor(env)?;
        debug!(provider = name, "resolved DNS provider");
        Ok(provider)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
