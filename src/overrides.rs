//! Environment override sets attached to a provider.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Immutable mapping from environment variable name to the value a provider
/// should observe.
///
/// Cloning is cheap; clones share the same map. `Debug` output lists the
/// keys only because values are usually credentials.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct EnvOverrides {
    vars: Arc<BTreeMap<String, String>>,
}

impl EnvOverrides {
    /// Creates an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the override for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns `true` when `key` is overridden.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Returns `true` when no variables are overridden.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Returns the number of overridden variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Iterates over the overridden names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for EnvOverrides
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let vars = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            vars: Arc::new(vars),
        }
    }
}

impl fmt::Debug for EnvOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.vars.keys()).finish()
    }
}
