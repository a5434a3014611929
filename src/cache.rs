//! Process-wide cache of DNS answers used by DNS-01 propagation checks.
//!
//! The solver caches the authoritative zone found for each challenge FQDN.
//! A failed provider call may leave that cache describing a zone layout
//! that no longer holds, so the provider wrapper clears it on failure.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::challenge::to_fqdn;

/// Invalidation hook for a DNS answer cache.
pub trait AnswerCache: Send + Sync {
    /// Drops every cached answer. Safe to call concurrently and repeatedly.
    fn clear_all(&self);
}

/// Authoritative zone information resolved for an FQDN.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ZoneAnswer {
    /// Zone apex, for example `example.com.`.
    pub zone: String,
    /// Authoritative nameservers for the zone.
    pub nameservers: Vec<String>,
}

/// Thread-safe map from FQDN to [`ZoneAnswer`].
///
/// Names are stored lower-cased with a trailing dot.
#[derive(Debug, Default)]
pub struct FqdnCache {
    entries: RwLock<HashMap<String, ZoneAnswer>>,
}

impl FqdnCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached answer for `fqdn`.
    ///
    /// Lookups and inserts are the DNS-01 solver's side of the cache. This
    /// crate only clears it.
    #[must_use]
    pub fn get(&self, fqdn: &str) -> Option<ZoneAnswer> {
        self.entries.read().get(&cache_key(fqdn)).cloned()
    }

    /// Caches `answer` for `fqdn`, returning any answer it replaces.
    ///
    /// Called by the DNS-01 solver once it has found the zone for `fqdn`.
    pub fn insert(&self, fqdn: &str, answer: ZoneAnswer) -> Option<ZoneAnswer> {
        self.entries.write().insert(cache_key(fqdn), answer)
    }

    /// Returns the number of cached answers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl AnswerCache for FqdnCache {
    fn clear_all(&self) {
        let mut entries = self.entries.write();
        let dropped = entries.len();
        entries.clear();
        debug!(dropped, "cleared FQDN answer cache");
    }
}

fn cache_key(fqdn: &str) -> String {
    to_fqdn(&fqdn.to_ascii_lowercase())
}

static GLOBAL_CACHE: LazyLock<Arc<FqdnCache>> = LazyLock::new(|| Arc::new(FqdnCache::new()));

/// Returns the process-wide FQDN cache.
#[must_use]
pub fn global() -> Arc<FqdnCache> {
    Arc::clone(&GLOBAL_CACHE)
}
