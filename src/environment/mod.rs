//! Scoped, mutually exclusive environment overrides.
//!
//! Environment variables are process-wide state, yet DNS providers read their
//! credentials from them. [`EnvLock`] pairs an [`EnvTable`] with a single
//! mutex so that at most one override set is applied at any instant:
//! [`EnvLock::enter`] applies an [`EnvOverrides`] set and returns an
//! [`EnvGuard`], and exiting (or dropping) the guard restores every touched
//! variable before the mutex is released.
//!
//! The lock is not re-entrant. Code running inside a scope must not enter
//! another non-empty scope on the same [`EnvLock`].

use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, error};

use crate::overrides::EnvOverrides;

/// Errors raised while applying or restoring environment overrides.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EnvError {
    /// Raised when a variable name cannot be stored in the environment.
    #[error("invalid environment variable name {key:?}")]
    InvalidKey {
        /// Offending variable name.
        key: String,
    },
    /// Raised when a value cannot be stored in the environment.
    #[error("invalid value for environment variable {key}")]
    InvalidValue {
        /// Variable whose value was rejected. The value itself is withheld.
        key: String,
    },
    /// Raised when a bounded wait for the environment lock expires.
    #[error("timed out after {waited:?} waiting for the environment lock")]
    LockTimeout {
        /// Time spent waiting before giving up.
        waited: Duration,
    },
    /// Raised by table implementations that can fail for other reasons.
    #[error("environment table rejected {key}: {message}")]
    Table {
        /// Variable being read or written.
        key: String,
        /// Description of the failure.
        message: String,
    },
}

/// Read access to an environment table.
///
/// Provider constructors receive this view so they read configuration
/// through the active scope without being able to mutate it.
pub trait EnvSource {
    /// Returns the raw value of `key`, or `None` when it is unset.
    fn get(&self, key: &str) -> Option<OsString>;

    /// Returns the value of `key` when it is set and valid UTF-8.
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|value| value.into_string().ok())
    }
}

/// Key/value store holding environment variables.
pub trait EnvTable: EnvSource + Send + Sync {
    /// Sets `key` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError`] when the key or value cannot be stored.
    fn set(&self, key: &str, value: &OsStr) -> Result<(), EnvError>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError`] when the key cannot be removed.
    fn unset(&self, key: &str) -> Result<(), EnvError>;
}

/// Checks that `key` and `value` can be stored in a process environment.
///
/// Empty names and names containing `=` or NUL are rejected, as are values
/// containing NUL. The platform calls panic on such input instead of
/// reporting an error.
///
/// # Errors
///
/// Returns [`EnvError::InvalidKey`] or [`EnvError::InvalidValue`].
pub fn validate_assignment(key: &str, value: Option<&OsStr>) -> Result<(), EnvError> {
    if key.is_empty() || key.contains(['=', '\0']) {
        return Err(EnvError::InvalidKey {
            key: key.to_owned(),
        });
    }
    if value.is_some_and(|raw| raw.as_encoded_bytes().contains(&0)) {
        return Err(EnvError::InvalidValue {
            key: key.to_owned(),
        });
    }
    Ok(())
}

/// The real process environment.
///
/// Only obtainable through [`EnvLock::process`], so every write goes through
/// the process-wide mutex.
#[derive(Debug)]
pub struct ProcessEnv(());

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        if validate_assignment(key, None).is_err() {
            return None;
        }
        env::var_os(key)
    }
}

impl EnvTable for ProcessEnv {
    fn set(&self, key: &str, value: &OsStr) -> Result<(), EnvError> {
        validate_assignment(key, Some(value))?;
        // SAFETY: Writers are serialised by the process `EnvLock`. Readers
        // outside it must not run concurrently; see `EnvLock::process`.
        unsafe { env::set_var(key, value) };
        Ok(())
    }

    fn unset(&self, key: &str) -> Result<(), EnvError> {
        validate_assignment(key, None)?;
        // SAFETY: As for `set`; see `EnvLock::process`.
        unsafe { env::remove_var(key) };
        Ok(())
    }
}

static PROCESS_LOCK: LazyLock<Arc<EnvLock>> =
    LazyLock::new(|| Arc::new(EnvLock::new(ProcessEnv(()))));

/// An environment table guarded by a single mutex.
pub struct EnvLock {
    table: Box<dyn EnvTable>,
    mutex: Mutex<()>,
}

impl EnvLock {
    /// Wraps `table` with a fresh mutex.
    ///
    /// Each `EnvLock` is an independent serialisation domain; use
    /// [`EnvLock::process`] for the real environment.
    #[must_use]
    pub fn new(table: impl EnvTable + 'static) -> Self {
        Self {
            table: Box::new(table),
            mutex: Mutex::new(()),
        }
    }

    /// Returns the process-wide lock over the real environment.
    ///
    /// The lock only serialises code that goes through it. Anything else
    /// that reads the environment on another thread while a scope is active
    /// is unsynchronised, including `std::env::var`, C `getenv` and libc
    /// routines that consult it, such as the system resolver. Callers must
    /// ensure no such reads race with `present` / `cleanup` calls on
    /// wrappers that carry overrides.
    #[must_use]
    pub fn process() -> Arc<Self> {
        Arc::clone(&PROCESS_LOCK)
    }

    /// Returns `true` while a non-empty scope is active.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }

    /// Applies `overrides`, blocking until no other scope is active.
    ///
    /// An empty override set returns an inactive guard without touching the
    /// mutex or the table.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError`] when a variable cannot be set. Variables applied
    /// before the failure are restored and the lock is released.
    pub fn enter(&self, overrides: &EnvOverrides) -> Result<EnvGuard<'_>, EnvError> {
        if overrides.is_empty() {
            return Ok(EnvGuard::inactive());
        }
        let lock = self.mutex.lock();
        self.apply(overrides, lock)
    }

    /// Like [`EnvLock::enter`] but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::LockTimeout`] when the lock is not acquired in
    /// time, or any error [`EnvLock::enter`] can return.
    pub fn enter_timeout(
        &self,
        overrides: &EnvOverrides,
        timeout: Duration,
    ) -> Result<EnvGuard<'_>, EnvError> {
        if overrides.is_empty() {
            return Ok(EnvGuard::inactive());
        }
        let started = Instant::now();
        let lock = self
            .mutex
            .try_lock_for(timeout)
            .ok_or_else(|| EnvError::LockTimeout {
                waited: started.elapsed(),
            })?;
        self.apply(overrides, lock)
    }

    fn apply<'a>(
        &'a self,
        overrides: &EnvOverrides,
        lock: MutexGuard<'a, ()>,
    ) -> Result<EnvGuard<'a>, EnvError> {
        let mut scope = ActiveScope {
            table: self.table.as_ref(),
            previous: Vec::with_capacity(overrides.len()),
            _lock: lock,
        };
        for (key, value) in overrides.iter() {
            let old = scope.table.get(key);
            // On failure `scope` drops here, undoing the keys applied so far.
            scope.table.set(key, OsStr::new(value))?;
            scope.previous.push((key.to_owned(), old));
        }
        debug!(keys = ?overrides.keys().collect::<Vec<_>>(), "entered environment scope");
        Ok(EnvGuard {
            active: Some(scope),
        })
    }
}

impl EnvSource for EnvLock {
    fn get(&self, key: &str) -> Option<OsString> {
        self.table.get(key)
    }
}

impl fmt::Debug for EnvLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvLock")
            .field("locked", &self.mutex.is_locked())
            .finish_non_exhaustive()
    }
}

/// Restores the environment and releases the lock when exited or dropped.
#[must_use = "dropping the guard immediately restores the environment"]
pub struct EnvGuard<'a> {
    active: Option<ActiveScope<'a>>,
}

impl EnvGuard<'_> {
    const fn inactive() -> Self {
        Self { active: None }
    }

    /// Returns `true` when this guard holds the lock.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Restores every overridden variable, then releases the lock.
    ///
    /// Prefer this over dropping the guard when the caller can report a
    /// restoration failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`EnvError`] raised while restoring. Restoration
    /// still continues for the remaining variables and the lock is released.
    pub fn exit(mut self) -> Result<(), EnvError> {
        self.active.take().map_or(Ok(()), |mut scope| scope.restore())
    }
}

impl fmt::Debug for EnvGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvGuard")
            .field("active", &self.is_active())
            .finish()
    }
}

struct ActiveScope<'a> {
    table: &'a dyn EnvTable,
    previous: Vec<(String, Option<OsString>)>,
    _lock: MutexGuard<'a, ()>,
}

impl ActiveScope<'_> {
    fn restore(&mut self) -> Result<(), EnvError> {
        let mut first_error = None;
        for (key, old) in self.previous.drain(..).rev() {
            let restored = match old {
                Some(value) => self.table.set(&key, &value),
                None => self.table.unset(&key),
            };
            if let Err(err) = restored {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for ActiveScope<'_> {
    // Runs before `_lock` is dropped, so restoration completes while the
    // mutex is still held.
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            error!(error = %err, "failed to restore environment on scope exit");
        }
    }
}

#[cfg(test)]
mod tests;
