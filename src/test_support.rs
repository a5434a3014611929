//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::ffi::{OsStr, OsString};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::cache::AnswerCache;
use crate::command::{CommandOutput, CommandRunner};
use crate::environment::{EnvError, EnvSource, EnvTable, validate_assignment};
use crate::provider::{Provider, ProviderError};
use crate::registry::ProviderRegistry;

/// In-memory [`EnvTable`] for exercising scopes without touching the real
/// environment.
///
/// Clones share the same table, so a test can keep a handle after moving a
/// clone into an [`crate::EnvLock`].
#[derive(Clone, Debug, Default)]
pub struct MemoryEnv {
    vars: Arc<Mutex<HashMap<String, OsString>>>,
    failing_unsets: Arc<Mutex<BTreeSet<String>>>,
}

impl MemoryEnv {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table pre-populated with `pairs`.
    #[must_use]
    pub fn with_vars(pairs: &[(&str, &str)]) -> Self {
        let env = Self::new();
        {
            let mut vars = env.vars.lock();
            for (key, value) in pairs {
                vars.insert((*key).to_owned(), OsString::from(*value));
            }
        }
        env
    }

    /// Makes every later `unset` of `key` fail.
    pub fn fail_unset(&self, key: &str) {
        self.failing_unsets.lock().insert(key.to_owned());
    }

    /// Returns a copy of the current contents with values lossily decoded.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.vars
            .lock()
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string_lossy().into_owned()))
            .collect()
    }
}

impl EnvSource for MemoryEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        self.vars.lock().get(key).cloned()
    }
}

impl EnvTable for MemoryEnv {
    fn set(&self, key: &str, value: &OsStr) -> Result<(), EnvError> {
        validate_assignment(key, Some(value))?;
        self.vars.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn unset(&self, key: &str) -> Result<(), EnvError> {
        validate_assignment(key, None)?;
        if self.failing_unsets.lock().contains(key) {
            return Err(EnvError::Table {
                key: key.to_owned(),
                message: String::from("simulated unset failure"),
            });
        }
        self.vars.lock().remove(key);
        Ok(())
    }
}

/// Operation recorded by [`StubProvider`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StubOperation {
    /// A `present` call.
    Present,
    /// A `cleanup` call.
    Cleanup,
}

/// A single call made to a [`StubProvider`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StubCall {
    /// Which operation was invoked.
    pub operation: StubOperation,
    /// Domain argument.
    pub domain: String,
    /// Token argument.
    pub token: String,
    /// Key authorisation argument.
    pub key_auth: String,
    /// Values of the observed keys while the call ran.
    pub observed: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Default)]
struct StubState {
    calls: Vec<StubCall>,
    fail_present: bool,
    fail_cleanup: bool,
}

/// Provider double that records calls and can be told to fail.
///
/// Clones share state. When built with [`StubProvider::observing`], each
/// call snapshots the listed keys from the given table.
#[derive(Clone, Debug)]
pub struct StubProvider {
    name: String,
    state: Arc<Mutex<StubState>>,
    observed_env: Option<MemoryEnv>,
    observed_keys: Vec<String>,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::named("stub")
    }
}

impl StubProvider {
    /// Creates a stub named `stub` that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stub reporting `name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(StubState::default())),
            observed_env: None,
            observed_keys: Vec::new(),
        }
    }

    /// Records the values of `keys` in `env` on every call.
    #[must_use]
    pub fn observing(mut self, env: MemoryEnv, keys: &[&str]) -> Self {
        self.observed_env = Some(env);
        self.observed_keys = keys.iter().map(|key| (*key).to_owned()).collect();
        self
    }

    /// Makes later `present` calls fail.
    pub fn fail_present(&self) {
        self.state.lock().fail_present = true;
    }

    /// Makes later `cleanup` calls fail.
    pub fn fail_cleanup(&self) {
        self.state.lock().fail_cleanup = true;
    }

    /// Returns the calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<StubCall> {
        self.state.lock().calls.clone()
    }

    fn record(
        &self,
        operation: StubOperation,
        domain: &str,
        token: &str,
        key_auth: &str,
    ) -> Result<(), ProviderError> {
        let observed = self.observed_env.as_ref().map_or_else(BTreeMap::new, |env| {
            self.observed_keys
                .iter()
                .map(|key| (key.clone(), env.var(key)))
                .collect()
        });
        let mut state = self.state.lock();
        state.calls.push(StubCall {
            operation,
            domain: domain.to_owned(),
            token: token.to_owned(),
            key_auth: key_auth.to_owned(),
            observed,
        });
        let failing = match operation {
            StubOperation::Present => state.fail_present,
            StubOperation::Cleanup => state.fail_cleanup,
        };
        if failing {
            let verb = match operation {
                StubOperation::Present => "present",
                StubOperation::Cleanup => "cleanup",
            };
            return Err(ProviderError::Operation {
                provider: self.name.clone(),
                message: format!("{verb} failed for {domain}"),
            });
        }
        Ok(())
    }
}

impl Provider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        self.record(StubOperation::Present, domain, token, key_auth)
    }

    fn cleanup(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        self.record(StubOperation::Cleanup, domain, token, key_auth)
    }
}

/// Returns a registry whose `stub` entry hands out clones of `provider`.
#[must_use]
pub fn stub_registry(provider: &StubProvider) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    let shared = provider.clone();
    registry.register("stub", move |_| Ok(Box::new(shared.clone()) as Box<dyn Provider>));
    registry
}

/// [`AnswerCache`] that counts invalidations.
#[derive(Debug, Default)]
pub struct CountingCache {
    clears: AtomicUsize,
}

impl CountingCache {
    /// Creates a cache with a zero count.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times the cache was cleared.
    #[must_use]
    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl AnswerCache for CountingCache {
    fn clear_all(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.lock().clone()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.lock().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProviderError> {
        self.invocations.lock().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| ProviderError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}
