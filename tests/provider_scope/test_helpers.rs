//! Shared fixtures and helpers for provider scoping BDD scenarios.

use std::sync::Arc;

use dnsscope::test_support::{CountingCache, MemoryEnv, StubProvider, stub_registry};
use dnsscope::{AnswerCache, EnvLock, EnvOverrides, ProviderError, ProviderWrapper};
use rstest::fixture;

/// Variable the stub provider observes on every call.
pub const TOKEN_KEY: &str = "DNS_API_TOKEN";

#[derive(Clone, Debug)]
pub struct ScopeContext {
    pub env: MemoryEnv,
    pub lock: Arc<EnvLock>,
    pub stub: StubProvider,
    pub cache: Arc<CountingCache>,
    pub wrapper: Option<Arc<ProviderWrapper>>,
    pub outcome: Option<Result<(), ProviderError>>,
    pub build_error: Option<ProviderError>,
}

#[fixture]
pub fn scope_context() -> ScopeContext {
    let env = MemoryEnv::new();
    ScopeContext {
        lock: Arc::new(EnvLock::new(env.clone())),
        stub: StubProvider::new().observing(env.clone(), &[TOKEN_KEY]),
        env,
        cache: Arc::new(CountingCache::new()),
        wrapper: None,
        outcome: None,
        build_error: None,
    }
}

/// Builds provider `name` against the context's lock, stub registry and
/// counting cache.
pub fn build_wrapper(
    context: &ScopeContext,
    name: &str,
    token: &str,
) -> Result<ProviderWrapper, ProviderError> {
    let overrides: EnvOverrides = [(TOKEN_KEY, token)].into_iter().collect();
    ProviderWrapper::builder()
        .env_lock(Arc::clone(&context.lock))
        .factory(Arc::new(stub_registry(&context.stub)))
        .answer_cache(Arc::clone(&context.cache) as Arc<dyn AnswerCache>)
        .build(name, overrides)
}
