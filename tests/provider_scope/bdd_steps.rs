//! BDD step definitions for provider environment scoping.

use std::ffi::OsStr;
use std::sync::Arc;

use dnsscope::test_support::StubOperation;
use dnsscope::{EnvSource, EnvTable, Provider};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{ScopeContext, TOKEN_KEY, build_wrapper};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("an ambient API token \"{token}\"")]
fn ambient_token(scope_context: ScopeContext, token: String) -> ScopeContext {
    scope_context
        .env
        .set(TOKEN_KEY, OsStr::new(&token))
        .unwrap_or_else(|err| panic!("ambient token should be stored: {err}"));
    scope_context
}

#[given("a stub provider built with API token override \"{token}\"")]
fn stub_provider_built(mut scope_context: ScopeContext, token: String) -> ScopeContext {
    let wrapper = build_wrapper(&scope_context, "stub", &token)
        .unwrap_or_else(|err| panic!("stub provider should build: {err}"));
    scope_context.wrapper = Some(Arc::new(wrapper));
    scope_context
}

#[given("the provider fails to present")]
fn provider_fails_to_present(scope_context: ScopeContext) -> ScopeContext {
    scope_context.stub.fail_present();
    scope_context
}

#[when("the provider presents \"{domain}\"")]
fn provider_presents(mut scope_context: ScopeContext, domain: String) -> ScopeContext {
    let Some(wrapper) = scope_context.wrapper.as_ref() else {
        panic!("test setup requires a built provider");
    };
    scope_context.outcome = Some(wrapper.present(&domain, "token", "key-auth"));
    scope_context
}

#[when("a provider named \"{name}\" is built with API token override \"{token}\"")]
fn provider_named_is_built(
    mut scope_context: ScopeContext,
    name: String,
    token: String,
) -> ScopeContext {
    scope_context.build_error = build_wrapper(&scope_context, &name, &token).err();
    scope_context
}

#[then("the provider observed API token \"{token}\"")]
fn provider_observed_token(scope_context: &ScopeContext, token: String) -> Result<(), StepError> {
    let calls = scope_context.stub.calls();
    let Some(call) = calls.last() else {
        return Err(StepError::Assertion(String::from("provider was not called")));
    };
    if call.operation != StubOperation::Present {
        return Err(StepError::Assertion(format!(
            "expected a present call, got {:?}",
            call.operation
        )));
    }
    let seen = call.observed.get(TOKEN_KEY).cloned().flatten();
    if seen.as_deref() == Some(token.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {TOKEN_KEY}={token} during the call, saw {seen:?}"
        )))
    }
}

#[then("the ambient API token is \"{token}\" again")]
fn ambient_token_restored(scope_context: &ScopeContext, token: String) -> Result<(), StepError> {
    let current = scope_context.env.var(TOKEN_KEY);
    if current.as_deref() == Some(token.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {TOKEN_KEY}={token} after the call, found {current:?}"
        )))
    }
}

#[then("the answer cache was cleared {count:u32} times")]
fn cache_cleared(scope_context: &ScopeContext, count: u32) -> Result<(), StepError> {
    let clears = scope_context.cache.clears();
    if u32::try_from(clears).is_ok_and(|actual| actual == count) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} cache clears, got {clears}"
        )))
    }
}

#[then("the call fails with \"{message}\"")]
fn call_fails_with(scope_context: &ScopeContext, message: String) -> Result<(), StepError> {
    match scope_context.outcome.as_ref() {
        Some(Err(err)) if err.to_string() == message => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure '{message}', got {other:?}"
        ))),
    }
}

#[then("building fails with \"{message}\"")]
fn building_fails_with(scope_context: &ScopeContext, message: String) -> Result<(), StepError> {
    match scope_context.build_error.as_ref() {
        Some(err) if err.to_string() == message => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected build failure '{message}', got {other:?}"
        ))),
    }
}

#[then("the environment lock is free")]
fn environment_lock_free(scope_context: &ScopeContext) -> Result<(), StepError> {
    if scope_context.lock.is_locked() {
        Err(StepError::Assertion(String::from(
            "environment lock is still held",
        )))
    } else {
        Ok(())
    }
}
