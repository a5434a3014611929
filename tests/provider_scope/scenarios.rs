//! BDD scenarios for provider environment scoping.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ScopeContext, scope_context};

#[scenario(
    path = "tests/features/provider_scope.feature",
    name = "Overrides are visible only during the provider call"
)]
fn scenario_overrides_visible_during_call(scope_context: ScopeContext) {
    let _ = scope_context;
}

#[scenario(
    path = "tests/features/provider_scope.feature",
    name = "A failing provider clears the answer cache once"
)]
fn scenario_failure_clears_cache(scope_context: ScopeContext) {
    let _ = scope_context;
}

#[scenario(
    path = "tests/features/provider_scope.feature",
    name = "Unknown providers are rejected without holding the lock"
)]
fn scenario_unknown_provider(scope_context: ScopeContext) {
    let _ = scope_context;
}
