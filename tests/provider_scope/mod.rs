//! Step definitions, fixtures and scenarios for provider scoping.

mod bdd_steps;
mod scenarios;
mod test_helpers;
