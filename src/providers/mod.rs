//! Built-in DNS providers.
//!
//! Both read their settings from the environment when constructed, so they
//! pick up whatever override set is active in the surrounding scope.
//!
//! - [`exec`] delegates record changes to an external program.
//! - [`httpreq`] posts record changes to an HTTP endpoint.

pub mod exec;
pub mod httpreq;

use crate::environment::EnvSource;

/// Returns `key` from `env` when it is set to a non-blank value.
fn non_blank(env: &dyn EnvSource, key: &str) -> Option<String> {
    env.var(key).filter(|value| !value.trim().is_empty())
}

/// Value of the `*_MODE` variable selecting raw ACME arguments.
const RAW_MODE: &str = "RAW";
