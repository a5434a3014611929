//! Command-line interface definitions for the `dnsscope` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `dnsscope` binary.
#[derive(Debug, Parser)]
#[command(
    name = "dnsscope",
    about = "Present and clean up ACME DNS-01 records with per-provider environment overrides",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Publish the challenge record for a domain.
    #[command(name = "present", about = "Publish the DNS-01 challenge record")]
    Present(ChallengeCommand),
    /// Remove the challenge record for a domain.
    #[command(name = "cleanup", about = "Remove the DNS-01 challenge record")]
    Cleanup(ChallengeCommand),
    /// List the built-in providers.
    #[command(name = "providers", about = "List the built-in DNS providers")]
    Providers,
}

/// Arguments shared by `dnsscope present` and `dnsscope cleanup`.
#[derive(Debug, Parser)]
pub(crate) struct ChallengeCommand {
    /// DNS provider to use. Falls back to `DNSSCOPE_PROVIDER`.
    #[arg(long, value_name = "NAME")]
    pub(crate) provider: Option<String>,
    /// Environment override visible only to this provider (repeatable).
    ///
    /// Overrides are applied while the provider is built and around each
    /// call, then the previous environment is restored.
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub(crate) env: Vec<(String, String)>,
    /// Give up after waiting this many seconds for the environment lock.
    #[arg(long, value_name = "SECONDS")]
    pub(crate) lock_timeout_secs: Option<u64>,
    /// Domain being validated; a leading `*.` is ignored.
    pub(crate) domain: String,
    /// ACME challenge token.
    pub(crate) token: String,
    /// ACME key authorisation.
    pub(crate) key_auth: String,
}

/// Parses a `KEY=VALUE` override, splitting at the first `=`.
pub(crate) fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE with a non-empty KEY, got '{raw}'")),
    }
}
