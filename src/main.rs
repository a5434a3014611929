//! Binary entry point for the dnsscope CLI.

use std::io::{self, Write};
use std::process;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use dnsscope::{
    DnsScopeConfig, EnvOverrides, Provider, ProviderError, ProviderRegistry, ProviderWrapper,
};

mod cli;

use cli::{ChallengeCommand, Cli};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("no DNS provider selected: pass --provider or set DNSSCOPE_PROVIDER")]
    MissingProvider,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("failed to write output: {0}")]
    Output(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Action {
    Present,
    Cleanup,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .ok();
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::Present(args) => run_challenge(Action::Present, args),
        Cli::Cleanup(args) => run_challenge(Action::Cleanup, args),
        Cli::Providers => list_providers(io::stdout()),
    }
}

fn run_challenge(action: Action, args: ChallengeCommand) -> Result<(), CliError> {
    let config =
        DnsScopeConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;

    let name = select_provider(args.provider.as_deref(), &config)?;
    let timeout = select_lock_timeout(args.lock_timeout_secs, &config)?;
    let overrides: EnvOverrides = args.env.into_iter().collect();

    let wrapper = ProviderWrapper::builder()
        .lock_timeout(timeout)
        .build(&name, overrides)?;
    match action {
        Action::Present => wrapper.present(&args.domain, &args.token, &args.key_auth)?,
        Action::Cleanup => wrapper.cleanup(&args.domain, &args.token, &args.key_auth)?,
    }
    Ok(())
}

fn select_provider(flag: Option<&str>, config: &DnsScopeConfig) -> Result<String, CliError> {
    flag.or(config.provider.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .ok_or(CliError::MissingProvider)
}

fn select_lock_timeout(
    flag: Option<u64>,
    config: &DnsScopeConfig,
) -> Result<Option<Duration>, CliError> {
    match flag {
        Some(0) => Err(CliError::Config(String::from(
            "--lock-timeout-secs must be at least 1",
        ))),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(config.lock_timeout()),
    }
}

fn list_providers(mut target: impl Write) -> Result<(), CliError> {
    let registry = ProviderRegistry::with_builtins();
    for name in registry.names() {
        writeln!(target, "{name}").map_err(|err| CliError::Output(err.to_string()))?;
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
