//! Environment-scoped DNS-01 providers for ACME clients.
//!
//! DNS providers read their credentials from environment variables, which are
//! shared by the whole process. This crate lets several providers with
//! different credentials coexist: each [`ProviderWrapper`] carries its own
//! [`EnvOverrides`] and applies them, under a single process-wide
//! [`EnvLock`], only while the wrapped provider is being built or is
//! presenting or cleaning up a challenge record.
//!
//! Overrides can also carry challenge options (`LEGO_DISABLE_CP`,
//! `LEGO_DNS_RESOLVERS`), and a failed provider call clears the cached DNS
//! answers so the next attempt starts fresh.

pub mod cache;
pub mod challenge;
pub mod command;
pub mod config;
pub mod environment;
pub mod options;
pub mod overrides;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod test_support;
pub mod wrapper;

pub use cache::{AnswerCache, FqdnCache, ZoneAnswer};
pub use challenge::ChallengeInfo;
pub use command::{CommandOutput, CommandRunner, ProcessCommandRunner};
pub use config::{ConfigError, DnsScopeConfig};
pub use environment::{EnvError, EnvGuard, EnvLock, EnvSource, EnvTable};
pub use options::{ChallengeOption, ChallengeOptionsDecorator, Dns01Provider, OptionDecorator};
pub use overrides::EnvOverrides;
pub use provider::{Provider, ProviderError, ProviderFactory};
pub use registry::{ProviderConstructor, ProviderRegistry};
pub use wrapper::{ProviderWrapper, ProviderWrapperBuilder};
