//! Provider that posts record changes to an HTTP endpoint.
//!
//! # Endpoint API
//!
//! ```text
//! POST {HTTPREQ_ENDPOINT}/present
//! POST {HTTPREQ_ENDPOINT}/cleanup
//! Content-Type: application/json
//!
//! {"fqdn": "_acme-challenge.example.com.", "value": "<digest>"}
//! ```
//!
//! With `HTTPREQ_MODE=RAW` the body carries the raw ACME arguments instead:
//! `{"domain": "...", "token": "...", "keyAuth": "..."}`. Basic auth is sent
//! when both `HTTPREQ_USERNAME` and `HTTPREQ_PASSWORD` are set. Any non-2xx
//! response is an error.

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Serialize;
use tracing::debug;

use super::{RAW_MODE, non_blank};
use crate::challenge::ChallengeInfo;
use crate::environment::EnvSource;
use crate::provider::{Provider, ProviderError};

/// Registry name of the provider.
pub const NAME: &str = "httpreq";
/// Base URL of the endpoint.
pub const ENDPOINT_ENV: &str = "HTTPREQ_ENDPOINT";
/// Set to `RAW` to post raw ACME arguments.
pub const MODE_ENV: &str = "HTTPREQ_MODE";
/// Basic auth user name.
pub const USERNAME_ENV: &str = "HTTPREQ_USERNAME";
/// Basic auth password.
pub const PASSWORD_ENV: &str = "HTTPREQ_PASSWORD";
/// Request timeout in whole seconds.
pub const HTTP_TIMEOUT_ENV: &str = "HTTPREQ_HTTP_TIMEOUT";

/// Default request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct RecordMessage {
    fqdn: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct RawMessage<'a> {
    domain: &'a str,
    token: &'a str,
    #[serde(rename = "keyAuth")]
    key_auth: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Message<'a> {
    Record(RecordMessage),
    Raw(RawMessage<'a>),
}

/// Posts record changes to an HTTP endpoint.
pub struct HttpReqProvider {
    client: Client,
    endpoint: Url,
    raw: bool,
    credentials: Option<(String, String)>,
}

impl HttpReqProvider {
    /// Reads the `HTTPREQ_*` variables from `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredentials`] when the endpoint is
    /// unset, or [`ProviderError::Configuration`] when the endpoint or timeout
    /// cannot be parsed.
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ProviderError> {
        let raw_endpoint =
            non_blank(env, ENDPOINT_ENV).ok_or_else(|| ProviderError::MissingCredentials {
                provider: NAME.to_owned(),
                variables: vec![ENDPOINT_ENV.to_owned()],
            })?;
        let endpoint = Url::parse(raw_endpoint.trim()).map_err(|err| {
            ProviderError::Configuration(format!("{ENDPOINT_ENV}: {err}"))
        })?;
        let timeout = match non_blank(env, HTTP_TIMEOUT_ENV) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|err| {
                    ProviderError::Configuration(format!("{HTTP_TIMEOUT_ENV}: {err}"))
                })?,
            None => DEFAULT_HTTP_TIMEOUT,
        };
        let credentials = non_blank(env, USERNAME_ENV).zip(non_blank(env, PASSWORD_ENV));
        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            ProviderError::Configuration(format!("failed to create HTTP client: {err}"))
        })?;

        Ok(Self {
            client,
            endpoint,
            raw: env.var(MODE_ENV).as_deref() == Some(RAW_MODE),
            credentials,
        })
    }

    /// Returns the URL `action` requests are posted to.
    #[must_use]
    pub fn action_url(&self, action: &str) -> String {
        format!("{}/{action}", self.endpoint.as_str().trim_end_matches('/'))
    }

    /// Returns `true` when raw ACME arguments are posted.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        self.raw
    }

    fn body<'a>(&self, domain: &'a str, token: &'a str, key_auth: &'a str) -> Message<'a> {
        if self.raw {
            return Message::Raw(RawMessage {
                domain,
                token,
                key_auth,
            });
        }
        let info = ChallengeInfo::new(domain, key_auth);
        Message::Record(RecordMessage {
            fqdn: info.fqdn,
            value: info.value,
        })
    }

    fn post(
        &self,
        action: &str,
        domain: &str,
        token: &str,
        key_auth: &str,
    ) -> Result<(), ProviderError> {
        let url = self.action_url(action);
        let mut request = self
            .client
            .post(&url)
            .json(&self.body(domain, token, key_auth));
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .map_err(|err| ProviderError::Http(format!("{url}: {err}")))?;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "httpreq provider response");
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().unwrap_or_default();
        Err(ProviderError::Http(format!(
            "{url}: {}: {}",
            status.as_u16(),
            body.trim()
        )))
    }
}

impl fmt::Debug for HttpReqProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpReqProvider")
            .field("endpoint", &self.endpoint.as_str())
            .field("raw", &self.raw)
            .field("basic_auth", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl Provider for HttpReqProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        self.post("present", domain, token, key_auth)
    }

    fn cleanup(&self, domain: &str, token: &str, key_auth: &str) -> Result<(), ProviderError> {
        self.post("cleanup", domain, token, key_auth)
    }
}
