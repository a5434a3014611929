//! DNS-01 record naming and value helpers shared by the built-in providers.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Label prepended to the domain to form the challenge record name.
pub const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

/// Strips a leading wildcard label (`*.example.com` -> `example.com`).
#[must_use]
pub fn normalize_domain(domain: &str) -> &str {
    domain.strip_prefix("*.").unwrap_or(domain)
}

/// Appends the root label when `name` is not already fully qualified.
#[must_use]
pub fn to_fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_owned()
    } else {
        format!("{name}.")
    }
}

/// Record name and TXT value answering a DNS-01 challenge.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChallengeInfo {
    /// Fully qualified record name, for example `_acme-challenge.example.com.`.
    pub fqdn: String,
    /// Base64url-encoded SHA-256 digest of the key authorisation.
    pub value: String,
}

impl ChallengeInfo {
    /// Derives the record for `domain` and `key_auth`.
    #[must_use]
    pub fn new(domain: &str, key_auth: &str) -> Self {
        let digest = Sha256::digest(key_auth.as_bytes());
        Self {
            fqdn: to_fqdn(&format!(
                "{ACME_CHALLENGE_LABEL}.{}",
                normalize_domain(domain).trim_end_matches('.')
            )),
            value: URL_SAFE_NO_PAD.encode(digest),
        }
    }
}
