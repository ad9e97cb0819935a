//! Hosted-model capability detection.
//!
//! The capability is decided once, when the advisor is configured, and is
//! never re-probed afterwards. A missing credential is a normal state and
//! selects the heuristic path for every operation.

use std::fmt;

pub const SERVER_KEY_VAR: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
pub const CLIENT_KEY_VAR: &str = "NEXT_PUBLIC_GOOGLE_GENERATIVE_AI_API_KEY";

/// Credentials shorter than this are placeholders or truncated copies.
pub const MIN_KEY_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Server,
    Client,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    source: CredentialSource,
}

impl Credential {
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capability {
    credential: Option<Credential>,
}

impl Capability {
    /// Reads the credential from the process environment.
    pub fn detect() -> Self {
        Self::from_sources(
            std::env::var(SERVER_KEY_VAR).ok(),
            std::env::var(CLIENT_KEY_VAR).ok(),
        )
    }

    /// The server-only value wins over the client-exposed one; empty
    /// values count as absent.
    pub fn from_sources(server: Option<String>, client: Option<String>) -> Self {
        let candidate = non_empty(server)
            .map(|value| (value, CredentialSource::Server))
            .or_else(|| non_empty(client).map(|value| (value, CredentialSource::Client)));

        let credential = match candidate {
            Some((value, source)) if value.len() < MIN_KEY_LEN => {
                tracing::warn!(
                    ?source,
                    length = value.len(),
                    "model credential looks invalid, staying in demo mode"
                );
                None
            }
            Some((value, source)) => Some(Credential { value, source }),
            None => None,
        };

        let capability = Self { credential };
        tracing::info!(
            mode = if capability.is_available() { "model" } else { "demo" },
            "advisor capability detected"
        );
        capability
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.credential.is_some()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_KEY: &str = "AIzaSyA-0123456789abcdefghij";

    #[test]
    fn absent_credential_is_unavailable() {
        let capability = Capability::from_sources(None, None);
        assert!(!capability.is_available());
        assert!(capability.credential().is_none());
    }

    #[test]
    fn short_credential_is_rejected() {
        let capability = Capability::from_sources(Some("changeme".to_string()), None);
        assert!(!capability.is_available());
    }

    #[test]
    fn server_credential_is_preferred() {
        let capability = Capability::from_sources(
            Some(GOOD_KEY.to_string()),
            Some("client-side-key-0000000000".to_string()),
        );
        let credential = capability.credential().unwrap();
        assert_eq!(credential.source(), CredentialSource::Server);
        assert_eq!(credential.expose(), GOOD_KEY);
    }

    #[test]
    fn empty_server_value_falls_back_to_client() {
        let capability = Capability::from_sources(Some("  ".to_string()), Some(GOOD_KEY.to_string()));
        assert_eq!(capability.credential().unwrap().source(), CredentialSource::Client);
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let capability = Capability::from_sources(Some(GOOD_KEY.to_string()), None);
        let rendered = format!("{:?}", capability);
        assert!(!rendered.contains(GOOD_KEY));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn exactly_minimum_length_is_accepted() {
        let key = "k".repeat(MIN_KEY_LEN);
        assert!(Capability::from_sources(Some(key), None).is_available());
    }
}
