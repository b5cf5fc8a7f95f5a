//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the client and controllers. Request handling never reads process-wide
//! environment variables; the binaries resolve them and hand a `CoreConfig` down.

use crate::constants::DEFAULT_SERVER_BASE;
use crate::{ConsoleError, ConsoleResult};
use url::Url;

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    server_base: Url,
}

impl CoreConfig {
    /// Create a new `CoreConfig` from a FHIR server base URL.
    ///
    /// The base must be an absolute `http` or `https` URL without a query or fragment. A
    /// trailing slash is dropped so operation paths can be appended as `/<path>`.
    pub fn new(server_base: &str) -> ConsoleResult<Self> {
        let trimmed = server_base.trim();
        if trimmed.is_empty() {
            return Err(ConsoleError::InvalidConfig(
                "server base URL cannot be empty".into(),
            ));
        }

        let parsed = Url::parse(trimmed.trim_end_matches('/'))
            .map_err(|e| ConsoleError::InvalidConfig(format!("invalid server base URL: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConsoleError::InvalidConfig(format!(
                "unsupported scheme for server base URL: {}",
                parsed.scheme()
            )));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ConsoleError::InvalidConfig(
                "server base URL must not carry a query or fragment".into(),
            ));
        }

        Ok(Self {
            server_base: parsed,
        })
    }

    /// The server base without a trailing slash.
    pub fn server_base(&self) -> &str {
        self.server_base.as_str().trim_end_matches('/')
    }

    /// Resolve a request path (starting with `/`) against the server base.
    pub fn url_for(&self, path: &str) -> ConsoleResult<Url> {
        if !path.starts_with('/') {
            return Err(ConsoleError::InvalidInput(format!(
                "request path must start with '/': {path}"
            )));
        }
        Url::parse(&format!("{}{}", self.server_base(), path))
            .map_err(|e| ConsoleError::InvalidInput(format!("invalid request path {path}: {e}")))
    }
}

/// Build the configuration from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, the local test server default is used.
pub fn config_from_env_value(value: Option<String>) -> ConsoleResult<CoreConfig> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    CoreConfig::new(value.as_deref().unwrap_or(DEFAULT_SERVER_BASE))
}
