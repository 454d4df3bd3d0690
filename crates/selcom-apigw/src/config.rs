//! Configuration types for the Selcom API gateway integration

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default gateway base URL
pub const DEFAULT_BASE_URL: &str = "https://apigw.selcommobile.com";

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Configuration error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is missing or empty
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// Base URL could not be parsed
    #[error("Invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl {
        /// Offending value
        url: String,
        /// Parser message
        reason: String,
    },

    /// A setting has an unusable value
    #[error("Invalid value for {name}: {reason}")]
    Invalid {
        /// Setting name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// API key and secret issued by Selcom
///
/// Only the key ever leaves the process (base64-armored in the
/// `Authorization` header). The secret is used as the HMAC key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Opaque API key
    pub api_key: String,
    /// Opaque API secret
    pub api_secret: String,
}

impl Credential {
    /// Create a new credential pair
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Process-wide Selcom settings, loaded once at startup
#[derive(Clone, Serialize, Deserialize)]
pub struct SelcomConfig {
    /// API key
    pub api_key: String,
    /// API secret
    pub api_secret: String,
    /// Gateway base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Vendor (till) id injected into money-moving payloads
    pub vendor: String,
    /// Vendor PIN injected into money-moving payloads
    pub pin: String,
    /// Bearer token expected on inbound webhook/C2B requests
    pub webhook_token: String,
    /// Outbound request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for SelcomConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: default_base_url(),
            vendor: String::new(),
            pin: String::new(),
            webhook_token: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl fmt::Debug for SelcomConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelcomConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("vendor", &self.vendor)
            .field("pin", &"<redacted>")
            .field("webhook_token", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl SelcomConfig {
    /// Check that every required setting is present and usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("api_key", &self.api_key),
            ("api_secret", &self.api_secret),
            ("vendor", &self.vendor),
            ("pin", &self.pin),
            ("webhook_token", &self.webhook_token),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        self.parsed_base_url()?;

        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Credential pair used by the signer
    pub fn credential(&self) -> Credential {
        Credential::new(&self.api_key, &self.api_secret)
    }

    /// Parse the base URL
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })
    }
}
