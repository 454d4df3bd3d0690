//! Selcom environment variables

use selcom_apigw::{ConfigError, SelcomConfig};

use super::var;

pub const ENV_SELCOM_API_KEY: &str = "SELCOM_API_KEY";
pub const ENV_SELCOM_API_SECRET: &str = "SELCOM_API_SECRET";
pub const ENV_SELCOM_BASE_URL: &str = "SELCOM_BASE_URL";
pub const ENV_SELCOM_VENDOR_ID: &str = "SELCOM_VENDOR_ID";
pub const ENV_SELCOM_VENDOR_PIN: &str = "SELCOM_VENDOR_PIN";
pub const ENV_SELCOM_WEBHOOK_TOKEN: &str = "SELCOM_WEBHOOK_TOKEN";
pub const ENV_SELCOM_TIMEOUT_MS: &str = "SELCOM_TIMEOUT_MS";

pub(super) fn from_env(mut config: SelcomConfig) -> Result<SelcomConfig, ConfigError> {
    if let Some(api_key) = var(ENV_SELCOM_API_KEY) {
        config.api_key = api_key;
    }

    if let Some(api_secret) = var(ENV_SELCOM_API_SECRET) {
        config.api_secret = api_secret;
    }

    if let Some(base_url) = var(ENV_SELCOM_BASE_URL) {
        config.base_url = base_url;
    }

    if let Some(vendor) = var(ENV_SELCOM_VENDOR_ID) {
        config.vendor = vendor;
    }

    if let Some(pin) = var(ENV_SELCOM_VENDOR_PIN) {
        config.pin = pin;
    }

    if let Some(token) = var(ENV_SELCOM_WEBHOOK_TOKEN) {
        config.webhook_token = token;
    }

    if let Some(timeout) = var(ENV_SELCOM_TIMEOUT_MS) {
        config.timeout_ms = timeout
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: ENV_SELCOM_TIMEOUT_MS,
                reason: e.to_string(),
            })?;
    }

    Ok(config)
}
