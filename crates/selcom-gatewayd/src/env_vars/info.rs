//! Process environment variables

use selcom_apigw::ConfigError;

use super::var;
use crate::config::Info;

pub const ENV_LISTEN_ADDR: &str = "SELCOM_GATEWAYD_LISTEN_ADDR";
pub const ENV_LOG_FORMAT: &str = "SELCOM_GATEWAYD_LOG_FORMAT";

impl Info {
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        if let Some(listen_addr) = var(ENV_LISTEN_ADDR) {
            self.listen_addr = listen_addr;
        }

        if let Some(log_format) = var(ENV_LOG_FORMAT) {
            self.log_format = log_format.parse().map_err(|reason| ConfigError::Invalid {
                name: ENV_LOG_FORMAT,
                reason,
            })?;
        }

        Ok(self)
    }
}
