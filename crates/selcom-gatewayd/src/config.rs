//! Daemon settings

use std::net::SocketAddr;

use selcom_apigw::{ConfigError, SelcomConfig};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::logging::LogFormat;

/// Default listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8085";

/// Process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// Socket the HTTP server binds to
    pub listen_addr: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

/// Full daemon settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Process settings
    pub info: Info,
    /// Gateway credentials and endpoint
    pub selcom: SelcomConfig,
}

impl Settings {
    /// Command line flags win over the environment
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(listen_addr) = &cli.listen_addr {
            self.info.listen_addr = listen_addr.clone();
        }

        if let Some(log_format) = cli.log_format {
            self.info.log_format = log_format;
        }

        self
    }

    /// Parsed listen address
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.info
            .listen_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "listen_addr",
                reason: e.to_string(),
            })
    }

    /// Fail fast on anything the service cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        self.selcom.validate()
    }
}
