//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::logging::LogFormat;

/// Merchant-facing service in front of the Selcom API gateway
#[derive(Debug, Parser)]
#[command(name = "selcom-gatewayd", version, about)]
pub struct Cli {
    /// Address to listen on, overrides SELCOM_GATEWAYD_LISTEN_ADDR
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Log format (pretty or json), overrides SELCOM_GATEWAYD_LOG_FORMAT
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Dotenv file to load before reading the environment
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}
