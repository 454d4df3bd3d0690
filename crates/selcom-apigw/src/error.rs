//! Error for the Selcom integration

use thiserror::Error;

use crate::api::error::Error as SelcomApiError;
use crate::config::ConfigError;

/// Selcom Error
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is incomplete or invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Selcom API error
    #[error(transparent)]
    SelcomApi(#[from] SelcomApiError),
}
