//! Environment variables
//!
//! Anything set here overrides the built-in defaults. Command line flags
//! are applied afterwards.

mod info;
mod selcom;

use std::env;

use selcom_apigw::ConfigError;

use crate::config::Settings;

impl Settings {
    /// Overlay environment variables onto these settings
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        self.info = self.info.from_env()?;
        self.selcom = selcom::from_env(self.selcom)?;
        Ok(self)
    }
}

/// Read a variable, treating empty values as unset
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
