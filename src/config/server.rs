//! HTTP server settings read from the environment.

use std::path::PathBuf;

/// Where the server listens and where it finds its clinic configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind, from `BIND_ADDRESS`
    pub bind_address: String,
    /// Path of the clinic config file, from `CLINIC_CONFIG`
    pub clinic_config_path: PathBuf,
}

impl ServerConfig {
    /// Reads `BIND_ADDRESS` and `CLINIC_CONFIG`, falling back to local defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            clinic_config_path: std::env::var("CLINIC_CONFIG")
                .map_or_else(|_| PathBuf::from("config.toml"), PathBuf::from),
        }
    }
}
