//! Clinic configuration loading from config.toml
//!
//! The file names the clinic (used in client messages) and lists the branches
//! and bootstrap staff accounts that are seeded into the database at startup.
//! Seeding is idempotent, so the same file can be loaded on every boot.

use crate::entities::user_account::Role;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

fn default_clinic_name() -> String {
    "Iris".to_string()
}

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct ClinicConfig {
    /// Name used in messages sent to clients
    #[serde(default = "default_clinic_name")]
    pub clinic_name: String,
    /// Branches to seed
    #[serde(default)]
    pub branches: Vec<BranchConfig>,
    /// Staff accounts to seed
    #[serde(default)]
    pub staff: Vec<StaffConfig>,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            clinic_name: default_clinic_name(),
            branches: Vec::new(),
            staff: Vec::new(),
        }
    }
}

/// Configuration for a single branch
#[derive(Debug, Deserialize, Clone)]
pub struct BranchConfig {
    pub name: String,
    pub code: String,
}

/// Configuration for a bootstrap staff account
#[derive(Debug, Deserialize, Clone)]
pub struct StaffConfig {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

/// Loads clinic configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML syntax is invalid or
/// required fields are missing.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClinicConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file {:?}: {e}", path.as_ref()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the configuration if the file exists, otherwise returns the defaults.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<ClinicConfig> {
    if path.as_ref().exists() {
        load_config(path)
    } else {
        tracing::warn!(
            "No clinic config at {:?}; starting without seed data",
            path.as_ref()
        );
        Ok(ClinicConfig::default())
    }
}
