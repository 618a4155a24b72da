/// Database configuration and connection management
pub mod database;

/// Clinic configuration (branches, bootstrap staff) loaded from config.toml
pub mod clinic;

/// HTTP server settings from environment variables
pub mod server;
