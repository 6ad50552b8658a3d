//! Error handling for the echorelay CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Relay error: {0}")]
    Relay(#[from] echorelay_core::EchorelayError),

    #[error("Configuration error: {0}")]
    Config(#[from] echorelay_core::ConfigError),

    #[error("Backend setup failed: {0}")]
    Backend(#[from] echorelay_core::BackendError),

    #[error("Forum relay setup failed: {0}")]
    Forum(#[from] echorelay_core::RelayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
