//! echorelay CLI configuration
//!
//! One TOML file with three sections: `[relay]` (everything the relay itself
//! tunes), `[backend]` (which Q&A service answers mentions) and an optional
//! `[forum]`. Command-line flags are applied on top.

use serde::{Deserialize, Serialize};
use std::path::Path;

use echorelay_backends::{BackendConfig, ForumConfig};
use echorelay_core::RelayConfig;

use crate::cli::Cli;
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub relay: RelayConfig,
    pub backend: BackendConfig,
    pub forum: Option<ForumConfig>,
}

impl AppConfig {
    /// Load and validate a TOML configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.relay.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if cli.no_ack {
            self.relay.delivery.ack_enabled = false;
        }
        self
    }
}
