//! Command handlers for the echorelay CLI

use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::demo;
use crate::error::Result;

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        match cli.command {
            Commands::Demo {
                absent_witness,
                fast,
            } => demo::run(config, absent_witness, fast).await,
            Commands::CheckConfig => Self::handle_check_config(&config),
        }
    }

    fn handle_check_config(config: &AppConfig) -> Result<()> {
        config.relay.validate()?;
        info!("Configuration is valid");

        let relay = &config.relay;
        println!("bot name:        {}", relay.bot_name);
        println!("admin prefix:    {:?}", relay.admin_prefix);
        println!("keywords:        {}", relay.keywords.join(", "));
        println!("backend:         {}", config.backend.kind());
        println!(
            "forum relay:     {}",
            config
                .forum
                .as_ref()
                .map(|forum| forum.url.as_str())
                .unwrap_or("disabled")
        );
        println!(
            "acknowledgment:  {} ({} resends every {} ms)",
            if relay.delivery.ack_enabled { "on" } else { "off" },
            relay.delivery.max_resends,
            relay.delivery.retry_interval_ms
        );
        println!("push selector:   {:?}", relay.push.selector);
        Ok(())
    }
}
