//! echorelay CLI library
//!
//! Argument parsing, configuration loading and the command handlers behind the
//! `echorelay` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod demo;
pub mod error;

pub use cli::{Cli, Commands};
pub use config::AppConfig;
pub use error::{CliError, Result};
