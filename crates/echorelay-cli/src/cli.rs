//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Disable the witness session and the resend protocol
    #[arg(long)]
    pub no_ack: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the relay against an in-process network and print the traffic
    Demo {
        /// Keep the witness out of the first group to show resends
        #[arg(long)]
        absent_witness: bool,
        /// Shrink jitter, retry and push intervals
        #[arg(long)]
        fast: bool,
    },
    /// Load and validate the configuration, then print a summary
    CheckConfig,
}
