use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "fmaster", about = "Function master: instance & group lifecycle controller", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP API and reconciliation loop in-process.
    Serve {
        /// Path to the master's YAML config file.
        config: PathBuf,
    },

    /// Query a running master's health and resource summary.
    Status {
        /// Base URL of the running master, e.g. http://127.0.0.1:8080.
        #[arg(long, env = "FMASTER_URL", default_value = "http://127.0.0.1:8080")]
        url: String,

        /// Bearer token to authenticate with.
        #[arg(long, env = "FMASTER_TOKEN")]
        token: String,
    },
}
