//! CLI argument definitions using clap
//!
//! Commands:
//! - munconnect serve [--config <path>] [--port <port>] [--in-memory]
//! - munconnect check-config [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MUN Connect - API backend for the Model UN community platform
#[derive(Parser, Debug)]
#[command(name = "munconnect")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API server
    Serve {
        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,

        /// Use the in-memory backend instead of the hosted one
        #[arg(long)]
        in_memory: bool,
    },

    /// Load the configuration, report problems and exit
    CheckConfig {
        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "munconnect",
            "serve",
            "--port",
            "8080",
            "--in-memory",
            "--json-logs",
        ])
        .unwrap();

        assert!(cli.json_logs);
        match cli.command {
            Command::Serve {
                config,
                port,
                in_memory,
            } => {
                assert_eq!(config, None);
                assert_eq!(port, Some(8080));
                assert!(in_memory);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_check_config() {
        let cli =
            Cli::try_parse_from(["munconnect", "check-config", "--config", "mun.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::CheckConfig { config: Some(ref p) } if p == &PathBuf::from("mun.toml")
        ));
    }
}
