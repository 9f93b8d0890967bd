//! CLI module for MUN Connect
//!
//! Provides command-line interface for:
//! - serve: Start the HTTP API server
//! - check-config: Validate configuration and print it with secrets redacted

mod args;
mod commands;
mod errors;
mod logging;

pub use args::{Cli, Command};
pub use commands::{check_config, run, run_command, serve};
pub use errors::{CliError, CliResult};
pub use logging::init_tracing;
