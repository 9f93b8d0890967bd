//! CLI command implementations

use std::path::Path;

use serde_json::json;
use tracing::{info, warn};

use crate::auth::JwtConfig;
use crate::http_server::{AppConfig, AppState, HttpServer};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::logging::init_tracing;

/// Main CLI entry point
///
/// Parses arguments, installs logging and dispatches to the command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.json_logs);
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve {
            config,
            port,
            in_memory,
        } => serve(config.as_deref(), port, in_memory),
        Command::CheckConfig { config } => check_config(config.as_deref()),
    }
}

/// Settings that would break or weaken a deployment
fn config_warnings(config: &AppConfig, in_memory: bool) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.auth.jwt_secret == JwtConfig::default().secret {
        warnings.push("JWT secret is the built-in default; set JWT_SECRET_KEY".to_string());
    }
    if !in_memory && (config.backend.url.is_empty() || config.backend.service_key.is_empty()) {
        warnings.push(
            "hosted backend URL or service key missing; set NEXT_PUBLIC_SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY"
                .to_string(),
        );
    }
    if !config.rate_limit.enabled {
        warnings.push("rate limiting is disabled".to_string());
    }
    warnings
}

/// Start the HTTP API server
pub fn serve(config_path: Option<&Path>, port: Option<u16>, in_memory: bool) -> CliResult<()> {
    let mut config = AppConfig::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    for warning in config_warnings(&config, in_memory) {
        warn!("{}", warning);
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let state = if in_memory {
            AppState::in_memory(&config)
        } else {
            AppState::hosted(&config)
        };
        let server = HttpServer::new(config.server.clone(), state);
        info!(addr = %server.socket_addr(), "starting MUN Connect API");

        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Print the effective configuration (secrets redacted) and its warnings
pub fn check_config(config_path: Option<&Path>) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;
    let warnings = config_warnings(&config, false);

    let report = json!({
        "server": config.server,
        "backend": {
            "url": config.backend.url,
            "service_key_set": !config.backend.service_key.is_empty(),
        },
        "auth": {
            "access_token_ttl_secs": config.auth.access_token_ttl_secs,
            "refresh_token_ttl_secs": config.auth.refresh_token_ttl_secs,
            "issuer": config.auth.issuer,
        },
        "rate_limit": config.rate_limit,
        "warnings": warnings,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
