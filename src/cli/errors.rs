//! CLI-specific error types
//!
//! Every CLI error is fatal: main prints it and exits non-zero.

use thiserror::Error;

use crate::http_server::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("MUN_CLI_CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    #[error("MUN_CLI_BOOT_FAILED: {0}")]
    BootFailed(String),

    #[error("MUN_CLI_IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("MUN_CLI_IO_ERROR: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn boot_failed(msg: impl Into<String>) -> Self {
        CliError::BootFailed(msg.into())
    }

    /// Stable code prefix for scripts
    pub fn code_str(&self) -> &'static str {
        match self {
            CliError::Config(_) => "MUN_CLI_CONFIG_ERROR",
            CliError::BootFailed(_) => "MUN_CLI_BOOT_FAILED",
            CliError::Io(_) | CliError::Json(_) => "MUN_CLI_IO_ERROR",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let err = CliError::boot_failed("no runtime");
        assert_eq!(err.code_str(), "MUN_CLI_BOOT_FAILED");
        assert_eq!(err.to_string(), "MUN_CLI_BOOT_FAILED: no runtime");
    }
}
