//! Application Configuration
//!
//! Server, hosted backend, token and adapter settings. Read from an
//! optional TOML file, then overridden by environment variables.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::auth::jwt::JwtConfig;
use crate::rest_api::adapter::AdapterConfig;

/// Environment variables that override file settings
pub const ENV_BACKEND_URL: &str = "NEXT_PUBLIC_SUPABASE_URL";
pub const ENV_SERVICE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const ENV_JWT_SECRET: &str = "JWT_SECRET_KEY";
pub const ENV_HOST: &str = "MUN_HOST";
pub const ENV_PORT: &str = "MUN_PORT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub adapter: AdapterConfig,
}

impl AppConfig {
    /// File (if given) plus process environment
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in production)
    pub fn with_env<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Some(key) = lookup(ENV_SERVICE_KEY) {
            self.backend.service_key = key;
        }
        if let Some(secret) = lookup(ENV_JWT_SECRET) {
            self.auth.jwt_secret = secret;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_PORT,
                value: port,
            })?;
        }
        Ok(self)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 5000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty means any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(), // Next.js dev server
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Hosted backend location and service credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub service_key: String,
}

/// Token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,

    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_issuer")]
    pub audience: String,
}

fn default_jwt_secret() -> String {
    JwtConfig::default().secret
}

fn default_access_ttl() -> i64 {
    3600
}

fn default_refresh_ttl() -> i64 {
    30 * 24 * 3600
}

fn default_issuer() -> String {
    "munconnect".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
            issuer: default_issuer(),
            audience: default_issuer(),
        }
    }
}

impl AuthConfig {
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.jwt_secret.clone(),
            access_token_ttl: Duration::seconds(self.access_token_ttl_secs),
            refresh_token_ttl: Duration::seconds(self.refresh_token_ttl_secs),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
        }
    }
}

/// Rate limiting switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.auth.jwt_config().access_token_ttl, Duration::hours(1));
        assert_eq!(
            config.adapter.columns_for("unknown_table"),
            vec!["id".to_string()]
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = HttpServerConfig::with_port(8080);
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
port = 9000

[backend]
url = "https://abc.supabase.co"

[rate_limit]
enabled = false

[adapter.fallback_columns]
speeches = ["id", "title"]
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.backend.url, "https://abc.supabase.co");
        assert!(!config.rate_limit.enabled);
        assert_eq!(
            config.adapter.columns_for("speeches"),
            vec!["id".to_string(), "title".to_string()]
        );
    }

    #[test]
    fn test_bad_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server]\nport = \"nope\"").unwrap();

        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let missing = AppConfig::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BACKEND_URL, "https://env.supabase.co"),
            (ENV_SERVICE_KEY, "service"),
            (ENV_JWT_SECRET, "s3cret"),
            (ENV_PORT, "7000"),
        ]);

        let config = AppConfig::default()
            .with_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.backend.url, "https://env.supabase.co");
        assert_eq!(config.backend.service_key, "service");
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn test_bad_port_env() {
        let result = AppConfig::default().with_env(|k| (k == ENV_PORT).then(|| "abc".to_string()));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: ENV_PORT, .. })
        ));
    }
}
