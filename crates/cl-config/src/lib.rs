//! # cl-config
//!
//! Layered runtime configuration for crumblog.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. `crumblog.toml` in the working directory (optional), or the file named by
//!    `CRUMBLOG_CONFIG` (required when set)
//! 3. `CRUMBLOG__<SECTION>__<KEY>` environment variables, e.g. `CRUMBLOG__SERVER__PORT=9000`
//!
//! A `.env` file is read into the process environment before layering.

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

pub const ENV_PREFIX: &str = "CRUMBLOG";
pub const CONFIG_PATH_VAR: &str = "CRUMBLOG_CONFIG";
const DEFAULT_FILE: &str = "crumblog";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Bootstrap administrator, created on startup when absent.
    pub admin: Option<AdminConfig>,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub backend: Backend,
    /// Only read by the sqlite backend.
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogConfig {
    /// JSON file replacing the built-in bread catalog.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl AppConfig {
    /// Loads `.env`, then layers defaults, file and environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        let path = std::env::var(CONFIG_PATH_VAR).ok();
        let builder = match path.as_deref() {
            Some(path) => {
                debug!(path, "reading configuration file");
                defaults()?.add_source(File::with_name(path).required(true))
            }
            None => defaults()?.add_source(File::with_name(DEFAULT_FILE).required(false)),
        };
        Self::finish(builder.add_source(environment()))
    }

    /// Defaults overlaid with a TOML document. Environment is not consulted.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::finish(defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self, ConfigError> {
        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.database.backend == Backend::Sqlite && self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database.url is required for the sqlite backend".into(),
            ));
        }
        if let Some(admin) = &self.admin {
            if admin.username.trim().is_empty() || admin.email.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "admin.username and admin.email must be non-empty".into(),
                ));
            }
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("database.backend", "memory")?
        .set_default("database.url", "sqlite://crumblog.db")?
        .set_default("log.filter", "info,tower_http=debug")?
        .set_default("log.json", false)?)
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_apply_without_sources() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.server.addr(), "127.0.0.1:8080");
        assert_eq!(cfg.database.backend, Backend::Memory);
        assert_eq!(cfg.database.url, "sqlite://crumblog.db");
        assert!(cfg.catalog.path.is_none());
        assert!(cfg.admin.is_none());
        assert_eq!(cfg.log.filter, "info,tower_http=debug");
        assert!(!cfg.log.json);
    }

    #[test]
    fn file_overrides_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9090

            [database]
            backend = "sqlite"
            url = "sqlite::memory:"

            [catalog]
            path = "breads.json"

            [admin]
            username = "baker"
            email = "baker@example.com"
            password = "letmein"

            [log]
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.database.backend, Backend::Sqlite);
        assert_eq!(cfg.catalog.path, Some(PathBuf::from("breads.json")));
        let admin = cfg.admin.unwrap();
        assert_eq!(admin.username, "baker");
        assert_eq!(admin.password.expose_secret(), "letmein");
        assert!(cfg.log.json);
    }

    #[test]
    fn admin_password_is_redacted_in_debug_output() {
        let cfg = AppConfig::from_toml_str(
            "[admin]\nusername = \"baker\"\nemail = \"b@example.com\"\npassword = \"hunter22\"\n",
        )
        .unwrap();
        assert!(!format!("{cfg:?}").contains("hunter22"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = AppConfig::from_toml_str("[database]\nbackend = \"postgres\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn zero_port_is_invalid() {
        let err = AppConfig::from_toml_str("[server]\nport = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
