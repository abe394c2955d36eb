//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// How the tournament champion is determined during an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChampionSource {
    /// Scrape the public standings page for the first-place row
    #[default]
    StandingsPage,

    /// Use the `final_rank` reported by the participants endpoint
    FinalRank,
}

/// Tournament bracket service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketConfig {
    /// Base URL of the bracket REST API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Base URL of the public tournament pages
    #[serde(default = "default_site_base")]
    pub site_base: String,

    /// API username (overridden by `CHALLONGE_USERNAME`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Timeout in seconds for outbound requests
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub champion_source: ChampionSource,
}

fn default_api_base() -> String {
    "https://api.challonge.com/v1".to_string()
}

fn default_site_base() -> String {
    "https://challonge.com".to_string()
}

fn default_api_key_env() -> String {
    "CHALLONGE_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            site_base: default_site_base(),
            username: None,
            api_key_env: default_api_key_env(),
            timeout_seconds: default_timeout(),
            champion_source: ChampionSource::default(),
        }
    }
}

impl BracketConfig {
    /// Resolve the API username, preferring the environment.
    pub fn resolve_username(&self) -> Option<String> {
        std::env::var("CHALLONGE_USERNAME")
            .ok()
            .filter(|u| !u.is_empty())
            .or_else(|| self.username.clone())
    }

    /// Resolve the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://deck-stats.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub bracket: BracketConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            bracket: BracketConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Database URL must not be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }

        if self.bracket.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Bracket timeout must be greater than 0".to_string(),
            ));
        }

        if self.bracket.api_base.trim().is_empty() || self.bracket.site_base.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Bracket api_base and site_base must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite://deck-stats.db");
        assert_eq!(config.bracket.champion_source, ChampionSource::StandingsPage);
    }

    #[test]
    fn test_bracket_config_default() {
        let bracket = BracketConfig::default();

        assert_eq!(bracket.api_base, "https://api.challonge.com/v1");
        assert_eq!(bracket.site_base, "https://challonge.com");
        assert_eq!(bracket.api_key_env, "CHALLONGE_API_KEY");
        assert_eq!(bracket.timeout_seconds, 30);
        assert!(bracket.username.is_none());
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.bracket.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_pool_size() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"

[bracket]
champion_source = "final_rank"
username = "organizer"
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bracket.champion_source, ChampionSource::FinalRank);
        assert_eq!(config.bracket.username.as_deref(), Some("organizer"));
        // Untouched sections keep their defaults
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 0").unwrap();

        assert!(matches!(
            AppConfig::from_file(file.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.database.url, parsed.database.url);
        assert_eq!(config.bracket.api_base, parsed.bracket.api_base);
    }
}
