//! Configuration management
//!
//! Configuration is loaded from `config.yml` and then overridden by
//! environment variables. Missing values are filled with defaults, so the
//! server starts with no configuration file at all.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
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

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/slackers.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// How long an issued auth token stays valid
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_days: default_token_ttl_days(),
        }
    }
}

fn default_token_ttl_days() -> i64 {
    7
}

/// Longest token lifetime accepted from configuration
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

impl AuthConfig {
    /// Reject token lifetimes that would issue dead or unrepresentable tokens
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&self.token_ttl_days) {
            return Err(ConfigError::InvalidValue {
                field: "auth.token_ttl_days",
                message: format!(
                    "must be between 1 and {}, got {}",
                    MAX_TOKEN_TTL_DAYS, self.token_ttl_days
                ),
            });
        }
        Ok(())
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. A file that
    /// exists but is not valid YAML is an error.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.auth.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognized variables:
    /// - SLACKERS_SERVER_HOST
    /// - SLACKERS_SERVER_PORT (or PORT)
    /// - SLACKERS_SERVER_CORS_ORIGIN
    /// - SLACKERS_DATABASE_DRIVER
    /// - SLACKERS_DATABASE_URL
    /// - SLACKERS_AUTH_TOKEN_TTL_DAYS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.auth.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SLACKERS_SERVER_HOST") {
            self.server.host = host;
        }
        // PORT is what most hosting platforms hand out
        for key in ["SLACKERS_SERVER_PORT", "PORT"] {
            if let Some(port) = std::env::var(key).ok().and_then(|p| p.parse::<u16>().ok()) {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("SLACKERS_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("SLACKERS_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("SLACKERS_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("SLACKERS_AUTH_TOKEN_TTL_DAYS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                if (1..=MAX_TOKEN_TTL_DAYS).contains(&ttl) {
                    self.auth.token_ttl_days = ttl;
                }
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn driver_strategy() -> impl Strategy<Value = DatabaseDriver> {
        prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Mysql)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn config_yaml_roundtrip(
            host in "[a-z]{1,10}\\.[a-z]{2,5}",
            port in 1u16..=65535,
            driver in driver_strategy(),
            url in "data/[a-z]{1,10}\\.db",
            ttl in 1i64..365,
        ) {
            let config = Config {
                server: ServerConfig { host: host.clone(), port, cors_origin: default_cors_origin() },
                database: DatabaseConfig { driver, url: url.clone() },
                auth: AuthConfig { token_ttl_days: ttl },
            };
            let yaml = serde_yaml::to_string(&config).unwrap();
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(parsed.server.host, host);
            prop_assert_eq!(parsed.server.port, port);
            prop_assert_eq!(parsed.database.driver, driver);
            prop_assert_eq!(parsed.database.url, url);
            prop_assert_eq!(parsed.auth.token_ttl_days, ttl);
        }
    }
}
