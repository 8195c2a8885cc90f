use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path, str::FromStr, time::Duration};

use crate::service::WritePolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to parse {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    /// Without a database section notes are kept in memory.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub dsn: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(with = "humantime_serde", default = "default_pool_timeout")]
    pub pool_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub write_policy: WritePolicy,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

const fn default_port() -> u16 {
    8000
}

const fn default_pool_size() -> usize {
    16
}

const fn default_pool_timeout() -> Duration {
    Duration::from_secs(5)
}

const fn default_page_size() -> u32 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            write_policy: WritePolicy::default(),
            default_page_size: default_page_size(),
        }
    }
}

impl DatabaseConfig {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            pool_size: default_pool_size(),
            pool_timeout: default_pool_timeout(),
        }
    }
}

pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    serde_yaml::from_str(contents).map_err(Into::into)
}

fn read_config(path: &str) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    parse_config(&contents)
}

fn parse_var<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnv {
        name,
        reason: e.to_string(),
    })
}

/// Builds the config from variables returned by `lookup`; unset variables
/// keep their defaults.
pub fn load_from_vars<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::default();

    if let Some(port) = lookup("HTTP_PORT") {
        config.http.port = parse_var("HTTP_PORT", &port)?;
    }

    if let Some(dsn) = lookup("PG_DSN") {
        let mut database = DatabaseConfig::new(dsn);
        if let Some(size) = lookup("PG_POOL_SIZE") {
            database.pool_size = parse_var("PG_POOL_SIZE", &size)?;
        }
        config.database = Some(database);
    }

    if let Some(policy) = lookup("WRITE_POLICY") {
        config.store.write_policy = parse_var("WRITE_POLICY", &policy)?;
    }

    if let Some(size) = lookup("DEFAULT_PAGE_SIZE") {
        config.store.default_page_size = parse_var("DEFAULT_PAGE_SIZE", &size)?;
    }

    Ok(config)
}

pub fn load_config() -> Result<Config, ConfigError> {
    // Retrieve env variable
    let config_path =
        env::var("NOTES_STORE_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return read_config(&config_path);
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return read_config("config.yaml");
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'\
             \n This file should not be used and should be replaced with actual data",
            config_path
        );
        return read_config("config.example.yaml");
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    load_from_vars(|name| env::var(name).ok())
}
