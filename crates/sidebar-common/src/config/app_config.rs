//! Environment-driven application configuration

use std::env;
use std::str::FromStr;

use serde::Deserialize;

/// Top-level configuration, assembled from the process environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    /// Snowflake worker ID for this process
    pub worker_id: u16,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            other => Err(ConfigError::InvalidValue("APP_ENV", other.to_string())),
        }
    }
}

/// Database settings shared with the pool builder
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_min_connections")]
    pub min_connections: u32,
}

impl DatabaseSettings {
    fn default_max_connections() -> u32 {
        20
    }

    fn default_min_connections() -> u32 {
        5
    }
}

impl AppConfig {
    /// Load configuration from environment variables, reading a `.env` file
    /// first when one is present.
    ///
    /// # Errors
    /// `MissingVar` when `DATABASE_URL` is unset; `InvalidValue` when an
    /// optional variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let env = match env::var("APP_ENV") {
            Ok(value) => value.parse()?,
            Err(_) => Environment::default(),
        };

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| "sidebar-engine".to_string()),
                env,
            },
            database: DatabaseSettings {
                url: env::var("DATABASE_URL")
                    .map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: parsed_var("DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(DatabaseSettings::default_max_connections),
                min_connections: parsed_var("DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(DatabaseSettings::default_min_connections),
            },
            worker_id: parsed_var("WORKER_ID")?.unwrap_or(0),
        })
    }
}

/// Parse an optional environment variable, erroring on malformed values
/// instead of silently falling back.
fn parsed_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
