use std::{fmt, str::FromStr};

use chrono::Duration;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use dotenvy::dotenv;

pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("JWT_SECRET is not set")]
    MissingJwtSecret,

    #[error("invalid token lifetime `{0}` (expected e.g. `3600`, `15m`, `24h`, `7d`)")]
    InvalidExpiresIn(String),

    #[error("bcrypt cost must be between 4 and 31, got {0}")]
    InvalidBcryptCost(u32),
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct JwtConfig {
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub expires_in: ExpiresIn,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_database_url() -> String {
    "sqlite://taskdesk.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_bcrypt_cost() -> u32 {
    DEFAULT_BCRYPT_COST
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Token lifetime. Accepts plain seconds (`3600`) or a number with a unit
/// suffix: `s`, `m`, `h`, `d`, `w` (`15m`, `24h`, `7d`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiresIn(pub Duration);

impl Default for ExpiresIn {
    fn default() -> Self {
        ExpiresIn(Duration::hours(24))
    }
}

impl ExpiresIn {
    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for ExpiresIn {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidExpiresIn(raw.to_string());
        let s = raw.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        let amount: i64 = digits.parse().map_err(|_| invalid())?;
        let seconds_per_unit = match unit.trim() {
            "" | "s" => 1,
            "m" => 60,
            "h" => 60 * 60,
            "d" => 24 * 60 * 60,
            "w" => 7 * 24 * 60 * 60,
            _ => return Err(invalid()),
        };
        let secs = amount.checked_mul(seconds_per_unit).ok_or_else(invalid)?;
        if secs <= 0 {
            return Err(invalid());
        }
        Duration::try_seconds(secs).map(ExpiresIn).ok_or_else(invalid)
    }
}

impl fmt::Display for ExpiresIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.num_seconds())
    }
}

impl<'de> Deserialize<'de> for ExpiresIn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Env values that look numeric arrive as integers.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seconds(u64),
            Text(String),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Seconds(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_figment(Self::figment())
    }

    /// Defaults, then `Config.toml`, then the bare variables
    /// (`MONGODB_URI`, `MONGO_URI`, `DATABASE_URL`, `PORT`, `JWT_SECRET`,
    /// `JWT_EXPIRES_IN`), then `APP_`-prefixed overrides such as
    /// `APP_DATABASE__URL`.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file("Config.toml")) // For non-sensitive defaults
            .merge(Env::raw().only(&["MONGODB_URI"]).map(|_| "database.url".into()))
            .merge(Env::raw().only(&["MONGO_URI"]).map(|_| "database.url".into()))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
            .merge(Env::raw().only(&["PORT"]).map(|_| "web.port".into()))
            .merge(Env::raw().only(&["JWT_SECRET"]).map(|_| "jwt.secret".into()))
            .merge(Env::raw().only(&["JWT_EXPIRES_IN"]).map(|_| "jwt.expires_in".into()))
            .merge(Env::prefixed("APP_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;

        tracing::info!(
            addr = %config.web.addr,
            port = config.web.port,
            database = %config.database.url,
            token_lifetime = %config.jwt.expires_in,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(self.bcrypt_cost));
        }
        Ok(())
    }
}
