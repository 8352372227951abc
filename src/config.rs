//! Runtime configuration read from the environment (`.env` is loaded first by `main`).

use thiserror::Error;

use crate::domain::value_objects::Money;

pub const DEFAULT_PORT: u16 = 8083;
pub const DEFAULT_SHIPPING_FEE: i64 = 20_000;
pub const DEFAULT_SESSION_COOKIE: &str = "gol_session";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub port: u16,
    pub nats_url: Option<String>,
    /// Flat fee added to every order.
    pub shipping_fee: Money,
    pub session_cookie: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|key| std::env::var(key).ok()) }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let shipping_fee = parse_or(&lookup, "SHIPPING_FEE", DEFAULT_SHIPPING_FEE)?;
        if shipping_fee < 0 {
            return Err(ConfigError::Invalid { key: "SHIPPING_FEE", value: shipping_fee.to_string() });
        }
        Ok(Self {
            database_url,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            nats_url: lookup("NATS_URL").filter(|v| !v.trim().is_empty()),
            shipping_fee: Money::new(shipping_fee),
            session_cookie: lookup("SESSION_COOKIE").unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
