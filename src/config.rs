use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use dotenv::dotenv;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_TOKEN_TTL_SECS: usize = 3600;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173";
const DEFAULT_POOL_SIZE: u32 = 10;

/** Server settings, read from the environment (and `.env` when present) */
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    /// Lifetime of a login token in seconds
    pub token_ttl_secs: usize,
    /// `*` means any origin
    pub allowed_origins: Vec<String>,
    pub db_pool_size: u32,
    pub run_migrations: bool,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "environment variable '{}' not set", key),
            ConfigError::Invalid(key, value) => {
                write!(f, "environment variable '{}' has invalid value '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Loads `.env` and builds the configuration from the process environment.
    /// Requires a `DATABASE_URL` variable, everything else has a default.
    pub fn from_env() -> Result<Config, ConfigError> {
        dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, `from_env` passes `std::env::var`
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Config {
            database_url,
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            upload_dir: PathBuf::from(
                lookup("UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string()),
            ),
            token_ttl_secs: parse_positive_or(&lookup, "TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?,
            allowed_origins,
            db_pool_size: parse_positive_or(&lookup, "DB_POOL_SIZE", DEFAULT_POOL_SIZE)?,
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", true)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid(key, value)),
        None => Ok(default),
    }
}

/// Like `parse_or`, zero is rejected as well
fn parse_positive_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + From<u8>,
{
    let value = parse_or(lookup, key, default)?;
    if value == T::from(0) {
        return Err(ConfigError::Invalid(key, String::from("0")));
    }
    Ok(value)
}
