//! # Configuration
//!
//! Everything is read from the environment once at startup.
//!
//! | Variable           | Default                 |
//! |--------------------|-------------------------|
//! | `RUST_PORT`        | `3000`                  |
//! | `BACKEND_BASE_URL` | `http://localhost:5000` |
//! | `APP_ENV`          | `development`           |
//!
//! `BACKEND_BASE_URL` is the `backendBaseUrl` option: it overrides the host,
//! port and optional path prefix of the Backend Job Service for every proxy route.
use std::{env, fmt::Display, str::FromStr};

use reqwest::Url;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_BACKEND_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_APP_ENV: &str = "development";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend_base_url: Url,
    pub app_env: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// Same as [`Config::load`] but reads variables through `lookup`.
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = try_load(&lookup, "RUST_PORT", DEFAULT_PORT)?;

        let raw_url: String = try_load(&lookup, "BACKEND_BASE_URL", DEFAULT_BACKEND_BASE_URL)?;
        let backend_base_url = parse_base_url(&raw_url)?;

        let app_env = try_load(&lookup, "APP_ENV", DEFAULT_APP_ENV)?;

        Ok(Self {
            port,
            backend_base_url,
            app_env,
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");

        ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }
    })
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: "BACKEND_BASE_URL",
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }

    // rules out `mailto:`-style urls that can't carry path segments
    if url.cannot_be_a_base() {
        return Err(invalid("url cannot be a base".to_string()));
    }

    Ok(url)
}
