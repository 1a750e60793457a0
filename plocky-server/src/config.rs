//! Server configuration read from the environment.

use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};
use plocky_provider_kakao::DEFAULT_BASE_URL;
use tracing::info;

/// Database used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://plocky.db";

/// Runtime settings for the HTTP server and the geocoder client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Kakao REST API key sent with every geocoding request.
    pub kakao_api_key: String,
    /// Kakao API host.
    pub kakao_base_url: String,
    /// Upper bound for a single geocoding request.
    pub geocoder_timeout: Duration,
    /// SQLite database location, e.g. `sqlite://plocky.db` or `sqlite::memory:`.
    pub database_url: String,
}

impl Config {
    /// Load from process environment variables.
    ///
    /// # Errors
    ///
    /// Fails when `KAKAO_REST_API_KEY` is missing or a value does not parse.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Fails when `KAKAO_REST_API_KEY` is missing or a value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs: u64 = try_load(&lookup, "GEOCODER_TIMEOUT_SECS", "5")?;
        Ok(Self {
            port: try_load(&lookup, "PLOCKY_PORT", "8080")?,
            kakao_api_key: require(&lookup, "KAKAO_REST_API_KEY")?,
            kakao_base_url: try_load(&lookup, "KAKAO_BASE_URL", DEFAULT_BASE_URL)?,
            geocoder_timeout: Duration::from_secs(timeout_secs),
            database_url: try_load(&lookup, "DATABASE_URL", DEFAULT_DATABASE_URL)?,
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });
    raw.trim()
        .parse()
        .map_err(|err| anyhow!("Invalid {key} value {raw:?}: {err}"))
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .with_context(|| format!("Environment variable {key} is required"))
}
