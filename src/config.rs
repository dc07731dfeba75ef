use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const API_KEY_VAR: &str = "OPENWEATHERMAP_API_KEY";
const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org";
const DEFAULT_GEO_BASE_URL: &str = "http://ip-api.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPENWEATHERMAP_API_KEY must be set (in the environment or a .env file)")]
    MissingApiKey,

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Unit system requested from the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        Units::from_str(value, true).ok()
    }
}

/// Everything the gateway needs to talk to its upstreams.
///
/// Built once at startup; a `Config` always holds a usable API key.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub weather_base_url: String,
    pub geo_base_url: String,
    pub units: Units,
    pub timeout: Duration,
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            api_key,
            weather_base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            geo_base_url: DEFAULT_GEO_BASE_URL.to_string(),
            units: Units::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(lookup(API_KEY_VAR).unwrap_or_default())?;

        if let Some(url) = lookup("OPENWEATHERMAP_BASE_URL") {
            config.weather_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("IP_API_BASE_URL") {
            config.geo_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(units) = lookup("WEATHER_UNITS") {
            config.units = Units::parse(&units).ok_or(ConfigError::InvalidValue {
                name: "WEATHER_UNITS",
                value: units,
            })?;
        }
        if let Some(secs) = lookup("UPSTREAM_TIMEOUT_SECS") {
            let parsed = secs.parse::<u64>().ok().filter(|&s| s > 0);
            config.timeout = Duration::from_secs(parsed.ok_or(ConfigError::InvalidValue {
                name: "UPSTREAM_TIMEOUT_SECS",
                value: secs,
            })?);
        }

        Ok(config)
    }
}

/// Loads the first `.env` file found among the usual locations.
///
/// Returns the path that was loaded, if any. Variables already present in the
/// process environment win over the file.
pub fn load_env_file() -> Option<PathBuf> {
    let candidates = env_file_candidates();

    for path in &candidates {
        if !path.exists() {
            debug!(path = %path.display(), "no .env file");
            continue;
        }
        match dotenv::from_path(path) {
            Ok(()) => {
                info!(path = %path.display(), "loaded .env file");
                return Some(path.clone());
            }
            Err(e) => warn!(path = %path.display(), error = %e, "failed to load .env file"),
        }
    }

    debug!(?candidates, "no .env file found");
    None
}

fn env_file_candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".env")];

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
    {
        paths.push(exe_dir.join(".env"));
    }

    if let Ok(home) = std::env::var("HOME") {
        let home = PathBuf::from(home);
        paths.push(home.join(".weather_gateway.env"));
        paths.push(home.join(".env"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn api_key_is_required() {
        assert_eq!(
            Config::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::MissingApiKey
        );
        assert_eq!(
            Config::from_lookup(lookup(&[(API_KEY_VAR, "   ")])).unwrap_err(),
            ConfigError::MissingApiKey
        );
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[(API_KEY_VAR, "secret")])).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.weather_base_url, "https://api.openweathermap.org");
        assert_eq!(config.geo_base_url, "http://ip-api.com");
        assert_eq!(config.units, Units::Metric);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            (API_KEY_VAR, "secret"),
            ("OPENWEATHERMAP_BASE_URL", "http://127.0.0.1:9000/"),
            ("IP_API_BASE_URL", "http://127.0.0.1:9001"),
            ("WEATHER_UNITS", "Imperial"),
            ("UPSTREAM_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.weather_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.geo_base_url, "http://127.0.0.1:9001");
        assert_eq!(config.units, Units::Imperial);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = Config::from_lookup(lookup(&[(API_KEY_VAR, "k"), ("WEATHER_UNITS", "kelvin")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "WEATHER_UNITS", .. }));

        let err = Config::from_lookup(lookup(&[(API_KEY_VAR, "k"), ("UPSTREAM_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "UPSTREAM_TIMEOUT_SECS", .. }));
    }
}
