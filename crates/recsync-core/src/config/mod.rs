//! Client configuration.
//!
//! Built from environment-style key lookups so hosts (and tests) can inject
//! their own source. Every value is optional; an unset base URL means the
//! controller runs in local-only mode against the on-disk mirror.

use std::collections::HashMap;
use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::util::normalize_text_option;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(8_000);
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const DEFAULT_SAVE_TIMEOUT: Duration = Duration::from_millis(10_000);

const POLL_INTERVAL_RANGE_SECS: RangeInclusive<u64> = 1..=3_600;
const TIMEOUT_RANGE_MS: RangeInclusive<u64> = 100..=120_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for crate::Error {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}

/// Upper bounds for each remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    pub fetch: Duration,
    pub check: Duration,
    pub save: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            fetch: DEFAULT_FETCH_TIMEOUT,
            check: DEFAULT_CHECK_TIMEOUT,
            save: DEFAULT_SAVE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Remote base URL without trailing slash; `None` for local-only mode
    pub api_base_url: Option<String>,
    /// Period between staleness checks
    pub poll_interval: Duration,
    pub timeouts: RequestTimeouts,
    /// Directory holding the local snapshot mirror files
    pub data_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeouts: RequestTimeouts::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = optional_trimmed(&lookup, "RECSYNC_API_BASE_URL")
            .map(normalize_base_url)
            .transpose()?;

        let poll_interval = Duration::from_secs(bounded(
            &lookup,
            "RECSYNC_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL.as_secs(),
            &POLL_INTERVAL_RANGE_SECS,
        )?);

        let timeouts = RequestTimeouts {
            fetch: timeout_ms(&lookup, "RECSYNC_FETCH_TIMEOUT_MS", DEFAULT_FETCH_TIMEOUT)?,
            check: timeout_ms(&lookup, "RECSYNC_CHECK_TIMEOUT_MS", DEFAULT_CHECK_TIMEOUT)?,
            save: timeout_ms(&lookup, "RECSYNC_SAVE_TIMEOUT_MS", DEFAULT_SAVE_TIMEOUT)?,
        };

        let data_dir =
            optional_trimmed(&lookup, "RECSYNC_DATA_DIR").map_or_else(default_data_dir, PathBuf::from);

        Ok(Self {
            api_base_url,
            poll_interval,
            timeouts,
            data_dir,
        })
    }

    /// Override the remote base URL (e.g. from a command-line flag).
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        self.api_base_url = Some(normalize_base_url(url.into())?);
        Ok(self)
    }

    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub const fn is_local_only(&self) -> bool {
        self.api_base_url.is_none()
    }
}

/// Default directory for mirror files.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recsync")
}

pub(crate) fn normalize_base_url(raw: String) -> Result<String, ConfigError> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| ConfigError::Invalid("API base URL must not be empty".to_string()))?;
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(ConfigError::Invalid(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

fn timeout_ms(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    bounded(lookup, name, default_ms, &TIMEOUT_RANGE_MS).map(Duration::from_millis)
}

fn bounded(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    range: &RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let Some(raw) = optional_trimmed(lookup, name) else {
        return Ok(default);
    };
    let value = raw.parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!(
            "{name} must be an integer in [{}, {}]",
            range.start(),
            range.end()
        ))
    })?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )))
    }
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn from_map(map: &HashMap<&str, &str>) -> Result<ClientConfig, ConfigError> {
        ClientConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn empty_environment_yields_local_only_defaults() {
        let config = from_map(&HashMap::new()).unwrap();
        assert!(config.is_local_only());
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.timeouts, RequestTimeouts::default());
        assert_eq!(config.timeouts.fetch, Duration::from_millis(8_000));
        assert_eq!(config.timeouts.check, Duration::from_millis(5_000));
        assert_eq!(config.timeouts.save, Duration::from_millis(10_000));
    }

    #[test]
    fn base_url_is_trimmed_and_validated() {
        let mut map = HashMap::new();
        map.insert("RECSYNC_API_BASE_URL", " https://api.example.com/ ");
        let config = from_map(&map).unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("https://api.example.com"));

        map.insert("RECSYNC_API_BASE_URL", "api.example.com");
        let error = from_map(&map).unwrap_err();
        assert!(error.to_string().contains("http://"));
    }

    #[test]
    fn out_of_range_values_name_the_variable() {
        let mut map = HashMap::new();
        map.insert("RECSYNC_POLL_INTERVAL_SECS", "0");
        let error = from_map(&map).unwrap_err();
        assert!(error.to_string().contains("RECSYNC_POLL_INTERVAL_SECS"));

        let mut map = HashMap::new();
        map.insert("RECSYNC_SAVE_TIMEOUT_MS", "soon");
        let error = from_map(&map).unwrap_err();
        assert!(error.to_string().contains("RECSYNC_SAVE_TIMEOUT_MS"));
    }

    #[test]
    fn overrides_apply_on_top_of_environment() {
        let mut map = HashMap::new();
        map.insert("RECSYNC_DATA_DIR", "/tmp/recsync-env");
        map.insert("RECSYNC_CHECK_TIMEOUT_MS", "250");
        let config = from_map(&map)
            .unwrap()
            .with_api_base_url("http://localhost:3000")
            .unwrap()
            .with_data_dir("/tmp/recsync-flag");

        assert_eq!(config.api_base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/recsync-flag"));
        assert_eq!(config.timeouts.check, Duration::from_millis(250));
    }
}
