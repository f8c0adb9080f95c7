//! Gateway configuration.
//!
//! Configuration comes from the process environment or from a TOML file:
//!
//! | key                              | field               | default       |
//! |----------------------------------|---------------------|---------------|
//! | `GOOGLE_PROJECT_ID`              | `project_id`        | required      |
//! | `GOOGLE_LOCATION`                | `location`          | `us-central1` |
//! | `GOOGLE_APPLICATION_CREDENTIALS` | `credentials`       | required      |
//! | `GENKIT_MODEL`                   | `model`             | `gemini-pro`  |
//! | `GENKIT_CACHE_ENABLED`           | `cache.enabled`     | `true`        |
//! | `GENKIT_CACHE_TTL`               | `cache.ttl_secs`    | `3600`        |
//! | `GENKIT_CACHE_MAX_SIZE`          | `cache.max_entries` | `100`         |
//! | `GENKIT_TIMEOUT_SECS`            | `timeout_secs`      | `60`          |
//!
//! TOML files are resolved in this order:
//! 1. Explicit path (if provided)
//! 2. `~/.genkit-gateway/config.toml`

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::{GenkitError, Result};

pub const ENV_PROJECT_ID: &str = "GOOGLE_PROJECT_ID";
pub const ENV_LOCATION: &str = "GOOGLE_LOCATION";
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_MODEL: &str = "GENKIT_MODEL";
pub const ENV_CACHE_ENABLED: &str = "GENKIT_CACHE_ENABLED";
pub const ENV_CACHE_TTL: &str = "GENKIT_CACHE_TTL";
pub const ENV_CACHE_MAX_SIZE: &str = "GENKIT_CACHE_MAX_SIZE";
pub const ENV_TIMEOUT_SECS: &str = "GENKIT_TIMEOUT_SECS";

/// Connection and caching settings for a [`GenkitClient`](crate::GenkitClient).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenkitConfig {
    /// Google Cloud project id.
    #[serde(default)]
    pub project_id: String,
    /// Service region (default: us-central1).
    #[serde(default = "default_location")]
    pub location: String,
    /// Path to a file holding an access token, or the token itself.
    #[serde(default)]
    pub credentials: String,
    /// Model used when none is given (default: gemini-pro).
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub cache: CacheSection,
    /// Transport timeout in seconds (default: 60).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// `[cache]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl From<&CacheSection> for CacheConfig {
    fn from(section: &CacheSection) -> Self {
        CacheConfig::new()
            .enabled(section.enabled)
            .ttl(Duration::from_secs(section.ttl_secs))
            .max_entries(section.max_entries)
    }
}

fn default_location() -> String {
    "us-central1".to_string()
}

fn default_model() -> String {
    "gemini-pro".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_cache_max_entries() -> u64 {
    100
}

impl GenkitConfig {
    /// Config with the two required values and defaults for everything else.
    pub fn new(project_id: impl Into<String>, credentials: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: default_location(),
            credentials: credentials.into(),
            model: default_model(),
            cache: CacheSection::default(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn cache(mut self, cache: CacheSection) -> Self {
        self.cache = cache;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Blank values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            project_id: get(ENV_PROJECT_ID).unwrap_or_default(),
            location: get(ENV_LOCATION).unwrap_or_else(default_location),
            credentials: get(ENV_CREDENTIALS).unwrap_or_default(),
            model: get(ENV_MODEL).unwrap_or_else(default_model),
            cache: CacheSection {
                enabled: parse_or(
                    ENV_CACHE_ENABLED,
                    get(ENV_CACHE_ENABLED),
                    default_cache_enabled(),
                )?,
                ttl_secs: parse_or(ENV_CACHE_TTL, get(ENV_CACHE_TTL), default_cache_ttl())?,
                max_entries: parse_or(
                    ENV_CACHE_MAX_SIZE,
                    get(ENV_CACHE_MAX_SIZE),
                    default_cache_max_entries(),
                )?,
            },
            timeout_secs: parse_or(ENV_TIMEOUT_SECS, get(ENV_TIMEOUT_SECS), default_timeout())?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.genkit-gateway/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            GenkitError::configuration("config", format!("failed to read {path:?}: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            GenkitError::configuration("config", format!("failed to parse {path:?}: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(GenkitError::configuration(
                "config",
                format!("config file not found: {path:?}"),
            ));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".genkit-gateway").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        Err(GenkitError::configuration(
            "config",
            "no config file found; create ~/.genkit-gateway/config.toml",
        ))
    }

    /// Check required values and numeric sanity.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(GenkitError::configuration(ENV_PROJECT_ID, "project id is required"));
        }
        if self.credentials.trim().is_empty() {
            return Err(GenkitError::configuration(
                ENV_CREDENTIALS,
                "credential reference is required",
            ));
        }
        if self.location.trim().is_empty() {
            return Err(GenkitError::configuration(ENV_LOCATION, "location is empty"));
        }
        if self.model.trim().is_empty() {
            return Err(GenkitError::configuration(ENV_MODEL, "model is empty"));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(GenkitError::configuration(
                ENV_CACHE_MAX_SIZE,
                "must be at least 1 when caching is enabled",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(GenkitError::configuration(ENV_TIMEOUT_SECS, "must be at least 1"));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::from(&self.cache)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the credential reference to a bearer token.
    ///
    /// An existing file is read and trimmed; anything else is used verbatim.
    pub fn access_token(&self) -> Result<String> {
        let reference = self.credentials.trim();
        let path = Path::new(reference);
        let token = if path.is_file() {
            fs::read_to_string(path)
                .map_err(|e| {
                    GenkitError::configuration(
                        ENV_CREDENTIALS,
                        format!("failed to read credentials file {path:?}: {e}"),
                    )
                })?
                .trim()
                .to_string()
        } else {
            reference.to_string()
        };
        if token.is_empty() {
            return Err(GenkitError::configuration(ENV_CREDENTIALS, "access token is empty"));
        }
        Ok(token)
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| GenkitError::configuration(key, format!("invalid value '{raw}': {e}"))),
    }
}
