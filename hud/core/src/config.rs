//! Companion Configuration
//!
//! Settings are layered from several sources. Later layers win:
//!
//! 1. Default values
//! 2. TOML configuration file (`$XDG_CONFIG_HOME/aozora-companion/config.toml`)
//! 3. Environment variables
//! 4. CLI arguments ([`ConfigOverrides`])
//!
//! # Example Configuration
//!
//! ```toml
//! [archive]
//! base_url = "https://api.sbox.studio/api/aozora-bunko"
//! search_limit = 100
//! request_timeout_secs = 15
//!
//! [search]
//! debounce_ms = 300
//! throttle_ms = 800
//!
//! [bridge]
//! handshake_timeout_ms = 2500
//!
//! [storage]
//! data_dir = "/home/me/.local/share/aozora-companion"
//! ```
//!
//! A missing file is not an error. A file that exists but cannot be read or
//! parsed is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::{repository::DEFAULT_SEARCH_LIMIT, DEFAULT_API_BASE_URL};
use crate::handshake::DEFAULT_HANDSHAKE_TIMEOUT;
use crate::progress::FileStore;
use crate::search::{DEFAULT_DEBOUNCE, DEFAULT_THROTTLE};

/// Default per-request timeout for archive calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub const ENV_API_BASE_URL: &str = "AOZORA_API_BASE_URL";
pub const ENV_SEARCH_LIMIT: &str = "AOZORA_SEARCH_LIMIT";
pub const ENV_SEARCH_DEBOUNCE_MS: &str = "AOZORA_SEARCH_DEBOUNCE_MS";
pub const ENV_SEARCH_THROTTLE_MS: &str = "AOZORA_SEARCH_THROTTLE_MS";
pub const ENV_HANDSHAKE_TIMEOUT_MS: &str = "HUD_HANDSHAKE_TIMEOUT_MS";
pub const ENV_DATA_DIR: &str = "AOZORA_DATA_DIR";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value is present but unusable
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Where the highest-priority value in a configuration came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default
    #[default]
    Default,
    /// TOML configuration file
    File,
    /// Environment variable
    Env,
    /// Command-line argument
    Cli,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Cli => write!(f, "CLI"),
            ConfigSource::Env => write!(f, "environment"),
            ConfigSource::File => write!(f, "config file"),
            ConfigSource::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[archive]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveToml {
    pub base_url: Option<String>,
    pub search_limit: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

/// `[search]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchToml {
    pub debounce_ms: Option<u64>,
    pub throttle_ms: Option<u64>,
}

/// `[bridge]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeToml {
    pub handshake_timeout_ms: Option<u64>,
}

/// `[storage]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageToml {
    pub data_dir: Option<PathBuf>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionToml {
    pub archive: ArchiveToml,
    pub search: SearchToml,
    pub bridge: BridgeToml,
    pub storage: StorageToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Values supplied on the command line
///
/// `None` leaves the lower layers untouched.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
}

/// Fully resolved companion configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanionConfig {
    /// Archive API root, without a trailing slash
    pub api_base_url: String,

    /// `limit` passed to archive searches
    pub search_limit: usize,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Quiet period before a search query is issued
    pub search_debounce: Duration,

    /// Minimum spacing between issued searches
    pub search_throttle: Duration,

    /// How long to wait for the device bridge
    pub handshake_timeout: Duration,

    /// Directory holding persisted reading progress
    pub data_dir: Option<PathBuf>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            search_debounce: DEFAULT_DEBOUNCE,
            search_throttle: DEFAULT_THROTTLE,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            data_dir: FileStore::default_dir(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl CompanionConfig {
    /// Highest-priority layer that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    fn touch(&mut self, source: ConfigSource) {
        self.source = self.source.max(source);
    }

    /// Apply a parsed TOML file
    pub fn apply_toml(&mut self, toml: &CompanionToml) {
        let before = self.clone();

        if let Some(url) = &toml.archive.base_url {
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(limit) = toml.archive.search_limit {
            self.search_limit = limit;
        }
        if let Some(secs) = toml.archive.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = toml.search.debounce_ms {
            self.search_debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = toml.search.throttle_ms {
            self.search_throttle = Duration::from_millis(ms);
        }
        if let Some(ms) = toml.bridge.handshake_timeout_ms {
            self.handshake_timeout = Duration::from_millis(ms);
        }
        if let Some(dir) = &toml.storage.data_dir {
            self.data_dir = Some(dir.clone());
        }

        if *self != before {
            self.touch(ConfigSource::File);
        }
    }

    /// Apply environment overrides read through `lookup`
    ///
    /// Unparsable numeric values are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            self.api_base_url = url.trim_end_matches('/').to_string();
            self.touch(ConfigSource::Env);
        }
        if let Some(limit) = parse_env::<usize>(&lookup, ENV_SEARCH_LIMIT) {
            self.search_limit = limit;
            self.touch(ConfigSource::Env);
        }
        if let Some(ms) = parse_env::<u64>(&lookup, ENV_SEARCH_DEBOUNCE_MS) {
            self.search_debounce = Duration::from_millis(ms);
            self.touch(ConfigSource::Env);
        }
        if let Some(ms) = parse_env::<u64>(&lookup, ENV_SEARCH_THROTTLE_MS) {
            self.search_throttle = Duration::from_millis(ms);
            self.touch(ConfigSource::Env);
        }
        if let Some(ms) = parse_env::<u64>(&lookup, ENV_HANDSHAKE_TIMEOUT_MS) {
            self.handshake_timeout = Duration::from_millis(ms);
            self.touch(ConfigSource::Env);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
            self.touch(ConfigSource::Env);
        }
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.api_base_url {
            self.api_base_url = url.trim_end_matches('/').to_string();
            self.touch(ConfigSource::Cli);
        }
        if let Some(dir) = &overrides.data_dir {
            self.data_dir = Some(dir.clone());
            self.touch(ConfigSource::Cli);
        }
    }

    /// Reject values no component can work with
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "archive base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.search_limit == 0 {
            return Err(ConfigError::ValidationError(
                "archive search_limit must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "archive request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment value");
            None
        }
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// `$XDG_CONFIG_HOME/aozora-companion/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("aozora-companion").join("config.toml"))
}

/// Read and parse one TOML file
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn read_toml(path: &Path) -> Result<Option<CompanionToml>, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Some(toml::from_str(&content)?))
}

/// Load configuration from all layers
///
/// `path` of `None` skips the file layer. Environment variables come from
/// the process environment.
///
/// # Errors
///
/// Returns an error if the config file cannot be parsed or the merged
/// result fails validation.
pub fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<CompanionConfig, ConfigError> {
    load_config_with_env(path, overrides, |key| std::env::var(key).ok())
}

/// [`load_config`] with an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_with_env<F>(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
    lookup: F,
) -> Result<CompanionConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = CompanionConfig::default();

    if let Some(path) = path {
        if let Some(toml) = read_toml(path)? {
            config.apply_toml(&toml);
            config.config_file_path = Some(path.to_path_buf());
            tracing::info!(path = %path.display(), "Loaded configuration from file");
        }
    }

    config.apply_env(lookup);
    config.apply_overrides(overrides);
    config.validate()?;

    tracing::debug!(source = %config.source(), base_url = %config.api_base_url, "Configuration resolved");
    Ok(config)
}
