//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BELI_DATA_PROVIDER=mock                                            │
//! │     BELI_SUPABASE_URL=https://project.supabase.co                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/sync/sync.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.beli.sync/sync.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ProviderMode::Auto, no remote, SQLite store                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [provider]
//! mode = "auto"  # auto | remote | local
//! availability_ttl_secs = 30
//!
//! [remote]
//! url = "https://project.supabase.co"
//! anon_key = "eyJhbGciOi..."
//!
//! [queue]
//! max_retries = 3
//! base_backoff_ms = 1000
//! max_backoff_ms = 30000
//!
//! [storage]
//! backend = "sqlite"  # sqlite | file | memory
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use beli_core::retry::{DEFAULT_BASE_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_RETRIES};
use beli_core::{ProviderMode, RetryPolicy, AVAILABILITY_TTL_SECS, DEFAULT_STORAGE_KEY};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Provider Settings
// =============================================================================

/// Data provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Remote, local, or decided per call.
    #[serde(default)]
    pub mode: ProviderMode,

    /// How long a reachability verdict stays valid (seconds).
    #[serde(default = "default_availability_ttl")]
    pub availability_ttl_secs: u64,
}

fn default_availability_ttl() -> u64 {
    AVAILABILITY_TTL_SECS
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            mode: ProviderMode::default(),
            availability_ttl_secs: default_availability_ttl(),
        }
    }
}

impl ProviderSettings {
    pub fn availability_ttl(&self) -> Duration {
        Duration::from_secs(self.availability_ttl_secs)
    }
}

// =============================================================================
// Remote Settings
// =============================================================================

/// Remote backend endpoint and credentials.
///
/// The remote counts as configured only when both `url` and `anon_key` are
/// present and non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL of the backend project.
    #[serde(default)]
    pub url: Option<String>,

    /// Public API key sent as the `apikey` header.
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Path appended to `url` for the reachability probe.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Probe request timeout (seconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_health_path() -> String {
    "/rest/v1/".to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            url: None,
            anon_key: None,
            health_path: default_health_path(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl RemoteSettings {
    /// Creates settings for the given endpoint.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        RemoteSettings {
            url: Some(url.into()),
            anon_key: Some(anon_key.into()),
            ..Default::default()
        }
    }

    /// Returns true when both URL and key are set.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.url) && present(&self.anon_key)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

// =============================================================================
// Queue Settings
// =============================================================================

/// Mutation queue tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Key the queue snapshot is stored under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Failed attempts before a mutation is dropped.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit (milliseconds).
    #[serde(default = "default_base_backoff")]
    pub base_backoff_ms: u64,

    /// Backoff cap (milliseconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Wait after reconnecting before replaying (milliseconds).
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Wait after startup before the first replay (milliseconds).
    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_base_backoff() -> u64 {
    DEFAULT_BASE_BACKOFF_MS
}
fn default_max_backoff() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}
fn default_settle_delay() -> u64 {
    1_000
}
fn default_startup_delay() -> u64 {
    2_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            storage_key: default_storage_key(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff(),
            max_backoff_ms: default_max_backoff(),
            settle_delay_ms: default_settle_delay(),
            startup_delay_ms: default_startup_delay(),
        }
    }
}

impl QueueConfig {
    /// Builds the retry policy these settings describe.
    pub fn retry_policy(&self) -> SyncResult<RetryPolicy> {
        Ok(RetryPolicy::from_millis(
            self.max_retries,
            self.base_backoff_ms,
            self.max_backoff_ms,
        )?)
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the queue snapshot lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// SQLite database through beli-db.
    #[default]
    Sqlite,

    /// One JSON file per key in a directory.
    File,

    /// Process memory only; nothing survives a restart.
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            "file" | "json" => Ok(StorageBackend::File),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown storage backend: '{}'. Valid options: sqlite, file, memory",
                other
            ))),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database file (sqlite) or directory (file). Defaults to the platform
    /// data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageSettings {
    /// Resolves the storage path, falling back to the platform data directory.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            let dirs = directories::ProjectDirs::from("com", "beli", "sync")?;
            let data_dir = dirs.data_dir();
            Some(match self.backend {
                StorageBackend::Sqlite => data_dir.join("beli-sync.db"),
                StorageBackend::File | StorageBackend::Memory => data_dir.join("store"),
            })
        })
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| SyncError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if let Some(ref raw) = self.remote.url {
            if !raw.trim().is_empty() {
                let url = Url::parse(raw)?;
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(SyncError::InvalidUrl(format!(
                        "Remote URL must start with http:// or https://, got: {}",
                        raw
                    )));
                }
            }
        }

        if self.queue.max_retries == 0 {
            return Err(SyncError::InvalidConfig(
                "max_retries must be greater than 0".into(),
            ));
        }

        self.queue.retry_policy()?;

        if self.provider.availability_ttl_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "availability_ttl_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        // Unknown values fall back to auto rather than failing startup
        if let Ok(mode) = std::env::var("BELI_DATA_PROVIDER") {
            let parsed = mode.parse().unwrap_or_else(|_| {
                warn!(mode = %mode, "Unknown data provider in environment, using auto");
                ProviderMode::Auto
            });
            debug!(mode = %parsed, "Overriding provider mode from environment");
            self.provider.mode = parsed;
        }

        if let Ok(url) = std::env::var("BELI_SUPABASE_URL") {
            debug!(url = %url, "Overriding remote URL from environment");
            self.remote.url = Some(url);
        }

        if let Ok(key) = std::env::var("BELI_SUPABASE_ANON_KEY") {
            self.remote.anon_key = Some(key);
        }

        if let Ok(backend) = std::env::var("BELI_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => self.storage.backend = parsed,
                Err(_) => warn!(backend = %backend, "Unknown storage backend in environment"),
            }
        }

        if let Ok(path) = std::env::var("BELI_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(retries) = std::env::var("BELI_SYNC_MAX_RETRIES") {
            if let Ok(n) = retries.parse::<u32>() {
                debug!(max_retries = n, "Overriding retry ceiling from environment");
                self.queue.max_retries = n;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "beli", "sync")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn mode(&self) -> ProviderMode {
        self.provider.mode
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote.url.as_deref()
    }

    pub fn is_remote_configured(&self) -> bool {
        self.remote.is_configured()
    }
}
