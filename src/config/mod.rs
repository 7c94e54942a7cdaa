//! Configuration types for the client, loaded from an optional TOML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for file transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Maximum number of bytes written per progress step.
    pub chunk_size: usize,
    /// Time budget for a single file, from link resolution to rename.
    pub file_timeout_secs: u64,
    /// Time budget for metadata calls (listing, link resolution).
    pub metadata_timeout_secs: u64,
    /// Whether to clean up `.part` files on download error.
    pub cleanup_on_error: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 32 * 1024,
            file_timeout_secs: 30,
            metadata_timeout_secs: 5,
            cleanup_on_error: true,
        }
    }
}

impl TransferConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the write chunk size in bytes.
    #[must_use]
    pub const fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Sets the per-file time budget.
    #[must_use]
    pub const fn with_file_timeout(mut self, timeout: Duration) -> Self {
        self.file_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the metadata call time budget.
    #[must_use]
    pub const fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets whether to clean up `.part` files on download error.
    #[must_use]
    pub const fn with_cleanup_on_error(mut self, cleanup: bool) -> Self {
        self.cleanup_on_error = cleanup;
        self
    }

    /// Per-file time budget.
    #[must_use]
    pub const fn file_timeout(&self) -> Duration {
        Duration::from_secs(self.file_timeout_secs)
    }

    /// Metadata call time budget.
    #[must_use]
    pub const fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    /// Chunk size, never zero.
    #[must_use]
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}

/// Path configuration for downloads, credentials and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory where downloaded files are saved.
    pub download_dir: PathBuf,
    /// File holding the persisted access token.
    pub token_path: PathBuf,
    /// Directory for the debug log.
    pub state_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            download_dir: PathBuf::from("."),
            token_path: cache_dir.join("seedr").join("token.json"),
            state_dir: data_dir.join("seedr-dl"),
        }
    }
}

impl PathConfig {
    /// Location of the log file used while the terminal UI owns the screen.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.state_dir.join("seedr.log")
    }
}

/// Remote service endpoints and OAuth client identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Endpoint for all resource calls (`func=...`).
    pub resource_url: String,
    /// Endpoint for password and refresh-token grants.
    pub token_url: String,
    /// Endpoint that issues device codes.
    pub device_code_url: String,
    /// Endpoint polled to exchange a device code for a token.
    pub device_authorize_url: String,
    /// Client id used for the device flow.
    pub device_client_id: String,
    /// Client id used for password and refresh grants.
    pub password_client_id: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            resource_url: "https://www.seedr.cc/oauth_test/resource.php".to_string(),
            token_url: "https://www.seedr.cc/oauth_test/token.php".to_string(),
            device_code_url: "https://www.seedr.cc/api/device/code".to_string(),
            device_authorize_url: "https://www.seedr.cc/api/device/authorize".to_string(),
            device_client_id: "seedr_xbmc".to_string(),
            password_client_id: "seedr_chrome".to_string(),
        }
    }
}

/// External programs used for clipboard and playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// Media player executable; receives the stream URL as its only argument.
    pub player: String,
    /// Clipboard commands tried in order; each reads the text on stdin.
    pub clipboard: Vec<Vec<String>>,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        let argv = |parts: &[&str]| -> Vec<String> { parts.iter().map(ToString::to_string).collect() };
        Self {
            player: "mpv".to_string(),
            clipboard: vec![
                argv(&["wl-copy"]),
                argv(&["xclip", "-selection", "clipboard"]),
                argv(&["pbcopy"]),
            ],
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Transfer configuration.
    pub transfer: TransferConfig,
    /// Path configuration.
    pub paths: PathConfig,
    /// Remote service configuration.
    pub api: ApiConfig,
    /// External program configuration.
    pub external: ExternalConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("seedr-dl")
            .join("config.toml")
    }

    /// Loads configuration from `path`, falling back to defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}
