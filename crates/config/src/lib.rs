//! Client configuration.
//!
//! Reads JSON at `~/.config/lfs-transfer/config.json` (or `%APPDATA%` on
//! Windows). Environment variables override individual fields:
//! - `LFS_URL`: base API URL
//! - `LFS_TIMEOUT_SECS`: request timeout in seconds

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use lfs_protocol::constants::OBJECTS_PATH;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the base API URL.
pub const ENV_URL: &str = "LFS_URL";

/// Environment variable overriding the request timeout.
pub const ENV_TIMEOUT_SECS: &str = "LFS_TIMEOUT_SECS";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no API URL configured")]
    MissingUrl,

    #[error("invalid API URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// On-disk config format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
}

/// Transfer client configuration.
#[derive(Debug, Clone)]
pub struct LfsConfig {
    /// Base URL of the object API, e.g. `https://git.example.com/repo.git/info/lfs`.
    pub url: String,

    /// Static credential headers sent with each negotiation request.
    pub headers: BTreeMap<String, String>,

    /// Per-request timeout handed to the HTTP transport.
    pub timeout: Duration,

    file_path: Option<PathBuf>,
}

impl Default for LfsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            file_path: None,
        }
    }
}

impl LfsConfig {
    /// Creates a config for `url` with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Adds a static header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Loads the default config file, then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&config_file_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads configuration from `path`.
    ///
    /// A missing file yields defaults. A file that does not parse is logged
    /// and also yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = LfsConfig {
            file_path: Some(path.to_path_buf()),
            ..Default::default()
        };

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match serde_json::from_str::<ConfigFile>(&content) {
                Ok(file) => {
                    config.url = file.url;
                    config.headers = file.headers;
                    if let Some(secs) = file.timeout_secs.filter(|s| *s > 0) {
                        config.timeout = Duration::from_secs(secs);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to parse LFS config, using defaults"
                    );
                }
            }
        }

        Ok(config)
    }

    /// Applies overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_URL).filter(|u| !u.is_empty()) {
            tracing::debug!(url = %url, "API URL overridden from environment");
            self.url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "ignoring invalid timeout override"),
            }
        }
    }

    /// Saves configuration to the file it was loaded from (or the default path).
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = self.file_path.clone().unwrap_or_else(config_file_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = ConfigFile {
            url: self.url.clone(),
            headers: self.headers.clone(),
            timeout_secs: Some(self.timeout.as_secs()),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&path, json)?;
        set_permissions_0600(&path);

        tracing::debug!(path = %path.display(), "LFS configuration saved");
        Ok(())
    }

    /// Checks that the URL is an absolute http(s) URL and headers are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        let parsed = url::Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        for (name, value) in &self.headers {
            parse_header(name, value)?;
        }
        Ok(())
    }

    /// URL of the negotiation endpoint: `<url>/objects`.
    pub fn objects_url(&self) -> String {
        format!("{}/{OBJECTS_PATH}", self.url.trim_end_matches('/'))
    }
}

/// Parses one header pair with the rules the HTTP transport applies.
///
/// Used for configured headers and for headers a server attaches to a link.
pub fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason,
    };
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    Ok((header_name, header_value))
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn config_file_path() -> PathBuf {
    config_base_dir().join("lfs-transfer").join("config.json")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}
