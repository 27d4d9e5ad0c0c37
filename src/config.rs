//! Configuration for the cpod conversion tools.
//!
//! Two pieces live here:
//!
//! - [`ConfigDir`]: where the cpod files live, resolved once from
//!   `${XDG_CONFIG_HOME:-$HOME/.config}/cpod` and passed down explicitly.
//! - [`Config`]: the optional `config.toml` inside that directory. A missing
//!   file yields `Config::default()`, which keeps the sequential,
//!   fail-fast export behaviour.
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Title used for exported OPML documents unless overridden.
pub const DEFAULT_OPML_TITLE: &str = "Podcast subscriptions";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Neither XDG_CONFIG_HOME nor HOME is set")]
    NoConfigHome,

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Config Directory
// ============================================================================

/// The cpod configuration directory and the files inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// Resolves the directory from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(
            std::env::var_os("XDG_CONFIG_HOME"),
            std::env::var_os("HOME"),
        )
    }

    /// Resolves the directory from explicit `XDG_CONFIG_HOME` and `HOME`
    /// values. An empty `XDG_CONFIG_HOME` counts as unset.
    pub fn resolve(
        xdg_config_home: Option<OsString>,
        home: Option<OsString>,
    ) -> Result<Self, ConfigError> {
        let base = match xdg_config_home.filter(|v| !v.is_empty()) {
            Some(xdg) => PathBuf::from(xdg),
            None => {
                let home = home
                    .filter(|v| !v.is_empty())
                    .ok_or(ConfigError::NoConfigHome)?;
                PathBuf::from(home).join(".config")
            }
        };
        Ok(Self::new(base.join("cpod")))
    }

    /// Uses `root` as the cpod directory as-is.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The subscription list, one feed URL per line.
    pub fn urls_path(&self) -> PathBuf {
        self.root.join("urls")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Tunables for the export and import tools.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `<head><title>` of exported documents.
    pub opml_title: String,

    /// How many feeds are resolved at once during export. 0 is treated as 1.
    pub fetch_concurrency: usize,

    /// Per-feed timeout in seconds. 0 = wait indefinitely.
    pub fetch_timeout_secs: u64,

    /// Write the OPML with whatever resolved instead of aborting on the
    /// first unreachable feed.
    pub partial_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            opml_title: DEFAULT_OPML_TITLE.to_string(),
            fetch_concurrency: 1,
            fetch_timeout_secs: 0,
            partial_export: false,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 4] = [
        "opml_title",
        "fetch_concurrency",
        "fetch_timeout_secs",
        "partial_export",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            concurrency = config.fetch_concurrency,
            partial = config.partial_export,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Concurrency clamped to at least one in-flight fetch.
    pub fn effective_concurrency(&self) -> usize {
        self.fetch_concurrency.max(1)
    }

    pub fn fetch_timeout(&self) -> Option<std::time::Duration> {
        match self.fetch_timeout_secs {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xdg_config_home_wins() {
        let dir = ConfigDir::resolve(
            Some(OsString::from("/xdg")),
            Some(OsString::from("/home/user")),
        )
        .unwrap();
        assert_eq!(dir.root(), Path::new("/xdg/cpod"));
        assert_eq!(dir.urls_path(), PathBuf::from("/xdg/cpod/urls"));
    }

    #[test]
    fn test_falls_back_to_home_dot_config() {
        let dir = ConfigDir::resolve(None, Some(OsString::from("/home/user"))).unwrap();
        assert_eq!(dir.urls_path(), PathBuf::from("/home/user/.config/cpod/urls"));
    }

    #[test]
    fn test_empty_xdg_counts_as_unset() {
        let dir = ConfigDir::resolve(Some(OsString::new()), Some(OsString::from("/h"))).unwrap();
        assert_eq!(dir.root(), Path::new("/h/.config/cpod"));
    }

    #[test]
    fn test_no_home_is_an_error() {
        let result = ConfigDir::resolve(None, None);
        assert!(matches!(result, Err(ConfigError::NoConfigHome)));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.opml_title, "Podcast subscriptions");
        assert_eq!(config.fetch_concurrency, 1);
        assert!(config.fetch_timeout().is_none());
        assert!(!config.partial_export);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.opml_title, DEFAULT_OPML_TITLE);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "   \n  \n  ").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.fetch_concurrency, 1);
    }

    #[test]
    fn test_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let content = r#"
opml_title = "My shows"
fetch_concurrency = 8
fetch_timeout_secs = 20
partial_export = true
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.opml_title, "My shows");
        assert_eq!(config.effective_concurrency(), 8);
        assert_eq!(
            config.fetch_timeout(),
            Some(std::time::Duration::from_secs(20))
        );
        assert!(config.partial_export);
    }

    #[test]
    fn test_zero_concurrency_clamped() {
        let config = Config {
            fetch_concurrency: 0,
            ..Config::default()
        };
        assert_eq!(config.effective_concurrency(), 1);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "partial_export = true\nnot_a_key = 1\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.partial_export);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "fetch_concurrency = \"lots\"\n").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
    }
}
