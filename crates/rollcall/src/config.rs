//! Configuration management for rollcall.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::payload::FIELD_SEPARATOR;
use crate::record::DEFAULT_SOURCE;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "rollcall";

/// Default ledger file name.
const LEDGER_FILE_NAME: &str = "attendance.csv";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "ROLLCALL_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ROLLCALL_`, sections split on `__`)
/// 2. TOML config file at `~/.config/rollcall/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ledger configuration.
    pub ledger: LedgerConfig,
    /// Scanning configuration.
    pub scan: ScanConfig,
}

/// Ledger-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Path to the ledger file.
    /// Defaults to `~/.local/share/rollcall/attendance.csv`
    pub path: Option<PathBuf>,
}

/// Scanning-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Tag written in the `source` column of new records.
    pub source_tag: String,
    /// Ring the terminal bell when a student is marked.
    pub beep: bool,
    /// Stop after this many frames. Set to 0 for unlimited.
    pub max_frames: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            source_tag: DEFAULT_SOURCE.to_string(),
            beep: false,
            max_frames: 0,
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let tag = self.scan.source_tag.trim();
        if tag.is_empty() {
            return Err(Error::ConfigValidation {
                message: "scan.source_tag must not be empty".to_string(),
            });
        }
        if tag.contains(['\n', '\r']) {
            return Err(Error::ConfigValidation {
                message: "scan.source_tag must be a single line".to_string(),
            });
        }
        if tag.contains(FIELD_SEPARATOR) {
            return Err(Error::ConfigValidation {
                message: format!("scan.source_tag must not contain {FIELD_SEPARATOR:?}"),
            });
        }

        if let Some(path) = &self.ledger.path {
            let text = path.to_string_lossy();
            if text.is_empty() || text.ends_with(std::path::MAIN_SEPARATOR) || text.ends_with('/')
            {
                return Err(Error::ConfigValidation {
                    message: format!("ledger.path must name a file, got {text:?}"),
                });
            }
        }

        Ok(())
    }

    /// Get the ledger path, resolving defaults if not set.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(LEDGER_FILE_NAME))
    }

    /// Get the frame limit, if any.
    #[must_use]
    pub fn max_frames(&self) -> Option<u64> {
        (self.scan.max_frames > 0).then_some(self.scan.max_frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.ledger.path.is_none());
        assert_eq!(config.scan.source_tag, "QR Webcam");
        assert!(!config.scan.beep);
        assert_eq!(config.scan.max_frames, 0);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_source_tag() {
        let mut config = Config::default();
        config.scan.source_tag = "   ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("source_tag"));
    }

    #[test]
    fn test_validate_source_tag_with_separator() {
        let mut config = Config::default();
        config.scan.source_tag = "QR|Webcam".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_directory_ledger_path() {
        let mut config = Config::default();
        config.ledger.path = Some(PathBuf::from("/var/lib/rollcall/"));

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("ledger.path"));
    }

    #[test]
    fn test_ledger_path_default() {
        let config = Config::default();
        let path = config.ledger_path();

        assert!(path.to_string_lossy().contains("rollcall"));
        assert!(path.to_string_lossy().ends_with("attendance.csv"));
    }

    #[test]
    fn test_ledger_path_custom() {
        let mut config = Config::default();
        config.ledger.path = Some(PathBuf::from("/srv/class-7b/attendance.csv"));

        assert_eq!(
            config.ledger_path(),
            PathBuf::from("/srv/class-7b/attendance.csv")
        );
    }

    #[test]
    fn test_max_frames() {
        let mut config = Config::default();
        assert!(config.max_frames().is_none());

        config.scan.max_frames = 500;
        assert_eq!(config.max_frames(), Some(500));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("rollcall"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[ledger]\npath = \"/srv/attendance.csv\"\n\n[scan]\nsource_tag = \"QR Kiosk\"\nbeep = true\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.ledger_path(), PathBuf::from("/srv/attendance.csv"));
        assert_eq!(config.scan.source_tag, "QR Kiosk");
        assert!(config.scan.beep);
        assert_eq!(config.scan.max_frames, 0);
    }

    #[test]
    fn test_load_invalid_toml_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scan]\nsource_tag = \"\"\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_scan_config_deserialize() {
        let json = r#"{"beep": true}"#;
        let scan: ScanConfig = serde_json::from_str(json).unwrap();
        assert!(scan.beep);
        assert_eq!(scan.source_tag, "QR Webcam");
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("source_tag"));
        assert!(json.contains("ledger"));
    }
}
