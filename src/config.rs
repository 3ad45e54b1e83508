//! Application configuration file.
//!
//! `config.json` lives in the data directory (`%APPDATA%\winpersona` by
//! default, or `$WINPERSONA_HOME`). A missing file means defaults. Relative
//! paths inside it are resolved against the data directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::WinPersonaError;
use crate::types::InstallScope;

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "WINPERSONA_HOME";
pub const CONFIG_FILE: &str = "config.json";

const MAX_RETRY_DELAY_SECS: u64 = 300;

/// Settings loaded from `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog_path: PathBuf,
    pub personas_dir: PathBuf,
    pub history_path: PathBuf,
    pub backups_dir: PathBuf,
    pub log_dir: PathBuf,
    /// winget executable (name on PATH or full path)
    pub winget_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_scope: Option<InstallScope>,
    /// Pause between the first and the fallback install attempt
    pub retry_delay_secs: u64,
    /// Check `winget list` before installing and skip present packages
    pub skip_installed: bool,
    /// Run the dependency resolver before installing a persona
    pub resolve_dependencies: bool,

    /// Directory the config was loaded from; relative paths resolve here
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("catalog.json"),
            personas_dir: PathBuf::from("personas"),
            history_path: PathBuf::from("history.jsonl"),
            backups_dir: PathBuf::from("backups"),
            log_dir: PathBuf::from("logs"),
            winget_path: PathBuf::from("winget"),
            install_scope: None,
            retry_delay_secs: 5,
            skip_installed: true,
            resolve_dependencies: true,
            data_dir: PathBuf::new(),
        }
    }
}

impl AppConfig {
    /// Default data directory: `$WINPERSONA_HOME`, else `<data_dir>/winpersona`,
    /// else `./winpersona`.
    pub fn default_data_dir() -> PathBuf {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(home);
        }
        dirs::data_dir()
            .map(|d| d.join("winpersona"))
            .unwrap_or_else(|| PathBuf::from("winpersona"))
    }

    /// Load `path`, or defaults if it doesn't exist. The data directory is
    /// the file's parent.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.data_dir = data_dir;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("catalog_path", &self.catalog_path),
            ("personas_dir", &self.personas_dir),
            ("history_path", &self.history_path),
            ("backups_dir", &self.backups_dir),
            ("log_dir", &self.log_dir),
            ("winget_path", &self.winget_path),
        ];
        for (field, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(WinPersonaError::config(format!("{} must not be empty", field)).into());
            }
        }

        if self.retry_delay_secs > MAX_RETRY_DELAY_SECS {
            return Err(WinPersonaError::config(format!(
                "retry_delay_secs must be between 0 and {} (got {})",
                MAX_RETRY_DELAY_SECS, self.retry_delay_secs
            ))
            .into());
        }

        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.catalog_path)
    }

    pub fn personas_dir(&self) -> PathBuf {
        self.resolve(&self.personas_dir)
    }

    pub fn history_path(&self) -> PathBuf {
        self.resolve(&self.history_path)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.resolve(&self.backups_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.log_dir)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults_with_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join(CONFIG_FILE)).unwrap();

        assert_eq!(config.retry_delay_secs, 5);
        assert_eq!(config.catalog_path(), dir.path().join("catalog.json"));
        assert_eq!(config.personas_dir(), dir.path().join("personas"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "retry_delay_secs": 0, "install_scope": "machine" }"#).unwrap();

        let config = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(config.retry_delay_secs, 0);
        assert_eq!(config.install_scope, Some(InstallScope::Machine));
        assert!(config.skip_installed);
        assert_eq!(config.winget_path, PathBuf::from("winget"));
    }

    #[test]
    fn test_absolute_paths_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::load_or_default(dir.path().join(CONFIG_FILE)).unwrap();
        let absolute = dir.path().join("elsewhere").join("catalog.json");
        config.catalog_path = absolute.clone();
        assert_eq!(config.catalog_path(), absolute);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.retry_delay_secs = 301;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WinPersonaError>(),
            Some(WinPersonaError::Config(_))
        ));

        let mut config = AppConfig::default();
        config.personas_dir = PathBuf::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("personas_dir"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join(CONFIG_FILE);
        let mut config = AppConfig::default();
        config.skip_installed = false;
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_or_default(&path).unwrap();
        assert!(!loaded.skip_installed);
        assert_eq!(loaded.data_dir, dir.path().join("sub"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ nope").unwrap();
        assert!(AppConfig::load_or_default(&path).is_err());
    }
}
