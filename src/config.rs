//! Configuration loading for Eden.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Environment variable holding the bot token.
pub const TOKEN_ENV: &str = "TOKEN";

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "EDEN_CACHE_DIR";

/// Get the Eden home directory (~/.eden).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".eden"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.eden/settings.json, then apply environment overrides.
pub fn load_settings() -> Result<Settings> {
    let mut settings = load_settings_from(&get_settings_path()?)?;
    settings.apply_env();
    Ok(settings)
}

/// Load settings from `path`. A missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::debug!("No settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Eden settings.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Settings {
    pub bot_token: Option<String>,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_download_timeout_secs() -> u64 {
    30
}

fn default_max_image_bytes() -> usize {
    8 * 1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_token: None,
            cache_dir: default_cache_dir(),
            download_timeout_secs: default_download_timeout_secs(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl Settings {
    /// Let `TOKEN` and `EDEN_CACHE_DIR` override the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(TOKEN_ENV).ok(),
            std::env::var(CACHE_DIR_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, token: Option<String>, cache_dir: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.bot_token = Some(token);
        }
        if let Some(dir) = cache_dir.filter(|d| !d.trim().is_empty()) {
            self.cache_dir = PathBuf::from(dir);
        }
    }

    /// Names of required properties that are not set for running the bot.
    pub fn missing_properties(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.bot_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            missing.push(TOKEN_ENV);
        }
        missing
    }

    /// Return the bot token, or a configuration error naming what is missing.
    pub fn validate_for_bot(&self) -> Result<String> {
        let missing = self.missing_properties();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Failed to find following properties: {}",
                missing.join(", ")
            )));
        }
        Ok(self.bot_token.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings_from(&dir.path().join("settings.json")).unwrap();

        assert_eq!(settings.cache_dir, PathBuf::from("./cache"));
        assert_eq!(settings.download_timeout_secs, 30);
        assert!(settings.bot_token.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"bot_token": "abc", "cache_dir": "/srv/eden"}"#).unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.bot_token.as_deref(), Some("abc"));
        assert_eq!(settings.cache_dir, PathBuf::from("/srv/eden"));
        assert_eq!(settings.max_image_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut settings = Settings::default();
        settings.bot_token = Some("file".into());

        settings.apply_overrides(Some("env".into()), Some("/tmp/c".into()));
        assert_eq!(settings.bot_token.as_deref(), Some("env"));
        assert_eq!(settings.cache_dir, PathBuf::from("/tmp/c"));

        settings.apply_overrides(Some("  ".into()), None);
        assert_eq!(settings.bot_token.as_deref(), Some("env"));
    }

    #[test]
    fn bot_requires_token() {
        let settings = Settings::default();
        let err = settings.validate_for_bot().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Failed to find following properties: TOKEN"
        );
    }
}
