//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::geometry::Size;
use crate::recognition::{RecognitionLevel, RecognitionOptions};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Text recognition settings
    pub recognition: RecognitionSettings,
    /// Display settings
    pub display: DisplaySettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Text recognition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Accurate or fast recognition
    pub level: RecognitionLevel,
    /// Correct recognized words against the language model
    pub language_correction: bool,
    /// Preferred languages, empty for automatic detection
    pub languages: Vec<String>,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Accurate,
            language_correction: true,
            languages: Vec::new(),
        }
    }
}

impl RecognitionSettings {
    /// Options handed to the recognition backend
    pub fn to_options(&self) -> RecognitionOptions {
        RecognitionOptions {
            level: self.level,
            language_correction: self.language_correction,
            languages: self
                .languages
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }
}

/// Display settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Viewport width used when none is given
    pub viewport_width: f64,
    /// Viewport height used when none is given
    pub viewport_height: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            viewport_width: 390.0,
            viewport_height: 664.0,
        }
    }
}

impl DisplaySettings {
    pub fn viewport_size(&self) -> Size {
        Size::new(self.viewport_width, self.viewport_height)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by RUST_LOG
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the configuration directory
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "pagetap", "PageTap")
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Load configuration from `path`, or from the default location, or fall
/// back to defaults
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return load_config(path);
    }

    if let Ok(dir) = config_dir() {
        let config_path = dir.join("config.toml");
        if config_path.exists() {
            let config = load_config(&config_path)?;
            info!("Loaded configuration from {:?}", config_path);
            return Ok(config);
        }
    }

    info!("Using default configuration");
    Ok(AppConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.recognition.level, RecognitionLevel::Accurate);
        assert!(config.recognition.language_correction);
        assert!(config.recognition.languages.is_empty());

        assert_eq!(config.display.viewport_size(), Size::new(390.0, 664.0));

        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.recognition.level = RecognitionLevel::Fast;
        config.recognition.languages = vec!["en-US".to_string(), "fr-FR".to_string()];
        config.display.viewport_width = 1024.0;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.recognition.level, RecognitionLevel::Fast);
        assert_eq!(parsed.recognition.languages, vec!["en-US", "fr-FR"]);
        assert!((parsed.display.viewport_width - 1024.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[recognition]\nlevel = \"fast\"\n").unwrap();

        assert_eq!(parsed.recognition.level, RecognitionLevel::Fast);
        assert!(parsed.recognition.language_correction);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_to_options_drops_blank_languages() {
        let settings = RecognitionSettings {
            level: RecognitionLevel::Accurate,
            language_correction: false,
            languages: vec![" en-US ".to_string(), "".to_string()],
        };

        let options = settings.to_options();
        assert_eq!(options.languages, vec!["en-US"]);
        assert!(!options.language_correction);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.recognition.level, loaded.recognition.level);
        assert_eq!(config.logging.level, loaded.logging.level);
    }

    #[test]
    fn test_load_or_default_with_explicit_path() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[logging]\nlevel = \"debug\"").unwrap();

        let config = load_or_default(Some(temp_file.path())).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
