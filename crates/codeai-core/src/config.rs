//! Configuration management for codeai.
//!
//! Loads configuration from ${CODEAI_HOME}/config.toml with sensible defaults.
//! The loaded [`Config`] is passed explicitly to whatever needs it; nothing
//! reads it from global state.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config template with comments, embedded at compile time.
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("default_config.toml");

pub mod paths {
    //! Path resolution for codeai configuration.
    //!
    //! CODEAI_HOME resolution order:
    //! 1. CODEAI_HOME environment variable (if set)
    //! 2. ~/.config/codeai (default)

    use std::path::PathBuf;

    /// Returns the codeai home directory.
    pub fn codeai_home() -> PathBuf {
        if let Ok(home) = std::env::var("CODEAI_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".codeai"),
            |h| h.join(".config").join("codeai"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        codeai_home().join("config.toml")
    }
}

/// Per-provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Optional API key (overrides environment variable).
    pub api_key: Option<String>,
    /// Optional API base URL (for proxies or test rigs).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Returns the effective API key if set and non-empty.
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Returns the effective base URL if set and non-empty.
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub gemini: ProviderConfig,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The Gemini model to use
    pub model: String,

    /// Maximum tokens for responses (optional)
    pub max_output_tokens: Option<u32>,

    /// Optional system prompt sent with every request
    pub system_prompt: Option<String>,

    /// Request timeout in seconds (0 disables)
    pub request_timeout_secs: u32,

    pub providers: ProvidersConfig,
}

impl Config {
    pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u32 = 60;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, DEFAULT_CONFIG_TEMPLATE)
    }

    /// Saves only the model field to the default config file.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read, parsed or written.
    pub fn save_model(model: &str) -> Result<()> {
        Self::save_model_to(&paths::config_path(), model)
    }

    /// Saves only the model field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// Preserves existing fields and comments using `toml_edit`.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read, parsed or written.
    pub fn save_model_to(path: &Path, model: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            DEFAULT_CONFIG_TEMPLATE.to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        doc["model"] = value(model);

        Self::write_config(path, &doc.to_string())
    }

    /// Returns the trimmed system prompt, treating blank as unset.
    pub fn effective_system_prompt(&self) -> Option<&str> {
        self.system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            max_output_tokens: None,
            system_prompt: None,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            providers: ProvidersConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.max_output_tokens.is_none());
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "model = \"gemini-2.5-pro\"\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.request_timeout_secs, 60); // default preserved
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "model = [unclosed").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.model, Config::DEFAULT_MODEL);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.providers.gemini.effective_api_key().is_none());
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("gemini-2.0-flash"));
        assert!(contents.contains("[providers.gemini]"));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_provider_section_loaded() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            r#"[providers.gemini]
api_key = "  key-from-file  "
base_url = "https://proxy.example.com"
"#,
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(
            config.providers.gemini.effective_api_key(),
            Some("key-from-file")
        );
        assert_eq!(
            config.providers.gemini.effective_base_url(),
            Some("https://proxy.example.com")
        );
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config {
            system_prompt: Some("   ".to_string()),
            providers: ProvidersConfig {
                gemini: ProviderConfig {
                    api_key: Some(String::new()),
                    base_url: Some("  ".to_string()),
                },
            },
            ..Default::default()
        };
        assert_eq!(config.effective_system_prompt(), None);
        assert_eq!(config.providers.gemini.effective_api_key(), None);
        assert_eq!(config.providers.gemini.effective_base_url(), None);
    }

    #[test]
    fn test_request_timeout_zero_disables() {
        let config = Config {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), None);
        assert_eq!(
            Config::default().request_timeout(),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_save_model_creates_file_with_template() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        Config::save_model_to(&config_path, "gemini-2.5-flash").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# codeai Configuration"));
        assert!(contents.contains("request_timeout_secs = 60"));
    }

    #[test]
    fn test_save_model_preserves_other_fields_and_comments() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nested").join("config.toml");
        fs::create_dir_all(config_path.parent().unwrap()).unwrap();

        fs::write(
            &config_path,
            r#"# My config file
model = "old-model"
# This is important
request_timeout_secs = 15
"#,
        )
        .unwrap();

        Config::save_model_to(&config_path, "new-model").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "new-model");
        assert_eq!(config.request_timeout_secs, 15);

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# My config file"));
        assert!(contents.contains("# This is important"));
        assert!(!config_path.with_extension("toml.tmp").exists());
    }
}
