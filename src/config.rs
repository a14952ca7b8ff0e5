use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENDPOINT: &str = "https://garai-backend-production.up.railway.app/ask-ai";
pub const ENDPOINT_ENV: &str = "GARAI_ENDPOINT";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Answering service URL
    pub endpoint: String,

    /// Request timeout; `None` waits for the service indefinitely
    pub request_timeout_secs: Option<u64>,

    /// Name of the slot the transcript is stored under
    pub storage_key: String,

    /// GarAi home directory
    #[serde(skip)]
    pub garai_home: PathBuf,

    /// First assistant message of a new conversation
    pub greeting: String,

    /// Assistant message shown when a request fails
    pub failure_message: String,

    /// Canned questions offered by `/suggest`
    pub suggestions: Vec<String>,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub assistant_name: String,
    pub show_suggestions: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            assistant_name: "GarAI".to_string(),
            show_suggestions: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: None,
            storage_key: "transcript".to_string(),
            garai_home: home.join(".garai"),
            greeting: "Hi, I’m GarAi, here to answer your questions as Garrett. Ask me \
                       anything about his skills, experience, or projects, and I’ll \
                       respond just like he would. Let’s chat!"
                .to_string(),
            failure_message: "Sorry, something went wrong.".to_string(),
            suggestions: vec![
                "What is GarAi?".to_string(),
                "What was your last role?".to_string(),
                "Where do you want to be in 5 years?".to_string(),
                "What are some of your goals?".to_string(),
            ],
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.garai/config.toml`, then apply the
    /// environment override
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let garai_home = home.join(".garai");

        let mut config = Self::load_from(&garai_home.join("config.toml"))?;
        config.garai_home = garai_home;

        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                config.endpoint = endpoint;
            }
        }

        Ok(config)
    }

    /// Read a config file, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Ensure the home directory exists
    pub fn ensure_home(&self) -> Result<()> {
        fs::create_dir_all(&self.garai_home)
            .context("Failed to create .garai directory")?;
        Ok(())
    }

    /// Log file used while the terminal UI owns stdout
    pub fn log_path(&self) -> PathBuf {
        self.garai_home.join("garai.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.failure_message, "Sorry, something went wrong.");
        assert_eq!(config.request_timeout_secs, None);
        assert_eq!(config.suggestions.len(), 4);
        assert!(config.greeting.contains("as Garrett. Ask me anything about his skills"));
        assert!(config.greeting.ends_with("just like he would. Let’s chat!"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            concat!(
                "endpoint = \"http://localhost:8000/ask-ai\"\n",
                "request_timeout_secs = 30\n\n",
                "[ui]\nshow_suggestions = false\n",
            ),
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.endpoint, "http://localhost:8000/ask-ai");
        assert_eq!(config.request_timeout_secs, Some(30));
        assert!(!config.ui.show_suggestions);
        assert_eq!(config.ui.assistant_name, "GarAI");
        assert_eq!(config.storage_key, "transcript");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "endpoint = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
