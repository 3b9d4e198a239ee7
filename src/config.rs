//! Configuration management for devchat.
//!
//! Configuration is loaded from `~/.config/devchat/config.toml`.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Completion endpoint settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Image generation settings.
    #[serde(default)]
    pub image: ImageConfig,
    /// Knowledge files seeded into every chat session.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            image: ImageConfig::default(),
            knowledge: KnowledgeConfig::default(),
        }
    }
}

/// Settings for the chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the completion API (default: https://api.openai.com).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key (prefer the DEVCHAT_API_KEY env var).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Chat model (default: gpt-4-turbo-preview).
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Per-request timeout in seconds (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Ask the endpoint to answer with a JSON object body.
    #[serde(default)]
    pub json_mode: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            chat_model: default_chat_model(),
            timeout_secs: default_timeout_secs(),
            json_mode: false,
        }
    }
}

impl ApiConfig {
    /// Resolve the credential handed to the transport layer.
    ///
    /// The DEVCHAT_API_KEY environment variable wins over the config file.
    pub fn credential(&self) -> Result<String> {
        std::env::var("DEVCHAT_API_KEY")
            .ok()
            .or_else(|| self.api_key.clone())
            .ok_or_else(|| {
                anyhow!(
                    "API key not found. Set DEVCHAT_API_KEY environment variable \
                     or add api_key to the [api] section of the config file."
                )
            })
    }
}

/// Settings for the image generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Image model (default: dall-e-3).
    #[serde(default = "default_image_model")]
    pub model: String,
    /// Requested image dimensions (default: 1024x1024).
    #[serde(default = "default_image_size")]
    pub size: String,
    /// Where the downloaded image is written, overwritten on each run.
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: default_image_model(),
            size: default_image_size(),
            output_file: default_output_file(),
        }
    }
}

/// Local files injected as the first user-role messages of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Device-control schema describing the commands the model may emit.
    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,
    /// System prompt steering the model's reply format.
    #[serde(default = "default_prompt_file")]
    pub prompt_file: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            schema_file: default_schema_file(),
            prompt_file: default_prompt_file(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_chat_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_output_file() -> PathBuf {
    PathBuf::from("downloaded_image.png")
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("./dev_ctrl.json")
}

fn default_prompt_file() -> PathBuf {
    PathBuf::from("./Prompt.txt")
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("devchat"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.endpoint, "https://api.openai.com");
        assert_eq!(config.api.chat_model, "gpt-4-turbo-preview");
        assert_eq!(config.api.timeout_secs, 60);
        assert!(!config.api.json_mode);
        assert_eq!(config.image.model, "dall-e-3");
        assert_eq!(config.image.size, "1024x1024");
        assert_eq!(config.image.output_file, PathBuf::from("downloaded_image.png"));
        assert_eq!(config.knowledge.schema_file, PathBuf::from("./dev_ctrl.json"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("api.openai.com"));
        assert!(toml.contains("dall-e-3"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
[api]
endpoint = "https://llm.internal.example"
chat_model = "gpt-4o-mini"
json_mode = true

[image]
size = "512x512"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.endpoint, "https://llm.internal.example");
        assert_eq!(config.api.chat_model, "gpt-4o-mini");
        assert!(config.api.json_mode);
        // Unset fields fall back to their defaults.
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.image.size, "512x512");
        assert_eq!(config.image.model, "dall-e-3");
        assert_eq!(config.knowledge.prompt_file, PathBuf::from("./Prompt.txt"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api.endpoint, "https://api.openai.com");
    }
}
