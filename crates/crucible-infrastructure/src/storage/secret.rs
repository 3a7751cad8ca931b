//! Secret (API key) storage.
//!
//! Secrets live in `~/.config/crucible/secret.json`, outside the repository
//! and outside scenario/config files. Error messages never include secret
//! values.

use crucible_core::error::{CrucibleError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Credentials for the chat completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSecret {
    /// API key for the chat endpoint.
    pub api_key: String,
    /// Optional model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Optional endpoint override for self-hosted gateways.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// The on-disk secret document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretConfig {
    /// Chat backend credentials.
    #[serde(default)]
    pub chat: Option<ChatSecret>,
}

/// Loads and saves `~/.config/crucible/secret.json`.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates storage pointing at the default config location.
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CrucibleError::config("Could not determine config directory"))?;
        Ok(Self {
            path: config_dir.join("crucible").join("secret.json"),
        })
    }

    /// Creates storage pointing at an explicit path (tests, containers).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Whether the secret file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the secret configuration.
    pub fn load(&self) -> Result<SecretConfig> {
        if !self.path.exists() {
            return Err(CrucibleError::not_found(
                "secret file",
                self.path.display().to_string(),
            ));
        }
        let content = fs::read_to_string(&self.path)?;
        let config: SecretConfig = serde_json::from_str(&content)
            .map_err(|_| CrucibleError::config("secret.json is not valid JSON"))?;
        Ok(config)
    }

    /// Saves the secret configuration.
    pub fn save(&self, config: &SecretConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SecretStorage::with_path(temp_dir.path().join("secret.json"));

        let config = SecretConfig {
            chat: Some(ChatSecret {
                api_key: "k-123".to_string(),
                model: Some("test-model".to_string()),
                base_url: None,
            }),
        };
        storage.save(&config).unwrap();

        let loaded = storage.load().unwrap();
        let chat = loaded.chat.unwrap();
        assert_eq!(chat.api_key, "k-123");
        assert_eq!(chat.model.as_deref(), Some("test-model"));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SecretStorage::with_path(temp_dir.path().join("secret.json"));
        assert!(!storage.exists());
        assert!(storage.load().unwrap_err().is_not_found());
    }

    #[test]
    fn test_invalid_json_error_carries_no_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        std::fs::write(&path, "api_key=oops-not-json").unwrap();

        let storage = SecretStorage::with_path(path);
        let err = storage.load().unwrap_err();
        assert!(!err.to_string().contains("oops-not-json"));
    }
}
