//! Application configuration management.
//!
//! This module handles loading and saving the CLI configuration, which
//! includes the API base URL, where tokens are kept, and the last used email.
//!
//! Configuration is stored at `~/.config/data-for-dummies/config.json`.
//! `DFD_API_BASE` and `DFD_CREDENTIALS` in the environment (or `.env`)
//! override the file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use dfd_core::auth::{CredentialStore, FileStore, KeyringStore, MemoryStore};
use dfd_core::config::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "data-for-dummies";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_BASE: &str = "DFD_API_BASE";
pub const ENV_CREDENTIALS: &str = "DFD_CREDENTIALS";

/// Where access and refresh tokens are kept between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    Keyring,
    #[default]
    File,
    /// Nothing survives the process; every run starts logged out.
    Memory,
}

impl FromStr for CredentialBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(Self::Keyring),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown credential backend '{}' (expected keyring, file or memory)",
                other
            )),
        }
    }
}

impl fmt::Display for CredentialBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyring => f.write_str("keyring"),
            Self::File => f.write_str("file"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply `DFD_API_BASE` / `DFD_CREDENTIALS` from the environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(ENV_API_BASE).ok(),
            std::env::var(ENV_CREDENTIALS).ok(),
        )
    }

    fn apply_overrides(&mut self, base_url: Option<String>, backend: Option<String>) -> Result<()> {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(backend) = backend.filter(|b| !b.trim().is_empty()) {
            self.credential_backend = backend
                .parse()
                .with_context(|| format!("Invalid {}", ENV_CREDENTIALS))?;
        }
        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn credential_store(&self) -> Result<Box<dyn CredentialStore>> {
        Ok(match self.credential_backend {
            CredentialBackend::Keyring => Box::new(KeyringStore::new(APP_NAME)),
            CredentialBackend::File => Box::new(FileStore::in_cache_dir()?),
            CredentialBackend::Memory => Box::new(MemoryStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.api_base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.credential_backend, CredentialBackend::File);
        assert!(config.last_email.is_none());
    }

    #[test]
    fn test_config_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            base_url: Some("https://dfd.example.com".into()),
            credential_backend: CredentialBackend::Keyring,
            last_email: Some("a@b.com".into()),
        };
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.api_base_url(), "https://dfd.example.com");
        assert_eq!(reloaded.credential_backend, CredentialBackend::Keyring);
        assert_eq!(reloaded.last_email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_older_config_without_backend_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"base_url": null, "last_email": "x@y.io"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.credential_backend, CredentialBackend::File);
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(Some("http://10.0.0.2:8000".into()), Some("Memory".into()))
            .unwrap();
        assert_eq!(config.api_base_url(), "http://10.0.0.2:8000");
        assert_eq!(config.credential_backend, CredentialBackend::Memory);

        // Blank values are ignored
        config.apply_overrides(Some("  ".into()), Some("".into())).unwrap();
        assert_eq!(config.api_base_url(), "http://10.0.0.2:8000");

        assert!(config.apply_overrides(None, Some("vault".into())).is_err());
    }

    #[test]
    fn test_backend_display_round_trip() {
        for backend in [CredentialBackend::Keyring, CredentialBackend::File, CredentialBackend::Memory] {
            assert_eq!(backend.to_string().parse::<CredentialBackend>().unwrap(), backend);
        }
    }
}
