//! Runtime configuration.
//!
//! Reads `config/default.toml`, then applies `DESKHAND_*` environment
//! overrides (a `.env` file is loaded first by `main`). A missing file means
//! defaults; a malformed one is an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use deskhand_auth_engine::{
    CredentialStore, FileCredentialStore, GoogleAuthorizationServer, MemoryCredentialStore,
    VaultCredentialStore,
};
use deskhand_vault::{Vault, master_key};
use serde::Deserialize;

/// Environment variable overriding `[auth] client_secret`.
pub const ENV_CLIENT_SECRET: &str = "DESKHAND_CLIENT_SECRET";
/// Environment variable overriding `[storage] data_dir`.
pub const ENV_DATA_DIR: &str = "DESKHAND_DATA_DIR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub agent: AgentSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Google client-secret descriptor (`credentials.json`).
    pub client_secret: PathBuf,
    /// Loopback port for the consent redirect; 0 picks a free one.
    pub callback_port: u16,
    pub callback_timeout_secs: u64,
    pub open_browser: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_secret: PathBuf::from("credentials.json"),
            callback_port: 0,
            callback_timeout_secs:
                deskhand_auth_engine::authorization::DEFAULT_CALLBACK_TIMEOUT_SECS,
            open_browser: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `tokens.json` in the data directory.
    #[default]
    File,
    /// Encrypted `vault.db` keyed by `master.key`.
    Vault,
    /// Nothing persisted; every run consents again.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentSection {
    /// Agent description used by `deskhand agent` and `deskhand tools`.
    pub preset: PathBuf,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            preset: PathBuf::from("config/agent.openai.toml"),
        }
    }
}

impl Config {
    /// Load from `path` and the process environment.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `DESKHAND_*` overrides; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = lookup(ENV_CLIENT_SECRET) {
            self.auth.client_secret = PathBuf::from(path);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.client_secret.as_os_str().is_empty() {
            bail!("[auth] client_secret must not be empty");
        }
        if self.auth.callback_timeout_secs == 0 {
            bail!("[auth] callback_timeout_secs must be greater than zero");
        }
        if self.storage.backend != StorageBackend::Memory
            && self.storage.data_dir.as_os_str().is_empty()
        {
            bail!("[storage] data_dir must not be empty");
        }
        Ok(())
    }

    /// Open the configured credential store.
    pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
        let dir = &self.storage.data_dir;
        let store: Arc<dyn CredentialStore> = match self.storage.backend {
            StorageBackend::File => Arc::new(FileCredentialStore::new(dir.join("tokens.json"))),
            StorageBackend::Vault => {
                let key = master_key::load_or_create(dir.join("master.key"))
                    .context("failed to load vault master key")?;
                let vault = Vault::open(dir.join("vault.db"), &key)
                    .context("failed to open credential vault")?;
                Arc::new(VaultCredentialStore::new(vault))
            }
            StorageBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        };

        tracing::debug!(
            backend = ?self.storage.backend,
            data_dir = %dir.display(),
            "credential store ready"
        );
        Ok(store)
    }

    pub fn authorization_server(&self) -> GoogleAuthorizationServer {
        GoogleAuthorizationServer::default()
            .with_callback_port(self.auth.callback_port)
            .with_callback_timeout(self.auth.callback_timeout_secs)
            .with_open_browser(self.auth.open_browser)
    }
}
