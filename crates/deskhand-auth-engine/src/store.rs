//! Credential persistence.
//!
//! The broker only sees the [`CredentialStore`] trait. Three backends ship:
//!
//! - [`FileCredentialStore`] -- a JSON document keyed by provider name,
//!   replaced atomically on every write.
//! - [`VaultCredentialStore`] -- records in the encrypted SQLite vault.
//! - [`MemoryCredentialStore`] -- an in-process map.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use deskhand_vault::Vault;

use crate::credential::Credential;
use crate::error::{AuthEngineError, Result};

/// Vault key prefix for OAuth credentials.
pub const VAULT_KEY_PREFIX: &str = "oauth:";

/// Load, save and delete one credential per provider name.
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when nothing is stored for `provider`.
    fn load(&self, provider: &str) -> Result<Option<Credential>>;

    /// Store `credential`, replacing any previous one.
    fn save(&self, provider: &str, credential: &Credential) -> Result<()>;

    /// Remove the credential for `provider`. Deleting nothing is not an error.
    fn delete(&self, provider: &str) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| AuthEngineError::Storage {
        reason: "credential store lock poisoned".to_string(),
    })
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

type CredentialMap = BTreeMap<String, Credential>;

/// A JSON file mapping provider name to credential.
pub struct FileCredentialStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<CredentialMap> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(CredentialMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CredentialMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a sibling temp file, then rename it over the target.
    fn write_map(&self, map: &CredentialMap) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        let json = serde_json::to_vec_pretty(map)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| AuthEngineError::Io(e.error))?;
        Ok(())
    }

    /// Read the current document for a write; an unreadable one is replaced.
    fn read_map_for_update(&self) -> CredentialMap {
        self.read_map().unwrap_or_else(|e| {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "existing credential file unreadable, starting a new one"
            );
            CredentialMap::new()
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, provider: &str) -> Result<Option<Credential>> {
        let _guard = lock(&self.guard)?;
        Ok(self.read_map()?.remove(provider))
    }

    fn save(&self, provider: &str, credential: &Credential) -> Result<()> {
        let _guard = lock(&self.guard)?;
        let mut map = self.read_map_for_update();
        map.insert(provider.to_string(), credential.clone());
        self.write_map(&map)?;

        tracing::info!(provider, path = %self.path.display(), "credential saved");
        Ok(())
    }

    fn delete(&self, provider: &str) -> Result<()> {
        let _guard = lock(&self.guard)?;
        let mut map = self.read_map_for_update();
        if map.remove(provider).is_some() {
            self.write_map(&map)?;
            tracing::info!(provider, "credential deleted");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Credentials sealed in the encrypted SQLite vault under `oauth:<provider>`.
pub struct VaultCredentialStore {
    vault: Mutex<Vault>,
}

impl VaultCredentialStore {
    pub fn new(vault: Vault) -> Self {
        Self {
            vault: Mutex::new(vault),
        }
    }

    fn key(provider: &str) -> String {
        format!("{VAULT_KEY_PREFIX}{provider}")
    }
}

impl CredentialStore for VaultCredentialStore {
    fn load(&self, provider: &str) -> Result<Option<Credential>> {
        let vault = lock(&self.vault)?;
        match vault.get_secret(&Self::key(provider))? {
            Some(record) => Ok(Some(serde_json::from_value(record.data)?)),
            None => Ok(None),
        }
    }

    fn save(&self, provider: &str, credential: &Credential) -> Result<()> {
        let data = serde_json::to_value(credential)?;
        let vault = lock(&self.vault)?;
        vault.put_secret(&Self::key(provider), &data, credential.expires_at)?;
        tracing::info!(provider, "credential saved to vault");
        Ok(())
    }

    fn delete(&self, provider: &str) -> Result<()> {
        let vault = lock(&self.vault)?;
        vault.delete_secret(&Self::key(provider))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Non-persistent store.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, provider: &str) -> Result<Option<Credential>> {
        Ok(lock(&self.entries)?.get(provider).cloned())
    }

    fn save(&self, provider: &str, credential: &Credential) -> Result<()> {
        lock(&self.entries)?.insert(provider.to_string(), credential.clone());
        Ok(())
    }

    fn delete(&self, provider: &str) -> Result<()> {
        lock(&self.entries)?.remove(provider);
        Ok(())
    }
}
