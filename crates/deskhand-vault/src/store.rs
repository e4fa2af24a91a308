//! SQLite-backed encrypted secret store.
//!
//! The [`Vault`] struct wraps a `rusqlite::Connection` and a master key.
//! Every secret payload is a JSON value that is sealed with AES-256-GCM
//! before it touches SQLite and opened again on read.
//!
//! # Schema
//!
//! A single `secrets` table keyed by an opaque string (callers use keys like
//! `oauth:gmail`). Migration runs on every [`Vault::open`].

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::crypto::{self, NONCE_LEN_BYTES};
use crate::error::{Result, VaultError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A decrypted secret as returned by [`Vault::get_secret`].
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Lookup key, e.g. `oauth:gmail`.
    pub key: String,

    /// The decrypted payload.
    pub data: serde_json::Value,

    /// Optional expiry the caller attached on write. Informational only.
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRecord")
            .field("key", &self.key)
            .field("data", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Listing entry returned by [`Vault::list_secrets`]; never decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretSummary {
    pub key: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Encrypted secret vault backed by SQLite.
pub struct Vault {
    conn: Connection,
    master_key: Vec<u8>,
}

impl Vault {
    /// Open (or create) a vault database at `path` sealed with `master_key`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] if the database cannot be opened,
    /// or [`VaultError::MigrationFailed`] if schema setup fails.
    pub fn open(path: impl AsRef<std::path::Path>, master_key: &[u8]) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening vault database");

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::configure_connection(&conn)?;

        let vault = Self {
            conn,
            master_key: master_key.to_vec(),
        };
        vault.run_migrations()?;

        tracing::debug!("vault database ready");
        Ok(vault)
    }

    /// Open an in-memory vault (useful for testing).
    pub fn open_in_memory(master_key: &[u8]) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;

        let vault = Self {
            conn,
            master_key: master_key.to_vec(),
        };
        vault.run_migrations()?;
        Ok(vault)
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS secrets (
                    key        TEXT PRIMARY KEY,
                    data       BLOB NOT NULL,
                    nonce      BLOB NOT NULL,
                    expires_at INTEGER,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );",
            )
            .map_err(|e| VaultError::MigrationFailed {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    // -- Secret CRUD --------------------------------------------------------

    /// Insert or replace the secret stored under `key`.
    ///
    /// The payload is re-sealed with a fresh nonce on every write; the
    /// original `created_at` is preserved on replace.
    pub fn put_secret(
        &self,
        key: &str,
        data: &serde_json::Value,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let plaintext = serde_json::to_vec(data)?;
        let (nonce, ciphertext) = crypto::encrypt(&plaintext, &self.master_key)?;
        let now = Utc::now().timestamp();
        let expires_ts = expires_at.map(|e| e.timestamp());

        self.conn.execute(
            "INSERT INTO secrets (key, data, nonce, expires_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(key) DO UPDATE SET
                data = excluded.data,
                nonce = excluded.nonce,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![key, ciphertext, nonce.as_slice(), expires_ts, now],
        )?;

        tracing::info!(key = key, "stored secret");
        Ok(())
    }

    /// Fetch and decrypt the secret stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::DecryptionFailed`] when the row exists but was
    /// sealed under a different master key or has been corrupted.
    pub fn get_secret(&self, key: &str) -> Result<Option<SecretRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT key, data, nonce, expires_at, created_at, updated_at
                 FROM secrets WHERE key = ?1",
                params![key],
                |row| {
                    Ok(SecretRow {
                        key: row.get(0)?,
                        data: row.get(1)?,
                        nonce: row.get(2)?,
                        expires_at: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()?;

        row.map(|row| self.open_row(row)).transpose()
    }

    /// Delete the secret stored under `key`. Returns whether a row was removed.
    pub fn delete_secret(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM secrets WHERE key = ?1", params![key])?;

        if rows > 0 {
            tracing::info!(key = key, "deleted secret");
        }
        Ok(rows > 0)
    }

    /// List stored secrets without decrypting them, ordered by key.
    pub fn list_secrets(&self) -> Result<Vec<SecretSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, expires_at, updated_at FROM secrets ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (key, expires_at, updated_at) = row?;
            out.push(SecretSummary {
                key,
                expires_at: expires_at.map(timestamp_to_datetime).transpose()?,
                updated_at: timestamp_to_datetime(updated_at)?,
            });
        }
        Ok(out)
    }

    fn open_row(&self, row: SecretRow) -> Result<SecretRecord> {
        let nonce: [u8; NONCE_LEN_BYTES] =
            row.nonce
                .as_slice()
                .try_into()
                .map_err(|_| VaultError::DecryptionFailed {
                    reason: format!("stored nonce for {} has the wrong length", row.key),
                })?;

        let plaintext = crypto::decrypt(&nonce, &row.data, &self.master_key)?;
        let data = serde_json::from_slice(&plaintext)?;

        Ok(SecretRecord {
            key: row.key,
            data,
            expires_at: row.expires_at.map(timestamp_to_datetime).transpose()?,
            created_at: timestamp_to_datetime(row.created_at)?,
            updated_at: timestamp_to_datetime(row.updated_at)?,
        })
    }
}

/// Raw row before decryption.
struct SecretRow {
    key: String,
    data: Vec<u8>,
    nonce: Vec<u8>,
    expires_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

fn timestamp_to_datetime(ts: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .ok_or_else(|| VaultError::Internal(format!("invalid timestamp in vault: {ts}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KEY_LEN, random_bytes};

    fn test_vault() -> Vault {
        let key = random_bytes(KEY_LEN).unwrap();
        Vault::open_in_memory(&key).unwrap()
    }

    #[test]
    fn put_then_get() {
        let vault = test_vault();
        let data = serde_json::json!({ "access_token": "ya29.abc" });

        vault.put_secret("oauth:gmail", &data, None).unwrap();

        let record = vault.get_secret("oauth:gmail").unwrap().unwrap();
        assert_eq!(record.key, "oauth:gmail");
        assert_eq!(record.data, data);
        assert!(record.expires_at.is_none());
    }

    #[test]
    fn missing_key_is_none() {
        let vault = test_vault();
        assert!(vault.get_secret("oauth:nope").unwrap().is_none());
    }

    #[test]
    fn put_replaces_existing() {
        let vault = test_vault();
        vault
            .put_secret("oauth:gmail", &serde_json::json!({ "v": 1 }), None)
            .unwrap();
        vault
            .put_secret("oauth:gmail", &serde_json::json!({ "v": 2 }), None)
            .unwrap();

        let record = vault.get_secret("oauth:gmail").unwrap().unwrap();
        assert_eq!(record.data["v"], 2);
        assert_eq!(vault.list_secrets().unwrap().len(), 1);
    }

    #[test]
    fn delete_reports_whether_removed() {
        let vault = test_vault();
        vault
            .put_secret("oauth:google_calendar", &serde_json::json!({}), None)
            .unwrap();

        assert!(vault.delete_secret("oauth:google_calendar").unwrap());
        assert!(!vault.delete_secret("oauth:google_calendar").unwrap());
        assert!(vault.get_secret("oauth:google_calendar").unwrap().is_none());
    }

    #[test]
    fn list_is_sorted_and_keeps_expiry() {
        let vault = test_vault();
        let expiry = Utc.timestamp_opt(1_900_000_000, 0).single().unwrap();
        vault
            .put_secret("oauth:google_calendar", &serde_json::json!({}), Some(expiry))
            .unwrap();
        vault
            .put_secret("oauth:gmail", &serde_json::json!({}), None)
            .unwrap();

        let list = vault.list_secrets().unwrap();
        let keys: Vec<&str> = list.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["oauth:gmail", "oauth:google_calendar"]);
        assert_eq!(list[1].expires_at, Some(expiry));
    }

    #[test]
    fn debug_redacts_payload() {
        let vault = test_vault();
        vault
            .put_secret("oauth:gmail", &serde_json::json!({ "access_token": "ya29.secret" }), None)
            .unwrap();
        let record = vault.get_secret("oauth:gmail").unwrap().unwrap();

        let rendered = format!("{record:?}");
        assert!(!rendered.contains("ya29.secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
