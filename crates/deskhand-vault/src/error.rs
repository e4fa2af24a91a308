//! Vault error types.
//!
//! Every public API in this crate returns [`VaultError`]. Variants carry
//! enough context for callers to tell a wrong key from a corrupt database
//! without inspecting strings.

/// Unified error type for the Deskhand secret vault.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Encryption failed (e.g. invalid key length, ring internal error).
    #[error("encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// Decryption failed (e.g. wrong key, corrupted ciphertext, bad nonce).
    #[error("decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    /// The master key file exists but does not hold a usable key.
    #[error("invalid master key at {path}: {reason}")]
    InvalidMasterKey { path: String, reason: String },

    /// Database schema migration failed.
    #[error("migration failed: {reason}")]
    MigrationFailed { reason: String },

    /// SQLite error from `rusqlite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error from the filesystem.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected internal errors.
    #[error("internal vault error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the vault crate.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = VaultError::DecryptionFailed {
            reason: "bad tag".into(),
        };
        assert_eq!(err.to_string(), "decryption failed: bad tag");
    }

    #[test]
    fn vault_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VaultError>();
    }
}
