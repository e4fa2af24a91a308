//! Master key file handling.
//!
//! The vault master key is 32 random bytes kept in a file next to the
//! database. On Unix the file is created with mode `0600`.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::crypto::{KEY_LEN, random_bytes};
use crate::error::{Result, VaultError};

/// Load the master key at `path`, generating and persisting a new one if the
/// file does not exist yet.
///
/// # Errors
///
/// Returns [`VaultError::InvalidMasterKey`] if the file exists but is not
/// exactly [`KEY_LEN`] bytes long.
pub fn load_or_create(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();

    match fs::read(path) {
        Ok(bytes) => {
            if bytes.len() != KEY_LEN {
                return Err(VaultError::InvalidMasterKey {
                    path: path.display().to_string(),
                    reason: format!("expected {KEY_LEN} bytes, found {}", bytes.len()),
                });
            }
            tracing::debug!(path = %path.display(), "loaded vault master key");
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => create(path),
        Err(e) => Err(e.into()),
    }
}

fn create(path: &Path) -> Result<Vec<u8>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let key = random_bytes(KEY_LEN)?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(&key)?;
    file.sync_all()?;

    tracing::info!(path = %path.display(), "generated new vault master key");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_then_reloads_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("master.key");

        let first = load_or_create(&path).unwrap();
        assert_eq!(first.len(), KEY_LEN);

        let second = load_or_create(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.key");
        fs::write(&path, b"too short").unwrap();

        assert!(matches!(
            load_or_create(&path),
            Err(VaultError::InvalidMasterKey { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn new_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.key");
        load_or_create(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
