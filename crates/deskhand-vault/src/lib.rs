//! Encrypted secret storage for Deskhand.
//!
//! OAuth credentials are the only long-lived secrets Deskhand keeps on disk.
//! This crate stores them in a small SQLite database with every payload
//! sealed by AES-256-GCM under a per-installation master key.
//!
//! # Modules
//!
//! - [`crypto`] -- AES-256-GCM sealing and random byte generation.
//! - [`master_key`] -- load-or-create the master key file.
//! - [`store`] -- SQLite-backed encrypted record CRUD.
//! - [`error`] -- Unified error types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use deskhand_vault::{master_key, Vault};
//!
//! # fn example() -> deskhand_vault::Result<()> {
//! let key = master_key::load_or_create("data/master.key")?;
//! let vault = Vault::open("data/vault.db", &key)?;
//!
//! vault.put_secret(
//!     "oauth:gmail",
//!     &serde_json::json!({ "access_token": "ya29..." }),
//!     None,
//! )?;
//!
//! let record = vault.get_secret("oauth:gmail")?;
//! assert!(record.is_some());
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod master_key;
pub mod store;

pub use error::{Result, VaultError};
pub use store::{SecretRecord, SecretSummary, Vault};
