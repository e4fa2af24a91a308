//! Authentication engine for Deskhand.
//!
//! Gets a usable Google access token for a named provider and keeps it
//! usable:
//!
//! - **Credential broker**: load, validate, refresh, or re-consent.
//! - **OAuth 2.0 Authorization Code Flow** with PKCE (RFC 7636) and a
//!   loopback redirect listener.
//! - **Credential stores**: JSON file, encrypted vault, or memory.
//!
//! # Architecture
//!
//! ```text
//! CredentialBroker
//! ├── CredentialStore      (file | vault | memory)
//! ├── AuthorizationServer  (GoogleAuthorizationServer)
//! │   ├── OAuthFlow        (authorization code + PKCE, refresh)
//! │   └── CallbackServer   (loopback HTTP listener)
//! └── AuthorizedClient     (bearer-token request builder)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use deskhand_auth_engine::{
//!     CredentialBroker, FileCredentialStore, GoogleAuthorizationServer, provider,
//! };
//!
//! # async fn example() -> deskhand_auth_engine::Result<()> {
//! let broker = CredentialBroker::new(
//!     Arc::new(FileCredentialStore::new("data/tokens.json")),
//!     Arc::new(GoogleAuthorizationServer::default()),
//!     "credentials.json",
//! );
//!
//! let client = broker.acquire(&provider::GMAIL).await?;
//! let _labels = client.get("users/me/labels")?.send().await?;
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod broker;
pub mod callback;
pub mod client;
pub mod client_secret;
pub mod credential;
pub mod error;
pub mod oauth;
pub mod provider;
pub mod store;

pub use authorization::{AuthorizationServer, GoogleAuthorizationServer};
pub use broker::{CredentialBroker, CredentialStatus};
pub use callback::CallbackServer;
pub use client::AuthorizedClient;
pub use client_secret::ClientSecret;
pub use credential::{Credential, ScopeSet, TokenGrant};
pub use error::{AuthEngineError, Result};
pub use oauth::{OAuthConfig, OAuthFlow};
pub use provider::ProviderSpec;
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, VaultCredentialStore};
