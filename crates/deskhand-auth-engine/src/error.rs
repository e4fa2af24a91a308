//! Error types for the authentication engine.
//!
//! All fallible operations in this crate return [`AuthEngineError`]. The
//! variants split cleanly into configuration problems (bad descriptor,
//! unknown provider), authorization problems (rejected grant, failed
//! consent) and transport/storage failures.

/// Unified error type for the Deskhand authentication engine.
#[derive(Debug, thiserror::Error)]
pub enum AuthEngineError {
    /// A configuration value is missing or malformed.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The OAuth client-secret descriptor could not be used.
    #[error("client secret descriptor {path}: {reason}")]
    ClientSecret { path: String, reason: String },

    /// No provider with the given name is known.
    #[error("unknown provider: {name}")]
    UnknownProvider { name: String },

    /// The token endpoint rejected a code or refresh token.
    #[error("invalid grant: {reason}")]
    InvalidGrant { reason: String },

    /// The interactive authorization flow failed.
    #[error("authorization flow failed: {reason}")]
    FlowFailed { reason: String },

    /// The loopback callback did not arrive in time.
    #[error("OAuth callback timed out after {timeout_secs}s")]
    CallbackTimeout { timeout_secs: u64 },

    /// A credential store could not complete an operation.
    #[error("credential storage error: {reason}")]
    Storage { reason: String },

    /// HTTP transport error.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Error from the encrypted vault backend.
    #[error("vault error: {0}")]
    VaultError(#[from] deskhand_vault::VaultError),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem or socket error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error.
    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Convenience alias used throughout the auth engine crate.
pub type Result<T> = std::result::Result<T, AuthEngineError>;
