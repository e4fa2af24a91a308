//! The OAuth client-secret descriptor downloaded from Google Cloud Console.
//!
//! The file is a JSON object with either an `installed` (desktop app) or a
//! `web` section:
//!
//! ```json
//! { "installed": { "client_id": "...", "client_secret": "...",
//!                  "auth_uri": "...", "token_uri": "...",
//!                  "redirect_uris": ["http://localhost"] } }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{AuthEngineError, Result};

pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client identity and endpoints.
#[derive(Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,

    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct DescriptorFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Read and validate the descriptor at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthEngineError::ClientSecret`] when the file is missing,
    /// unreadable, not JSON, has neither section, or has an empty client id.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let raw = std::fs::read_to_string(path).map_err(|e| AuthEngineError::ClientSecret {
            path: display.clone(),
            reason: e.to_string(),
        })?;

        Self::from_json(&raw).map_err(|reason| AuthEngineError::ClientSecret {
            path: display,
            reason,
        })
    }

    /// Parse a descriptor from its JSON text.
    pub fn from_json(raw: &str) -> std::result::Result<Self, String> {
        let file: DescriptorFile =
            serde_json::from_str(raw).map_err(|e| format!("malformed JSON: {e}"))?;

        let secret = file
            .installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" section".to_string())?;

        if secret.client_id.trim().is_empty() {
            return Err("client_id is empty".to_string());
        }

        Ok(secret)
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecret")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
