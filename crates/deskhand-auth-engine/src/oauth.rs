//! OAuth 2.0 Authorization Code Flow with PKCE.
//!
//! Implements the code flow from RFC 6749 with Proof Key for Code Exchange
//! (RFC 7636). Google's installed-app flavour additionally needs
//! `access_type=offline` and `prompt=consent` so that a refresh token is
//! issued on every consent.
//!
//! # Flow Overview
//!
//! 1. Generate a PKCE code verifier and code challenge.
//! 2. Build an authorization URL and send the user there.
//! 3. Receive the authorization code via the loopback callback.
//! 4. Exchange the code + verifier for tokens.
//! 5. Refresh the access token when it expires.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use url::Url;

use crate::client_secret::ClientSecret;
use crate::credential::{ScopeSet, TokenGrant};
use crate::error::{AuthEngineError, Result};

/// Length of the PKCE code verifier in bytes (before base64 encoding).
const PKCE_VERIFIER_BYTES: usize = 32;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything the flow needs to talk to one authorization server.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,

    /// Present for Google desktop clients even though they are public.
    pub client_secret: Option<String>,

    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: ScopeSet,
}

impl OAuthConfig {
    /// Build a config from a client-secret descriptor.
    pub fn from_client_secret(
        secret: &ClientSecret,
        redirect_uri: impl Into<String>,
        scopes: ScopeSet,
    ) -> Self {
        Self {
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            auth_url: secret.auth_uri.clone(),
            token_url: secret.token_uri.clone(),
            redirect_uri: redirect_uri.into(),
            scopes,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Raw token response from the authorization server.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
}

impl TokenResponse {
    fn into_grant(self, now: DateTime<Utc>) -> TokenGrant {
        // Second precision so stored credentials compare equal after reload.
        let expires_at = self
            .expires_in
            .and_then(|secs| DateTime::from_timestamp(now.timestamp() + secs, 0));

        let scopes = self
            .scope
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        TokenGrant {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scopes,
        }
    }
}

/// Raw error response from the authorization server.
#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

// ---------------------------------------------------------------------------
// PKCE helpers
// ---------------------------------------------------------------------------

/// Generate a PKCE code verifier (random 32 bytes, base64url encoded).
///
/// # Errors
///
/// Returns an error if the system CSPRNG fails.
pub fn generate_pkce_verifier() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; PKCE_VERIFIER_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| AuthEngineError::FlowFailed {
            reason: "failed to generate PKCE verifier: CSPRNG error".to_string(),
        })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// `challenge = BASE64URL(SHA256(verifier))`
pub fn pkce_challenge(verifier: &str) -> String {
    let hash = digest::digest(&digest::SHA256, verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash.as_ref())
}

// ---------------------------------------------------------------------------
// OAuth flow
// ---------------------------------------------------------------------------

/// Stateless helper for the authorization-code flow against one server.
pub struct OAuthFlow {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl OAuthFlow {
    pub fn new(config: OAuthConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Reuse an existing HTTP client (connection pool, proxy settings).
    pub fn with_client(config: OAuthConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the consent URL the user should visit.
    ///
    /// # Errors
    ///
    /// Returns [`AuthEngineError::UrlParse`] if the configured `auth_url` is
    /// not a valid URL.
    pub fn authorization_url(&self, state: &str, code_challenge: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.auth_url)?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &self.config.client_id);
            params.append_pair("redirect_uri", &self.config.redirect_uri);
            params.append_pair("state", state);
            params.append_pair("code_challenge", code_challenge);
            params.append_pair("code_challenge_method", "S256");
            params.append_pair("access_type", "offline");
            params.append_pair("prompt", "consent");

            if !self.config.scopes.is_empty() {
                let scope = self
                    .config
                    .scopes
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(" ");
                params.append_pair("scope", &scope);
            }
        }

        Ok(url.to_string())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`AuthEngineError::InvalidGrant`] if the server rejects the
    /// code, or [`AuthEngineError::NetworkError`] on transport failure.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenGrant> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        tracing::debug!(token_url = %self.config.token_url, "exchanging authorization code");
        self.post_token_request(&params).await
    }

    /// Obtain a new access token with a refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthEngineError::InvalidGrant`] if the refresh token is
    /// invalid or revoked.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        tracing::debug!(token_url = %self.config.token_url, "refreshing access token");
        self.post_token_request(&params).await
    }

    async fn post_token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await?;

        Self::parse_token_response(response).await
    }

    async fn parse_token_response(response: reqwest::Response) -> Result<TokenGrant> {
        let status = response.status();

        if status.is_success() {
            let token_response: TokenResponse = response.json().await?;
            tracing::debug!("token exchange successful");
            return Ok(token_response.into_grant(Utc::now()));
        }

        let body = response.text().await.unwrap_or_default();
        let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(error_response) => match error_response.error_description {
                Some(description) => format!("{}: {description}", error_response.error),
                None => error_response.error,
            },
            Err(_) => format!("HTTP {status}: {body}"),
        };
        Err(AuthEngineError::InvalidGrant { reason })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
