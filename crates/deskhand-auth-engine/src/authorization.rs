//! The token-endpoint and consent seam used by the broker.
//!
//! [`AuthorizationServer`] abstracts the two network interactions the broker
//! performs: exchanging a refresh token, and running the full interactive
//! consent flow. [`GoogleAuthorizationServer`] is the production
//! implementation; tests substitute their own.

use async_trait::async_trait;

use crate::callback::CallbackServer;
use crate::client_secret::ClientSecret;
use crate::credential::{Credential, ScopeSet, TokenGrant};
use crate::error::{AuthEngineError, Result};
use crate::oauth::{OAuthConfig, OAuthFlow, generate_pkce_verifier, pkce_challenge};

/// Default time allowed for the user to finish consent in the browser.
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

/// Token endpoint operations plus the interactive consent flow.
#[async_trait]
pub trait AuthorizationServer: Send + Sync {
    /// Exchange `refresh_token` for a new access token.
    async fn refresh(&self, secret: &ClientSecret, refresh_token: &str) -> Result<TokenGrant>;

    /// Run the interactive authorization-code flow for `scopes`.
    ///
    /// The returned credential carries exactly `scopes`.
    async fn authorize(&self, secret: &ClientSecret, scopes: &ScopeSet) -> Result<Credential>;
}

/// Google's OAuth endpoints driven through a loopback redirect.
#[derive(Debug, Clone)]
pub struct GoogleAuthorizationServer {
    client: reqwest::Client,
    callback_port: u16,
    callback_timeout_secs: u64,
    open_browser: bool,
}

impl Default for GoogleAuthorizationServer {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl GoogleAuthorizationServer {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            callback_port: 0,
            callback_timeout_secs: DEFAULT_CALLBACK_TIMEOUT_SECS,
            open_browser: true,
        }
    }

    /// Loopback port for the redirect; 0 lets the OS pick one.
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    pub fn with_callback_timeout(mut self, timeout_secs: u64) -> Self {
        self.callback_timeout_secs = timeout_secs;
        self
    }

    pub fn with_open_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    fn present_consent_url(&self, url: &str) {
        eprintln!("Please visit this URL to authorize Deskhand:\n\n  {url}\n");

        if self.open_browser
            && let Err(e) = open::that(url)
        {
            tracing::warn!(error = %e, "could not open a browser, use the printed URL");
        }
    }
}

#[async_trait]
impl AuthorizationServer for GoogleAuthorizationServer {
    async fn refresh(&self, secret: &ClientSecret, refresh_token: &str) -> Result<TokenGrant> {
        let redirect_uri = secret.redirect_uris.first().cloned().unwrap_or_default();
        let flow = OAuthFlow::with_client(
            OAuthConfig::from_client_secret(secret, redirect_uri, ScopeSet::new()),
            self.client.clone(),
        );
        flow.refresh_token(refresh_token).await
    }

    async fn authorize(&self, secret: &ClientSecret, scopes: &ScopeSet) -> Result<Credential> {
        let callback = CallbackServer::bind(self.callback_port).await?;
        let flow = OAuthFlow::with_client(
            OAuthConfig::from_client_secret(secret, callback.redirect_uri(), scopes.clone()),
            self.client.clone(),
        );

        let verifier = generate_pkce_verifier()?;
        let challenge = pkce_challenge(&verifier);
        let state = uuid::Uuid::now_v7().to_string();

        let auth_url = flow.authorization_url(&state, &challenge)?;
        tracing::info!(port = callback.port(), "waiting for user consent");
        self.present_consent_url(&auth_url);

        let (code, returned_state) = callback.wait_for_code(self.callback_timeout_secs).await?;

        if returned_state != state {
            return Err(AuthEngineError::FlowFailed {
                reason: "state parameter mismatch, possible CSRF".to_string(),
            });
        }

        let grant = flow.exchange_code(&code, &verifier).await?;
        tracing::info!("authorization code exchanged");
        Ok(grant.into_credential(scopes))
    }
}
