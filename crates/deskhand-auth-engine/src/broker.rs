//! Credential acquisition for a named provider.
//!
//! [`CredentialBroker::acquire`] turns whatever is in the credential store
//! into a ready-to-use [`AuthorizedClient`], refreshing or re-running the
//! consent flow as needed. Both storage and the authorization server are
//! injected so the lifecycle logic can be exercised without a browser.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::authorization::AuthorizationServer;
use crate::client::AuthorizedClient;
use crate::client_secret::ClientSecret;
use crate::credential::{Credential, ScopeSet};
use crate::error::Result;
use crate::provider::ProviderSpec;
use crate::store::CredentialStore;

/// What the store currently holds for a provider, as seen by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Nothing usable is stored; the next acquire runs the consent flow.
    Absent,
    Valid {
        expires_at: Option<DateTime<Utc>>,
    },
    Expired {
        refreshable: bool,
    },
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => f.write_str("not authorized"),
            Self::Valid {
                expires_at: Some(at),
            } => write!(f, "valid until {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            Self::Valid { expires_at: None } => f.write_str("valid"),
            Self::Expired { refreshable: true } => f.write_str("expired (refreshable)"),
            Self::Expired { refreshable: false } => {
                f.write_str("expired (re-authorization needed)")
            }
        }
    }
}

/// Owns the token lifecycle for every provider.
pub struct CredentialBroker {
    store: Arc<dyn CredentialStore>,
    server: Arc<dyn AuthorizationServer>,
    client_secret_path: PathBuf,
    http: reqwest::Client,
}

impl CredentialBroker {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        server: Arc<dyn AuthorizationServer>,
        client_secret_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            server,
            client_secret_path: client_secret_path.into(),
            http: reqwest::Client::new(),
        }
    }

    /// HTTP client handed to every [`AuthorizedClient`] this broker builds.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn client_secret_path(&self) -> &Path {
        &self.client_secret_path
    }

    /// Return a client bound to a valid credential for `provider`.
    ///
    /// # Errors
    ///
    /// Fails when the client-secret descriptor cannot be loaded, when the
    /// interactive flow fails, or when a new credential cannot be saved.
    /// A rejected refresh is never returned; it falls back to consent.
    pub async fn acquire(&self, provider: &ProviderSpec) -> Result<AuthorizedClient> {
        let required = provider.scope_set();

        // Step 1: The descriptor is needed for refresh and consent alike.
        let secret = ClientSecret::load(&self.client_secret_path)?;

        // Step 2: Whatever is stored, if it is usable for these scopes.
        let stored = self.load_usable(provider, &required);

        let credential = match stored {
            // Step 3: Valid as-is.
            Some(credential) if credential.is_valid() => {
                tracing::info!(provider = provider.name, "using stored credential");
                credential
            }
            // Step 4: Expired with a refresh token; one exchange, then consent.
            Some(credential) if credential.can_refresh() => {
                match self.refresh(provider, &secret, credential).await? {
                    Some(refreshed) => refreshed,
                    None => self.authorize(provider, &secret, &required).await?,
                }
            }
            Some(_) => {
                tracing::info!(
                    provider = provider.name,
                    "stored credential expired without refresh token, re-authorizing"
                );
                self.authorize(provider, &secret, &required).await?
            }
            None => self.authorize(provider, &secret, &required).await?,
        };

        // Step 5: Bind a client.
        Ok(
            AuthorizedClient::new(provider.name, &credential, provider.api_base_url()?)
                .with_http_client(self.http.clone()),
        )
    }

    /// Forget the stored credential for `provider`.
    pub fn revoke(&self, provider: &ProviderSpec) -> Result<()> {
        self.store.delete(provider.name)?;
        tracing::info!(provider = provider.name, "credential revoked");
        Ok(())
    }

    /// Report the stored credential's state without touching the network.
    pub fn status(&self, provider: &ProviderSpec) -> CredentialStatus {
        match self.load_usable(provider, &provider.scope_set()) {
            None => CredentialStatus::Absent,
            Some(credential) if credential.is_valid() => CredentialStatus::Valid {
                expires_at: credential.expires_at,
            },
            Some(credential) => CredentialStatus::Expired {
                refreshable: credential.can_refresh(),
            },
        }
    }

    /// Load the stored credential, treating read errors and scope drift as
    /// absence.
    fn load_usable(&self, provider: &ProviderSpec, required: &ScopeSet) -> Option<Credential> {
        let credential = match self.store.load(provider.name) {
            Ok(Some(credential)) => credential,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(
                    provider = provider.name,
                    error = %e,
                    "stored credential unreadable, treating as absent"
                );
                return None;
            }
        };

        if !credential.matches_scopes(required) {
            tracing::info!(
                provider = provider.name,
                "stored credential was granted different scopes, treating as absent"
            );
            return None;
        }

        Some(credential)
    }

    /// Refresh and persist. `Ok(None)` means fall back to consent; only a
    /// failed save of the refreshed credential is an error.
    async fn refresh(
        &self,
        provider: &ProviderSpec,
        secret: &ClientSecret,
        mut credential: Credential,
    ) -> Result<Option<Credential>> {
        let Some(refresh_token) = credential.refresh_token.clone() else {
            return Ok(None);
        };

        tracing::info!(provider = provider.name, "access token expired, refreshing");

        match self.server.refresh(secret, &refresh_token).await {
            Ok(grant) => {
                credential.apply_refresh(grant);
                self.store.save(provider.name, &credential)?;
                tracing::info!(provider = provider.name, "credential refreshed");
                Ok(Some(credential))
            }
            Err(e) => {
                tracing::warn!(
                    provider = provider.name,
                    error = %e,
                    "refresh rejected, discarding stored credential"
                );
                if let Err(e) = self.store.delete(provider.name) {
                    tracing::warn!(
                        provider = provider.name,
                        error = %e,
                        "failed to discard credential"
                    );
                }
                Ok(None)
            }
        }
    }

    async fn authorize(
        &self,
        provider: &ProviderSpec,
        secret: &ClientSecret,
        required: &ScopeSet,
    ) -> Result<Credential> {
        tracing::info!(provider = provider.name, "starting interactive authorization");

        let credential = self.server.authorize(secret, required).await?;
        self.store.save(provider.name, &credential)?;

        tracing::info!(provider = provider.name, "authorization completed");
        Ok(credential)
    }
}
