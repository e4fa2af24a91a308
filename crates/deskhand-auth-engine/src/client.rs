//! A request builder bound to one provider and one access token.

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use url::Url;

use crate::credential::{Credential, EXPIRY_MARGIN_SECS};
use crate::error::{AuthEngineError, Result};

/// Issues authenticated requests against a provider's REST API.
///
/// The token is fixed for the lifetime of the client; callers go back to the
/// broker for a fresh client once [`is_expired`](Self::is_expired) flips.
#[derive(Clone)]
pub struct AuthorizedClient {
    provider: String,
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
    api_base: Url,
    http: reqwest::Client,
}

impl AuthorizedClient {
    pub fn new(provider: impl Into<String>, credential: &Credential, api_base: Url) -> Self {
        Self {
            provider: provider.into(),
            access_token: credential.access_token.clone(),
            expires_at: credential.expires_at,
            api_base,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                Utc::now().timestamp() >= expires_at.timestamp() - EXPIRY_MARGIN_SECS
            }
            None => false,
        }
    }

    /// Resolve `path` relative to the API base.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.api_base.join(path.trim_start_matches('/'))?)
    }

    /// Append `segments` to the API base, percent-encoding each one.
    ///
    /// Use this whenever a segment comes from caller input (message ids,
    /// event ids).
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| AuthEngineError::InvalidConfig {
                reason: format!("api base {} cannot carry a path", self.api_base),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request to an already-resolved URL with the bearer token
    /// attached.
    pub fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(provider = %self.provider, method = %method, url = %url, "api request");
        self.http
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    /// Start a request to `path` relative to the API base.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        Ok(self.request_url(method, url))
    }

    pub fn get(&self, path: &str) -> Result<RequestBuilder> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> Result<RequestBuilder> {
        self.request(Method::POST, path)
    }

    pub fn delete(&self, path: &str) -> Result<RequestBuilder> {
        self.request(Method::DELETE, path)
    }
}

impl std::fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("provider", &self.provider)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}
