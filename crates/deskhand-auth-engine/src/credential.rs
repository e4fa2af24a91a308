//! The persisted OAuth credential and its lifecycle states.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered set of OAuth scope strings.
pub type ScopeSet = BTreeSet<String>;

/// Tokens expiring within this many seconds are treated as already expired.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Access/refresh token pair plus metadata for one provider.
///
/// Expiry is kept at second precision so a stored credential reloads equal
/// to what was saved.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default)]
    pub scopes: ScopeSet,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credential {
    /// Whether the access token is expired (or about to be) at `now`.
    ///
    /// A credential without an expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now.timestamp() >= expires_at.timestamp() - EXPIRY_MARGIN_SECS,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Usable as-is: a non-empty access token that is not expired.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether this credential was granted exactly `required`.
    pub fn matches_scopes(&self, required: &ScopeSet) -> bool {
        &self.scopes == required
    }

    /// Fold a refresh response into this credential.
    ///
    /// The access token and expiry are replaced. The refresh token is only
    /// replaced when the server issued a new one, and the scope set is left
    /// untouched.
    pub fn apply_refresh(&mut self, grant: TokenGrant) {
        self.access_token = grant.access_token;
        self.expires_at = grant.expires_at;
        self.token_type = grant.token_type;
        if let Some(refresh_token) = grant.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Tokens issued by a token endpoint in response to a code or refresh
/// exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub token_type: String,
    /// Scopes the server reports as granted; empty when it did not say.
    pub scopes: ScopeSet,
}

impl TokenGrant {
    /// Turn a fresh grant into a credential recorded under `required` scopes.
    pub fn into_credential(self, required: &ScopeSet) -> Credential {
        if !self.scopes.is_empty() && &self.scopes != required {
            tracing::debug!(
                granted = self.scopes.len(),
                required = required.len(),
                "granted scopes differ from requested scopes"
            );
        }

        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at,
            token_type: self.token_type,
            scopes: required.clone(),
        }
    }
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Collect scope strings into a [`ScopeSet`].
pub fn scope_set<I, S>(scopes: I) -> ScopeSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    scopes.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credential(expires_in: Option<i64>, refresh: Option<&str>) -> Credential {
        Credential {
            access_token: "ya29.access".into(),
            refresh_token: refresh.map(String::from),
            expires_at: expires_in.map(|s| Utc::now() + Duration::seconds(s)),
            token_type: "Bearer".into(),
            scopes: scope_set(["a", "b"]),
        }
    }

    #[test]
    fn future_expiry_is_valid() {
        assert!(credential(Some(3600), None).is_valid());
    }

    #[test]
    fn past_expiry_is_expired() {
        let cred = credential(Some(-3600), None);
        assert!(cred.is_expired());
        assert!(!cred.is_valid());
    }

    #[test]
    fn expiry_within_margin_counts_as_expired() {
        assert!(credential(Some(30), None).is_expired());
        assert!(!credential(Some(120), None).is_expired());
    }

    #[test]
    fn missing_expiry_never_expires() {
        assert!(credential(None, None).is_valid());
    }

    #[test]
    fn empty_access_token_is_not_valid() {
        let mut cred = credential(Some(3600), None);
        cred.access_token.clear();
        assert!(!cred.is_valid());
    }

    #[test]
    fn can_refresh_requires_non_empty_token() {
        assert!(credential(None, Some("1//r")).can_refresh());
        assert!(!credential(None, Some("")).can_refresh());
        assert!(!credential(None, None).can_refresh());
    }

    #[test]
    fn apply_refresh_keeps_old_refresh_token() {
        let mut cred = credential(Some(-10), Some("1//old"));
        let expiry = Utc::now() + Duration::hours(1);
        cred.apply_refresh(TokenGrant {
            access_token: "ya29.new".into(),
            refresh_token: None,
            expires_at: Some(expiry),
            token_type: "Bearer".into(),
            scopes: ScopeSet::new(),
        });

        assert_eq!(cred.access_token, "ya29.new");
        assert_eq!(cred.refresh_token.as_deref(), Some("1//old"));
        assert_eq!(cred.expires_at, Some(expiry));
        assert_eq!(cred.scopes, scope_set(["a", "b"]));
    }

    #[test]
    fn apply_refresh_takes_rotated_refresh_token() {
        let mut cred = credential(Some(-10), Some("1//old"));
        cred.apply_refresh(TokenGrant {
            access_token: "ya29.new".into(),
            refresh_token: Some("1//rotated".into()),
            expires_at: None,
            token_type: "Bearer".into(),
            scopes: ScopeSet::new(),
        });
        assert_eq!(cred.refresh_token.as_deref(), Some("1//rotated"));
    }

    #[test]
    fn grant_records_required_scopes() {
        let grant = TokenGrant {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: None,
            token_type: "Bearer".into(),
            scopes: scope_set(["only-one"]),
        };
        let required = scope_set(["x", "y"]);
        assert_eq!(grant.into_credential(&required).scopes, required);
    }

    #[test]
    fn debug_hides_tokens() {
        let rendered = format!("{:?}", credential(Some(60), Some("1//secret")));
        assert!(!rendered.contains("ya29.access"));
        assert!(!rendered.contains("1//secret"));
    }

    #[test]
    fn serde_defaults_fill_optional_fields() {
        let cred: Credential = serde_json::from_str(r#"{"access_token":"t"}"#).unwrap();
        assert_eq!(cred.token_type, "Bearer");
        assert!(cred.refresh_token.is_none());
        assert!(cred.expires_at.is_none());
        assert!(cred.scopes.is_empty());
    }
}
