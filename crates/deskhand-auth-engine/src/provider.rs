//! Built-in Google providers and the scopes each one requires.

use url::Url;

use crate::credential::ScopeSet;
use crate::error::{AuthEngineError, Result};

/// A provider's name (also its storage key), scopes and REST base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSpec {
    pub name: &'static str,
    pub scopes: &'static [&'static str],
    pub api_base: &'static str,
}

/// Gmail v1.
pub const GMAIL: ProviderSpec = ProviderSpec {
    name: "gmail",
    scopes: &[
        "https://www.googleapis.com/auth/gmail.modify",
        "https://www.googleapis.com/auth/gmail.compose",
        "https://www.googleapis.com/auth/gmail.send",
        "https://www.googleapis.com/auth/gmail.labels",
        "https://www.googleapis.com/auth/gmail.metadata",
    ],
    api_base: "https://gmail.googleapis.com/gmail/v1/",
};

/// Google Calendar v3.
pub const GOOGLE_CALENDAR: ProviderSpec = ProviderSpec {
    name: "google_calendar",
    scopes: &[
        "https://www.googleapis.com/auth/calendar",
        "https://www.googleapis.com/auth/calendar.events",
    ],
    api_base: "https://www.googleapis.com/calendar/v3/",
};

/// Every provider Deskhand knows about.
pub const ALL: &[ProviderSpec] = &[GMAIL, GOOGLE_CALENDAR];

impl ProviderSpec {
    /// Look up a built-in provider by name.
    pub fn by_name(name: &str) -> Result<&'static ProviderSpec> {
        ALL.iter()
            .find(|p| p.name == name)
            .ok_or_else(|| AuthEngineError::UnknownProvider {
                name: name.to_string(),
            })
    }

    pub fn scope_set(&self) -> ScopeSet {
        self.scopes.iter().map(|s| s.to_string()).collect()
    }

    pub fn api_base_url(&self) -> Result<Url> {
        Ok(Url::parse(self.api_base)?)
    }
}

impl std::fmt::Display for ProviderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}
