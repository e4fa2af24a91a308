//! Core adapter trait and supporting types.
//!
//! Every provider adapter implements [`Adapter`], giving the agent runtime a
//! uniform way to discover tools and invoke them.

use async_trait::async_trait;
use deskhand_auth_engine::ProviderSpec;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// The category of service an adapter provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    /// Mail and other messaging services.
    Messaging,
    /// Calendars and other productivity tools.
    Productivity,
}

impl std::fmt::Display for AdapterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Messaging => write!(f, "messaging"),
            Self::Productivity => write!(f, "productivity"),
        }
    }
}

/// A tool exposed by an adapter that the agent can invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Machine-readable tool name (e.g. `gmail_send_email`).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    pub parameters: serde_json::Value,
}

/// Authentication requirements for an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequirement {
    /// The credential provider name (e.g. `gmail`).
    pub provider: String,
    /// The scopes required.
    pub scopes: Vec<String>,
}

impl From<&ProviderSpec> for AuthRequirement {
    fn from(spec: &ProviderSpec) -> Self {
        Self {
            provider: spec.name.to_string(),
            scopes: spec.scopes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// The agent-facing adapter interface.
///
/// [`Adapter::execute_tool`] always returns the string the agent sees.
/// Failures are rendered as `❌ Failed to ...` messages rather than
/// propagated.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Return the unique identifier for this adapter instance.
    fn id(&self) -> &str;

    /// Return the category of service this adapter provides.
    fn adapter_type(&self) -> AdapterType;

    /// The provider whose credential this adapter's client is bound to.
    fn provider(&self) -> &'static ProviderSpec;

    /// Return the list of tools this adapter exposes.
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Execute a named tool with the given JSON parameters.
    async fn execute_tool(&self, name: &str, params: serde_json::Value) -> String;

    /// Return the authentication requirements for this adapter.
    fn required_auth(&self) -> AuthRequirement {
        AuthRequirement::from(self.provider())
    }
}
