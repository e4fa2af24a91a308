//! Toolkit registry: maps toolkit names to providers and adapters.

use deskhand_adapters::{Adapter, CalendarAdapter, GmailAdapter, ToolDefinition};
use deskhand_auth_engine::{AuthorizedClient, ProviderSpec, provider};
use serde::{Deserialize, Serialize};

/// A named group of tools backed by one provider credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toolkit {
    Gmail,
    GoogleCalendar,
}

impl Toolkit {
    pub const ALL: [Toolkit; 2] = [Toolkit::Gmail, Toolkit::GoogleCalendar];

    pub fn name(self) -> &'static str {
        self.provider().name
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn provider(self) -> &'static ProviderSpec {
        match self {
            Self::Gmail => &provider::GMAIL,
            Self::GoogleCalendar => &provider::GOOGLE_CALENDAR,
        }
    }

    fn tool_prefix(self) -> &'static str {
        match self {
            Self::Gmail => "gmail_",
            Self::GoogleCalendar => "calendar_",
        }
    }

    pub fn tool_definitions(self) -> Vec<ToolDefinition> {
        match self {
            Self::Gmail => GmailAdapter::tool_definitions(),
            Self::GoogleCalendar => CalendarAdapter::tool_definitions(),
        }
    }

    /// The toolkit that serves `tool`, if any.
    pub fn for_tool(tool: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| tool.starts_with(t.tool_prefix()))
    }

    pub fn adapter(self, client: AuthorizedClient) -> Box<dyn Adapter> {
        match self {
            Self::Gmail => Box::new(GmailAdapter::from_client(client)),
            Self::GoogleCalendar => Box::new(CalendarAdapter::from_client(client)),
        }
    }
}

impl std::fmt::Display for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Every tool definition of `toolkits`, in order.
pub fn manifest(toolkits: &[Toolkit]) -> Vec<ToolDefinition> {
    toolkits.iter().flat_map(|t| t.tool_definitions()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_providers() {
        assert_eq!(Toolkit::Gmail.name(), "gmail");
        assert_eq!(Toolkit::GoogleCalendar.name(), "google_calendar");
        assert_eq!(Toolkit::by_name("google_calendar"), Some(Toolkit::GoogleCalendar));
        assert_eq!(Toolkit::by_name("slack"), None);
    }

    #[test]
    fn tools_route_by_prefix() {
        assert_eq!(Toolkit::for_tool("gmail_send_email"), Some(Toolkit::Gmail));
        assert_eq!(Toolkit::for_tool("calendar_list_events"), Some(Toolkit::GoogleCalendar));
        assert_eq!(Toolkit::for_tool("shell_execute"), None);
    }

    #[test]
    fn every_manifest_tool_routes_back() {
        for tool in manifest(&Toolkit::ALL) {
            assert!(Toolkit::for_tool(&tool.name).is_some(), "{}", tool.name);
        }
        assert_eq!(manifest(&[Toolkit::GoogleCalendar]).len(), 5);
    }

    #[test]
    fn serde_uses_snake_case() {
        let toolkits: Vec<Toolkit> =
            serde_json::from_str(r#"["gmail","google_calendar"]"#).unwrap();
        assert_eq!(toolkits, Toolkit::ALL.to_vec());
    }
}
