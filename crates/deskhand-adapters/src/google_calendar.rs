//! Google Calendar adapter -- create, list, inspect and delete events on the
//! user's primary calendar.

use async_trait::async_trait;
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use deskhand_auth_engine::{AuthorizedClient, ProviderSpec, provider};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::api::{ApiResult, send_empty, send_json};
use crate::error::{AdapterError, Result, failure};
use crate::format::{format_clock, format_event_time};
use crate::params;
use crate::traits::{Adapter, AdapterType, ToolDefinition};

const CALENDAR_ID: &str = "primary";
const DEFAULT_DURATION_MINUTES: u32 = 60;
const DEFAULT_DAYS: u32 = 7;
const DEFAULT_MAX_RESULTS: u32 = 10;
const UNTITLED: &str = "(No title)";

/// Naive layouts tried for `start_time` before the free-form parser.
const NAIVE_LAYOUTS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M %p",
    "%Y-%m-%d %I:%M:%S %p",
];

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Start or end of an event. Timed events carry `date_time`, all-day events
/// carry `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    fn at(dt: &DateTime<FixedOffset>, time_zone: &str) -> Self {
        Self {
            date_time: Some(dt.to_rfc3339_opts(SecondsFormat::Secs, false)),
            date: None,
            time_zone: Some(time_zone.to_string()),
        }
    }

    /// `YYYY-MM-DD HH:MM AM`, or the raw value when it does not parse.
    pub fn display(&self) -> String {
        format_event_time(self.date_time.as_deref(), self.date.as_deref())
            .or_else(|| self.date_time.clone().or_else(|| self.date.clone()))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

impl Event {
    pub fn title(&self) -> &str {
        self.summary.as_deref().unwrap_or(UNTITLED)
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.is_empty())
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }
}

/// Body of an event insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
}

/// Time window for listing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub max_results: u32,
}

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// What the calendar tools need from a calendar provider. All calls target
/// the primary calendar.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn insert_event(&self, event: &NewEvent) -> ApiResult<Event>;
    async fn list_events(&self, window: &EventWindow) -> ApiResult<Vec<Event>>;
    async fn get_event(&self, id: &str) -> ApiResult<Event>;
    async fn delete_event(&self, id: &str) -> ApiResult<()>;
    async fn quick_add(&self, text: &str) -> ApiResult<Event>;
}

// ---------------------------------------------------------------------------
// Calendar REST client
// ---------------------------------------------------------------------------

/// [`CalendarApi`] over `https://www.googleapis.com/calendar/v3/`.
pub struct GoogleCalendarClient {
    client: AuthorizedClient,
}

impl GoogleCalendarClient {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    fn request(&self, method: Method, segments: &[&str]) -> ApiResult<reqwest::RequestBuilder> {
        let mut path = vec!["calendars", CALENDAR_ID, "events"];
        path.extend_from_slice(segments);
        let url = self.client.endpoint(&path)?;
        Ok(self.client.request_url(method, url))
    }
}

#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<Event>,
}

fn rfc3339_utc(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn insert_event(&self, event: &NewEvent) -> ApiResult<Event> {
        let request = self
            .request(Method::POST, &[])?
            .query(&[("sendUpdates", "all")])
            .json(event);
        send_json(request).await
    }

    async fn list_events(&self, window: &EventWindow) -> ApiResult<Vec<Event>> {
        let request = self.request(Method::GET, &[])?.query(&[
            ("timeMin", rfc3339_utc(&window.time_min)),
            ("timeMax", rfc3339_utc(&window.time_max)),
            ("maxResults", window.max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ]);
        let list: EventList = send_json(request).await?;
        Ok(list.items)
    }

    async fn get_event(&self, id: &str) -> ApiResult<Event> {
        send_json(self.request(Method::GET, &[id])?).await
    }

    async fn delete_event(&self, id: &str) -> ApiResult<()> {
        let request = self
            .request(Method::DELETE, &[id])?
            .query(&[("sendUpdates", "all")]);
        send_empty(request).await
    }

    async fn quick_add(&self, text: &str) -> ApiResult<Event> {
        let request = self
            .request(Method::POST, &["quickAdd"])?
            .query(&[("text", text), ("sendUpdates", "all")]);
        send_json(request).await
    }
}

// ---------------------------------------------------------------------------
// Start time parsing
// ---------------------------------------------------------------------------

/// Parse a `start_time` argument.
///
/// RFC 3339 input keeps its own offset. Naive date-times and bare dates
/// (midnight) are placed in `timezone`, an IANA name such as
/// `Europe/Berlin`. Anything the fixed layouts miss, such as
/// `September 17, 2025 10:09am` or `12 Feb 2025 19:17`, goes through
/// [`dateparser`] in the same zone.
pub fn parse_start_time(
    input: &str,
    timezone: &str,
) -> std::result::Result<DateTime<FixedOffset>, String> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| format!("unknown timezone `{timezone}`"))?;

    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt);
    }

    let naive = NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(input, layout).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });

    let Some(naive) = naive else {
        return dateparser::parse_with(input, &tz, NaiveTime::MIN)
            .map(|dt| dt.with_timezone(&tz).fixed_offset())
            .map_err(|_| {
                format!("cannot parse start time `{input}`; use YYYY-MM-DD HH:MM or RFC 3339")
            });
    };

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| format!("{input} does not exist in {timezone}"))
}

fn invalid_params(tool: &str, reason: impl Into<String>) -> AdapterError {
    AdapterError::InvalidParams {
        tool_name: tool.to_string(),
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Google Calendar tools for the agent.
pub struct CalendarAdapter {
    id: String,
    api: Box<dyn CalendarApi>,
}

impl CalendarAdapter {
    pub fn new(api: impl CalendarApi + 'static) -> Self {
        Self {
            id: "google_calendar".to_string(),
            api: Box::new(api),
        }
    }

    /// Adapter over the real Calendar API.
    pub fn from_client(client: AuthorizedClient) -> Self {
        Self::new(GoogleCalendarClient::new(client))
    }

    fn action(tool: &str) -> &'static str {
        match tool {
            "calendar_create_event" | "calendar_quick_add_event" => "create event",
            "calendar_list_events" => "list events",
            "calendar_get_event" => "get event",
            "calendar_delete_event" => "delete event",
            _ => "run tool",
        }
    }

    // -----------------------------------------------------------------------
    // Tool implementations
    // -----------------------------------------------------------------------

    async fn tool_create_event(&self, params: &Value) -> Result<String> {
        let tool = "calendar_create_event";
        let title = params::required_str(params, tool, "title")?;
        let raw_start = params::required_str(params, tool, "start_time")?;
        let duration =
            params::positive_int(params, tool, "duration_minutes", DEFAULT_DURATION_MINUTES)?;
        let guests = params::string_list(params, tool, "guests")?;
        let description = params::optional_str(params, tool, "description")?;
        let location = params::optional_str(params, tool, "location")?;
        let timezone = params::optional_str(params, tool, "timezone")?.unwrap_or("UTC");

        let start = parse_start_time(raw_start, timezone)
            .map_err(|reason| invalid_params(tool, reason))?;
        let end = Duration::try_minutes(i64::from(duration))
            .and_then(|d| start.checked_add_signed(d))
            .ok_or_else(|| invalid_params(tool, "`duration_minutes` is too large"))?;

        let event = NewEvent {
            summary: title.to_string(),
            location: location.map(str::to_string),
            description: description.map(str::to_string),
            start: EventTime::at(&start, timezone),
            end: EventTime::at(&end, timezone),
            attendees: guests
                .iter()
                .map(|email| Attendee {
                    email: email.clone(),
                    response_status: None,
                })
                .collect(),
        };

        let created = self.api.insert_event(&event).await?;
        info!(event_id = %created.id, attendees = guests.len(), "calendar event created");

        let mut out = String::from("✅ Event Created Successfully!\n\n");
        out.push_str(&format!("**Title**: {title}\n"));
        out.push_str(&format!("**Start**: {}\n", format_clock(&start)));
        out.push_str(&format!("**End**: {}\n", format_clock(&end)));
        if !guests.is_empty() {
            out.push_str(&format!("**Attendees**: {}\n", guests.join(", ")));
        }
        if let Some(location) = location {
            out.push_str(&format!("**Location**: {location}\n"));
        }
        if let Some(description) = description {
            out.push_str(&format!("**Description**: {description}\n"));
        }
        out.push_str(&format!("\n**Event ID**: `{}`", created.id));
        Ok(out)
    }

    async fn tool_list_events(&self, params: &Value) -> Result<String> {
        let tool = "calendar_list_events";
        let days = params::positive_int(params, tool, "days", DEFAULT_DAYS)?;
        let max_results =
            params::positive_int(params, tool, "max_results", DEFAULT_MAX_RESULTS)?;

        let now = Utc::now();
        let time_max = Duration::try_days(i64::from(days))
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| invalid_params(tool, "`days` is too large"))?;
        let window = EventWindow {
            time_min: now,
            time_max,
            max_results,
        };

        let events = self.api.list_events(&window).await?;
        if events.is_empty() {
            return Ok("📅 No upcoming events found.".to_string());
        }

        let mut out = format!("📅 **Upcoming Events** (Next {days} days)\n\n");
        for event in &events {
            out.push_str(&format!("### {}\n", event.title()));
            out.push_str(&format!("**When**: {}\n", event.start.display()));
            if let Some(location) = event.location() {
                out.push_str(&format!("**Where**: {location}\n"));
            }
            if !event.attendees.is_empty() {
                let emails: Vec<&str> = event.attendees.iter().map(|a| a.email.as_str()).collect();
                out.push_str(&format!("**Attendees**: {}\n", emails.join(", ")));
            }
            out.push_str(&format!("**Event ID**: `{}`\n\n", event.id));
        }
        Ok(out)
    }

    async fn tool_get_event(&self, params: &Value) -> Result<String> {
        let id = params::required_str(params, "calendar_get_event", "event_id")?;
        let event = self.api.get_event(id).await?;

        let mut out = String::from("📅 **Event Details**\n\n");
        out.push_str(&format!("### {}\n", event.title()));
        out.push_str(&format!("**Start**: {}\n", event.start.display()));
        out.push_str(&format!("**End**: {}\n", event.end.display()));
        if let Some(location) = event.location() {
            out.push_str(&format!("**Location**: {location}\n"));
        }
        if let Some(description) = event.description() {
            out.push_str(&format!("**Description**: {description}\n"));
        }
        if !event.attendees.is_empty() {
            out.push_str("\n**Attendees**:\n");
            for attendee in &event.attendees {
                let status = attendee.response_status.as_deref().unwrap_or("no response");
                out.push_str(&format!("- {} ({status})\n", attendee.email));
            }
        }
        out.push_str(&format!("\n**Event ID**: `{}`", event.id));
        Ok(out)
    }

    async fn tool_delete_event(&self, params: &Value) -> Result<String> {
        let id = params::required_str(params, "calendar_delete_event", "event_id")?;

        // Fetch first so a bad id fails before anything is deleted and the
        // summary can be echoed back.
        let event = self.api.get_event(id).await?;
        self.api.delete_event(id).await?;
        info!(event_id = %id, "calendar event deleted");

        Ok(format!("✅ Event '{}' has been deleted successfully", event.title()))
    }

    async fn tool_quick_add_event(&self, params: &Value) -> Result<String> {
        let text = params::required_str(params, "calendar_quick_add_event", "text")?;
        let event = self.api.quick_add(text).await?;
        info!(event_id = %event.id, "calendar event quick-added");

        let mut out = String::from("✅ **Event Created Successfully!**\n\n");
        out.push_str(&format!("**Title**: {}\n", event.title()));
        out.push_str(&format!("**When**: {}\n", event.start.display()));
        if let Some(location) = event.location() {
            out.push_str(&format!("**Where**: {location}\n"));
        }
        out.push_str(&format!("\n**Event ID**: `{}`", event.id));
        Ok(out)
    }

    /// Tool manifest, available without a client.
    pub fn tool_definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "calendar_create_event".into(),
                description: "Create an event on the user's primary calendar and invite guests"
                    .into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "description": "Title of the event" },
                        "start_time": {
                            "type": "string",
                            "description": "Start time, e.g. 2025-03-05 14:00, March 5, 2025 2:00pm, or RFC 3339"
                        },
                        "duration_minutes": { "type": "integer", "description": "Duration in minutes (default: 60)" },
                        "guests": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Attendee email addresses"
                        },
                        "description": { "type": "string", "description": "Description of the event" },
                        "location": { "type": "string", "description": "Location of the event" },
                        "timezone": { "type": "string", "description": "IANA timezone, e.g. Europe/Berlin (default: UTC)" }
                    },
                    "required": ["title", "start_time"]
                }),
            },
            ToolDefinition {
                name: "calendar_list_events".into(),
                description: "List upcoming events on the primary calendar".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "days": { "type": "integer", "description": "Number of days to look ahead (default: 7)" },
                        "max_results": { "type": "integer", "description": "Maximum number of events (default: 10)" }
                    },
                    "required": []
                }),
            },
            ToolDefinition {
                name: "calendar_get_event".into(),
                description: "Get the details of an event, including attendee responses".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "event_id": { "type": "string", "description": "ID of the event" }
                    },
                    "required": ["event_id"]
                }),
            },
            ToolDefinition {
                name: "calendar_delete_event".into(),
                description: "Delete an event and notify its attendees".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "event_id": { "type": "string", "description": "ID of the event to delete" }
                    },
                    "required": ["event_id"]
                }),
            },
            ToolDefinition {
                name: "calendar_quick_add_event".into(),
                description: "Create an event from a natural language description".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "e.g. 'Lunch with Sam tomorrow at 1pm at Cafe Luna'"
                        }
                    },
                    "required": ["text"]
                }),
            },
        ]
    }
}

#[async_trait]
impl Adapter for CalendarAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Productivity
    }

    fn provider(&self) -> &'static ProviderSpec {
        &provider::GOOGLE_CALENDAR
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        Self::tool_definitions()
    }

    async fn execute_tool(&self, name: &str, params: Value) -> String {
        let result = match name {
            "calendar_create_event" => self.tool_create_event(&params).await,
            "calendar_list_events" => self.tool_list_events(&params).await,
            "calendar_get_event" => self.tool_get_event(&params).await,
            "calendar_delete_event" => self.tool_delete_event(&params).await,
            "calendar_quick_add_event" => self.tool_quick_add_event(&params).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        };

        result.unwrap_or_else(|e| failure(Self::action(name), &e))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use deskhand_auth_engine::{Credential, ScopeSet};
    use url::Url;

    use crate::api::ApiError;

    #[derive(Default)]
    struct State {
        events: Vec<Event>,
        inserted: Option<NewEvent>,
        window: Option<EventWindow>,
        deleted: Vec<String>,
        quick_text: Option<String>,
    }

    /// Cloneable fake; clones share state so tests can inspect calls.
    #[derive(Clone, Default)]
    struct FakeCalendar {
        state: Arc<Mutex<State>>,
    }

    impl FakeCalendar {
        fn with_events(events: Vec<Event>) -> Self {
            let fake = Self::default();
            fake.state.lock().unwrap().events = events;
            fake
        }
    }

    #[async_trait]
    impl CalendarApi for FakeCalendar {
        async fn insert_event(&self, event: &NewEvent) -> ApiResult<Event> {
            self.state.lock().unwrap().inserted = Some(event.clone());
            Ok(Event {
                id: "evt123".into(),
                summary: Some(event.summary.clone()),
                ..Default::default()
            })
        }

        async fn list_events(&self, window: &EventWindow) -> ApiResult<Vec<Event>> {
            let mut state = self.state.lock().unwrap();
            state.window = Some(*window);
            Ok(state.events.clone())
        }

        async fn get_event(&self, id: &str) -> ApiResult<Event> {
            self.state
                .lock()
                .unwrap()
                .events
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or_else(|| ApiError::Status {
                    status: 404,
                    message: "Not Found".into(),
                })
        }

        async fn delete_event(&self, id: &str) -> ApiResult<()> {
            self.state.lock().unwrap().deleted.push(id.to_string());
            Ok(())
        }

        async fn quick_add(&self, text: &str) -> ApiResult<Event> {
            self.state.lock().unwrap().quick_text = Some(text.to_string());
            Ok(Event {
                id: "qa1".into(),
                summary: Some("Lunch with Sam".into()),
                location: Some("Cafe Luna".into()),
                start: EventTime {
                    date_time: Some("2025-03-02T13:00:00-08:00".into()),
                    ..Default::default()
                },
                ..Default::default()
            })
        }
    }

    fn standup() -> Event {
        Event {
            id: "e1".into(),
            summary: Some("Standup".into()),
            description: Some("Daily sync".into()),
            location: Some("Room 4".into()),
            start: EventTime {
                date_time: Some("2025-03-03T09:30:00+00:00".into()),
                ..Default::default()
            },
            end: EventTime {
                date_time: Some("2025-03-03T09:45:00+00:00".into()),
                ..Default::default()
            },
            attendees: vec![
                Attendee {
                    email: "a@example.com".into(),
                    response_status: Some("accepted".into()),
                },
                Attendee {
                    email: "b@example.com".into(),
                    response_status: None,
                },
            ],
        }
    }

    // -- Start time parsing --

    #[test]
    fn naive_start_is_localized() {
        let dt = parse_start_time("2025-07-01 14:00", "Europe/Berlin").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-07-01T14:00:00+02:00");

        let dt = parse_start_time("2025-01-15T09:30:00", "America/New_York").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-15T09:30:00-05:00");
    }

    #[test]
    fn bare_date_is_midnight() {
        let dt = parse_start_time("2025-03-01", "UTC").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-03-01T00:00:00+00:00");
    }

    #[test]
    fn rfc3339_keeps_offset() {
        let dt = parse_start_time("2025-03-01T14:00:00+05:30", "UTC").unwrap();
        assert_eq!(format_clock(&dt), "2025-03-01 02:00 PM");
    }

    #[test]
    fn twelve_hour_clock() {
        let dt = parse_start_time("2025-03-05 2:00 PM", "UTC").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-03-05T14:00:00+00:00");

        let dt = parse_start_time("2025-03-05 09:15:00 am", "Asia/Tokyo").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-03-05T09:15:00+09:00");
    }

    #[test]
    fn free_form_start_is_localized() {
        let dt = parse_start_time("September 17, 2025 10:09am", "UTC").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-09-17T10:09:00+00:00");

        let dt = parse_start_time("12 Feb 2025 19:17", "Europe/Berlin").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-02-12T19:17:00+01:00");

        let dt = parse_start_time("May 25, 2025", "America/New_York").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-05-25T00:00:00-04:00");
    }

    #[test]
    fn bad_start_inputs() {
        assert!(parse_start_time("tomorrow-ish", "UTC").unwrap_err().contains("cannot parse"));
        let err = parse_start_time("2025-03-01", "Mars/Olympus").unwrap_err();
        assert!(err.contains("unknown timezone"));
        // Spring-forward gap in Berlin.
        assert!(parse_start_time("2025-03-30 02:30", "Europe/Berlin").is_err());
    }

    // -- Tools --

    #[test]
    fn exposes_five_prefixed_tools() {
        let adapter = CalendarAdapter::new(FakeCalendar::default());
        let names: Vec<String> = adapter.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "calendar_create_event",
                "calendar_list_events",
                "calendar_get_event",
                "calendar_delete_event",
                "calendar_quick_add_event",
            ]
        );
        assert_eq!(adapter.required_auth().provider, "google_calendar");
        assert_eq!(adapter.adapter_type(), AdapterType::Productivity);
    }

    #[tokio::test]
    async fn create_event_builds_body_and_summary() {
        let fake = FakeCalendar::default();
        let adapter = CalendarAdapter::new(fake.clone());

        let out = adapter
            .execute_tool(
                "calendar_create_event",
                json!({
                    "title": "Design review",
                    "start_time": "2025-03-01 14:00",
                    "duration_minutes": 90,
                    "guests": ["a@example.com", "b@example.com"],
                    "location": "Room 4",
                    "timezone": "Europe/Paris"
                }),
            )
            .await;

        assert_eq!(
            out,
            "✅ Event Created Successfully!\n\n\
             **Title**: Design review\n\
             **Start**: 2025-03-01 02:00 PM\n\
             **End**: 2025-03-01 03:30 PM\n\
             **Attendees**: a@example.com, b@example.com\n\
             **Location**: Room 4\n\
             \n**Event ID**: `evt123`"
        );

        let inserted = fake.state.lock().unwrap().inserted.clone().unwrap();
        assert_eq!(inserted.start.date_time.as_deref(), Some("2025-03-01T14:00:00+01:00"));
        assert_eq!(inserted.end.date_time.as_deref(), Some("2025-03-01T15:30:00+01:00"));
        assert_eq!(inserted.start.time_zone.as_deref(), Some("Europe/Paris"));
        assert_eq!(inserted.attendees.len(), 2);
        assert!(inserted.description.is_none());
    }

    #[tokio::test]
    async fn create_event_rejects_unknown_timezone() {
        let fake = FakeCalendar::default();
        let adapter = CalendarAdapter::new(fake.clone());
        let out = adapter
            .execute_tool(
                "calendar_create_event",
                json!({ "title": "x", "start_time": "2025-03-01 10:00", "timezone": "Nowhere/Land" }),
            )
            .await;

        assert!(out.starts_with("❌ Failed to create event: "));
        assert!(out.contains("unknown timezone `Nowhere/Land`"));
        assert!(fake.state.lock().unwrap().inserted.is_none());
    }

    #[tokio::test]
    async fn create_event_network_failure() {
        let credential = Credential {
            access_token: "ya29.test".into(),
            refresh_token: None,
            expires_at: None,
            token_type: "Bearer".into(),
            scopes: ScopeSet::new(),
        };
        let client = AuthorizedClient::new(
            "google_calendar",
            &credential,
            Url::parse("http://127.0.0.1:9/calendar/v3/").unwrap(),
        );
        let adapter = CalendarAdapter::from_client(client);

        let out = adapter
            .execute_tool(
                "calendar_create_event",
                json!({ "title": "x", "start_time": "2025-03-01T10:00:00Z" }),
            )
            .await;
        assert!(out.starts_with("❌ Failed to create event: network error"), "{out}");
    }

    #[tokio::test]
    async fn list_events_window_and_output() {
        let fake = FakeCalendar::with_events(vec![standup()]);
        let adapter = CalendarAdapter::new(fake.clone());

        let out = adapter
            .execute_tool("calendar_list_events", json!({ "days": 3, "max_results": "5" }))
            .await;

        assert_eq!(
            out,
            "📅 **Upcoming Events** (Next 3 days)\n\n\
             ### Standup\n\
             **When**: 2025-03-03 09:30 AM\n\
             **Where**: Room 4\n\
             **Attendees**: a@example.com, b@example.com\n\
             **Event ID**: `e1`\n\n"
        );

        let window = fake.state.lock().unwrap().window.unwrap();
        assert_eq!(window.max_results, 5);
        assert_eq!(window.time_max - window.time_min, Duration::days(3));
    }

    #[tokio::test]
    async fn list_events_rejects_window_past_calendar_range() {
        let fake = FakeCalendar::default();
        let adapter = CalendarAdapter::new(fake.clone());

        let out = adapter
            .execute_tool("calendar_list_events", json!({ "days": 4_000_000_000u64 }))
            .await;

        assert!(out.starts_with("❌ Failed to list events: "), "{out}");
        assert!(out.contains("`days` is too large"));
        assert!(fake.state.lock().unwrap().window.is_none());
    }

    #[tokio::test]
    async fn create_event_with_longest_duration() {
        let fake = FakeCalendar::default();
        let adapter = CalendarAdapter::new(fake.clone());

        let out = adapter
            .execute_tool(
                "calendar_create_event",
                json!({
                    "title": "Forever",
                    "start_time": "9999-12-31 23:00",
                    "duration_minutes": u32::MAX
                }),
            )
            .await;

        assert!(out.starts_with("✅ Event Created Successfully!"), "{out}");
        let inserted = fake.state.lock().unwrap().inserted.clone().unwrap();
        assert!(inserted.end.date_time.is_some());
    }

    #[tokio::test]
    async fn no_upcoming_events() {
        let adapter = CalendarAdapter::new(FakeCalendar::default());
        let out = adapter.execute_tool("calendar_list_events", json!({})).await;
        assert_eq!(out, "📅 No upcoming events found.");
    }

    #[tokio::test]
    async fn get_event_lists_responses() {
        let adapter = CalendarAdapter::new(FakeCalendar::with_events(vec![standup()]));
        let out = adapter
            .execute_tool("calendar_get_event", json!({ "event_id": "e1" }))
            .await;

        assert!(out.starts_with("📅 **Event Details**\n\n### Standup\n"));
        assert!(out.contains("**End**: 2025-03-03 09:45 AM\n"));
        assert!(out.contains("**Description**: Daily sync\n"));
        assert!(out.contains(
            "\n**Attendees**:\n- a@example.com (accepted)\n- b@example.com (no response)\n"
        ));
        assert!(out.ends_with("\n**Event ID**: `e1`"));
    }

    #[tokio::test]
    async fn delete_fetches_then_deletes() {
        let fake = FakeCalendar::with_events(vec![standup()]);
        let adapter = CalendarAdapter::new(fake.clone());

        let out = adapter
            .execute_tool("calendar_delete_event", json!({ "event_id": "e1" }))
            .await;
        assert_eq!(out, "✅ Event 'Standup' has been deleted successfully");
        assert_eq!(fake.state.lock().unwrap().deleted, vec!["e1"]);

        let missing = adapter
            .execute_tool("calendar_delete_event", json!({ "event_id": "nope" }))
            .await;
        assert_eq!(missing, "❌ Failed to delete event: HTTP 404: Not Found");
        assert_eq!(fake.state.lock().unwrap().deleted.len(), 1);
    }

    #[tokio::test]
    async fn quick_add_formats_result() {
        let fake = FakeCalendar::default();
        let adapter = CalendarAdapter::new(fake.clone());

        let out = adapter
            .execute_tool(
                "calendar_quick_add_event",
                json!({ "text": "Lunch with Sam tomorrow at 1pm at Cafe Luna" }),
            )
            .await;

        assert_eq!(
            out,
            "✅ **Event Created Successfully!**\n\n\
             **Title**: Lunch with Sam\n\
             **When**: 2025-03-02 01:00 PM\n\
             **Where**: Cafe Luna\n\
             \n**Event ID**: `qa1`"
        );
        assert_eq!(
            fake.state.lock().unwrap().quick_text.as_deref(),
            Some("Lunch with Sam tomorrow at 1pm at Cafe Luna")
        );
    }

    #[tokio::test]
    async fn quick_add_requires_text() {
        let adapter = CalendarAdapter::new(FakeCalendar::default());
        let out = adapter.execute_tool("calendar_quick_add_event", json!({})).await;
        assert!(out.starts_with("❌ Failed to create event: invalid parameters"));
    }
}
