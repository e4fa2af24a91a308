//! Tool adapters for Deskhand -- Gmail and Google Calendar.
//!
//! Each adapter implements the [`Adapter`] trait defined in [`traits`],
//! providing a uniform interface for tool discovery and execution. Adapters
//! talk to their provider through a capability trait ([`MailApi`],
//! [`CalendarApi`]) whose REST implementations run over an
//! [`AuthorizedClient`](deskhand_auth_engine::AuthorizedClient) from the
//! credential broker.

pub mod api;
pub mod error;
pub mod format;
pub mod gmail;
pub mod google_calendar;
pub mod mime;
pub mod params;
pub mod traits;

pub use api::{ApiError, ApiResult};
pub use error::{AdapterError, Result, failure};
pub use gmail::{GmailAdapter, GmailClient, MailApi};
pub use google_calendar::{CalendarAdapter, CalendarApi, GoogleCalendarClient};
pub use traits::{Adapter, AdapterType, AuthRequirement, ToolDefinition};
