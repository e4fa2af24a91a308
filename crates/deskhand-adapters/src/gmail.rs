//! Gmail adapter -- send, draft, read, search and label mail.
//!
//! [`GmailAdapter`] turns agent tool calls into [`MailApi`] calls and renders
//! the results as markdown. [`GmailClient`] implements [`MailApi`] over the
//! Gmail v1 REST API with an [`AuthorizedClient`].

use async_trait::async_trait;
use deskhand_auth_engine::{AuthorizedClient, ProviderSpec, provider};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::api::{ApiResult, send_empty, send_json};
use crate::error::{AdapterError, Result, failure};
use crate::format::{clean_line, format_mail_date};
use crate::mime::{OutgoingMessage, decode_body_data};
use crate::params;
use crate::traits::{Adapter, AdapterType, ToolDefinition};

/// Default number of messages returned by list and search.
const DEFAULT_MAX_RESULTS: u32 = 10;

/// Headers requested when only a summary is needed.
const SUMMARY_HEADERS: [&str; 3] = ["From", "Subject", "Date"];

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<MessagePartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePartBody {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Message {
    /// First header named `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn subject(&self) -> String {
        self.header("Subject")
            .map(clean_line)
            .unwrap_or_else(|| "No Subject".to_string())
    }

    pub fn sender(&self) -> String {
        self.header("From")
            .map(clean_line)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn date(&self) -> &str {
        self.header("Date").unwrap_or("")
    }

    /// The readable body: the first `text/plain` or `text/html` part in
    /// document order, or the top-level body for single-part messages.
    pub fn body_text(&self) -> String {
        let Some(payload) = self.payload.as_ref() else {
            return String::new();
        };

        if payload.parts.is_empty() {
            return payload
                .body
                .as_ref()
                .and_then(|b| b.data.as_deref())
                .and_then(decode_body_data)
                .unwrap_or_default();
        }

        first_text_part(&payload.parts).unwrap_or_else(|| "No readable content".to_string())
    }
}

fn first_text_part(parts: &[MessagePart]) -> Option<String> {
    parts.iter().find_map(|part| {
        let own = matches!(part.mime_type.as_str(), "text/plain" | "text/html")
            .then(|| part.body.as_ref()?.data.as_deref())
            .flatten()
            .and_then(decode_body_data);
        own.or_else(|| first_text_part(&part.parts))
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct Draft {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

/// Body of a label creation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLabel {
    pub name: String,
    pub label_list_visibility: String,
    pub message_list_visibility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// How much of a message to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Only the From/Subject/Date headers.
    Summary,
    Full,
}

/// Filter for message listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub max_results: u32,
    pub label_ids: Vec<String>,
    /// Gmail search syntax, e.g. `from:alice is:unread`.
    pub q: Option<String>,
}

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// What the Gmail tools need from a mail provider.
#[async_trait]
pub trait MailApi: Send + Sync {
    async fn send_message(&self, raw: &str) -> ApiResult<MessageRef>;
    async fn create_draft(&self, raw: &str) -> ApiResult<Draft>;
    async fn list_messages(&self, query: &MessageQuery) -> ApiResult<Vec<MessageRef>>;
    async fn get_message(&self, id: &str, format: MessageFormat) -> ApiResult<Message>;
    async fn create_label(&self, label: &NewLabel) -> ApiResult<Label>;
    async fn list_labels(&self) -> ApiResult<Vec<Label>>;
    async fn modify_labels(&self, id: &str, add: &[String], remove: &[String]) -> ApiResult<()>;
    async fn get_thread(&self, id: &str) -> ApiResult<Thread>;
}

// ---------------------------------------------------------------------------
// Gmail REST client
// ---------------------------------------------------------------------------

/// [`MailApi`] over `https://gmail.googleapis.com/gmail/v1/`.
pub struct GmailClient {
    client: AuthorizedClient,
}

impl GmailClient {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    fn request(&self, method: Method, segments: &[&str]) -> ApiResult<reqwest::RequestBuilder> {
        let mut path = vec!["users", "me"];
        path.extend_from_slice(segments);
        let url = self.client.endpoint(&path)?;
        Ok(self.client.request_url(method, url))
    }
}

#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct LabelList {
    #[serde(default)]
    labels: Vec<Label>,
}

#[async_trait]
impl MailApi for GmailClient {
    async fn send_message(&self, raw: &str) -> ApiResult<MessageRef> {
        let request = self
            .request(Method::POST, &["messages", "send"])?
            .json(&json!({ "raw": raw }));
        send_json(request).await
    }

    async fn create_draft(&self, raw: &str) -> ApiResult<Draft> {
        let request = self
            .request(Method::POST, &["drafts"])?
            .json(&json!({ "message": { "raw": raw } }));
        send_json(request).await
    }

    async fn list_messages(&self, query: &MessageQuery) -> ApiResult<Vec<MessageRef>> {
        let mut pairs = vec![("maxResults", query.max_results.to_string())];
        pairs.extend(query.label_ids.iter().map(|l| ("labelIds", l.clone())));
        if let Some(q) = &query.q {
            pairs.push(("q", q.clone()));
        }

        let request = self.request(Method::GET, &["messages"])?.query(&pairs);
        let list: MessageList = send_json(request).await?;
        Ok(list.messages)
    }

    async fn get_message(&self, id: &str, format: MessageFormat) -> ApiResult<Message> {
        let mut pairs = Vec::new();
        match format {
            MessageFormat::Summary => {
                pairs.push(("format", "metadata"));
                pairs.extend(SUMMARY_HEADERS.iter().map(|h| ("metadataHeaders", *h)));
            }
            MessageFormat::Full => pairs.push(("format", "full")),
        }

        let request = self
            .request(Method::GET, &["messages", id])?
            .query(&pairs);
        send_json(request).await
    }

    async fn create_label(&self, label: &NewLabel) -> ApiResult<Label> {
        let request = self.request(Method::POST, &["labels"])?.json(label);
        send_json(request).await
    }

    async fn list_labels(&self) -> ApiResult<Vec<Label>> {
        let request = self.request(Method::GET, &["labels"])?;
        let list: LabelList = send_json(request).await?;
        Ok(list.labels)
    }

    async fn modify_labels(&self, id: &str, add: &[String], remove: &[String]) -> ApiResult<()> {
        let request = self
            .request(Method::POST, &["messages", id, "modify"])?
            .json(&json!({ "addLabelIds": add, "removeLabelIds": remove }));
        send_empty(request).await
    }

    async fn get_thread(&self, id: &str) -> ApiResult<Thread> {
        let request = self.request(Method::GET, &["threads", id])?;
        send_json(request).await
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Gmail tools for the agent.
pub struct GmailAdapter {
    id: String,
    api: Box<dyn MailApi>,
}

impl GmailAdapter {
    pub fn new(api: impl MailApi + 'static) -> Self {
        Self {
            id: "gmail".to_string(),
            api: Box::new(api),
        }
    }

    /// Adapter over the real Gmail API.
    pub fn from_client(client: AuthorizedClient) -> Self {
        Self::new(GmailClient::new(client))
    }

    /// The action phrase used in failure messages for `tool`.
    fn action(tool: &str) -> &'static str {
        match tool {
            "gmail_send_email" => "send email",
            "gmail_create_draft" => "create draft",
            "gmail_list_emails" => "list emails",
            "gmail_read_email" => "read email",
            "gmail_create_label" => "create label",
            "gmail_list_labels" => "list labels",
            "gmail_apply_label" => "update labels",
            "gmail_search_emails" => "search emails",
            "gmail_get_email_thread" => "get thread",
            _ => "run tool",
        }
    }

    fn compose(params: &Value, tool: &str) -> Result<String> {
        let message = OutgoingMessage {
            to: params::required_str(params, tool, "to")?,
            subject: params::required_str(params, tool, "subject")?,
            body: params::required_str(params, tool, "body")?,
            cc: params::optional_str(params, tool, "cc")?,
            bcc: params::optional_str(params, tool, "bcc")?,
            html: params::bool_or(params, tool, "html", false)?,
        };
        Ok(message.to_raw())
    }

    // -----------------------------------------------------------------------
    // Tool implementations
    // -----------------------------------------------------------------------

    async fn tool_send_email(&self, params: &Value) -> Result<String> {
        let raw = Self::compose(params, "gmail_send_email")?;
        let sent = self.api.send_message(&raw).await?;
        info!(message_id = %sent.id, "email sent");
        Ok(format!("✅ Email sent successfully. Message ID: {}", sent.id))
    }

    async fn tool_create_draft(&self, params: &Value) -> Result<String> {
        let raw = Self::compose(params, "gmail_create_draft")?;
        let draft = self.api.create_draft(&raw).await?;
        info!(draft_id = %draft.id, "draft created");
        Ok(format!("✅ Draft created successfully. Draft ID: {}", draft.id))
    }

    async fn tool_list_emails(&self, params: &Value) -> Result<String> {
        let tool = "gmail_list_emails";
        let mut label_ids = params::string_list(params, tool, "label_ids")?;
        if label_ids.is_empty() {
            label_ids.push("INBOX".to_string());
        }
        let query = MessageQuery {
            max_results: params::positive_int(params, tool, "max_results", DEFAULT_MAX_RESULTS)?,
            label_ids,
            q: None,
        };

        let refs = self.api.list_messages(&query).await?;
        if refs.is_empty() {
            return Ok("📭 No emails found.".to_string());
        }

        let mut out = String::from("📧 **Recent Emails**:\n\n");
        for (idx, msg) in refs.iter().enumerate() {
            let idx = idx + 1;
            match self.api.get_message(&msg.id, MessageFormat::Summary).await {
                Ok(message) => {
                    out.push_str(&format!("### {idx}. {}\n", message.subject()));
                    out.push_str(&format!("**From**: {}\n", message.sender()));
                    out.push_str(&format!("**Date**: {}\n", format_mail_date(message.date())));
                    out.push_str(&format!("**ID**: `{}`\n\n", message.id));
                }
                Err(e) => {
                    out.push_str(&format!("### {idx}. Error loading email\n"));
                    out.push_str(&format!("**Error**: {e}\n\n"));
                }
            }
        }
        Ok(out)
    }

    async fn tool_read_email(&self, params: &Value) -> Result<String> {
        let id = params::required_str(params, "gmail_read_email", "message_id")?;
        let message = self.api.get_message(id, MessageFormat::Full).await?;

        let mut out = format!("## {}\n\n", message.subject());
        out.push_str(&format!("**From**: {}\n", message.sender()));
        out.push_str(&format!("**Date**: {}\n", message.date()));
        out.push_str(&format!("**Labels**: {}\n\n", message.label_ids.join(", ")));
        out.push_str("### Content:\n\n");
        out.push_str(&message.body_text());
        Ok(out)
    }

    async fn tool_create_label(&self, params: &Value) -> Result<String> {
        let tool = "gmail_create_label";
        let color = match params.get("color") {
            None | Some(Value::Null) => None,
            Some(v @ Value::Object(_)) => Some(v.clone()),
            Some(_) => {
                return Err(AdapterError::InvalidParams {
                    tool_name: tool.to_string(),
                    reason: "`color` must be an object with textColor and backgroundColor".into(),
                });
            }
        };
        let label = NewLabel {
            name: params::required_str(params, tool, "name")?.to_string(),
            label_list_visibility: params::optional_str(params, tool, "label_list_visibility")?
                .unwrap_or("labelShow")
                .to_string(),
            message_list_visibility: params::optional_str(params, tool, "message_list_visibility")?
                .unwrap_or("show")
                .to_string(),
            color,
        };

        let created = self.api.create_label(&label).await?;
        Ok(format!("✅ Label created successfully. Label ID: {}", created.id))
    }

    async fn tool_list_labels(&self) -> Result<String> {
        let labels = self.api.list_labels().await?;
        if labels.is_empty() {
            return Ok("No labels found.".to_string());
        }

        let mut out = String::from("📑 Labels:\n\n");
        for label in &labels {
            out.push_str(&format!("- {} (ID: `{}`)\n", label.name, label.id));
        }
        Ok(out)
    }

    async fn tool_apply_label(&self, params: &Value) -> Result<String> {
        let tool = "gmail_apply_label";
        let id = params::required_str(params, tool, "message_id")?;
        let add = params::string_list(params, tool, "label_ids")?;
        let remove = params::string_list(params, tool, "remove_labels")?;
        if add.is_empty() && remove.is_empty() {
            return Err(AdapterError::InvalidParams {
                tool_name: tool.to_string(),
                reason: "give at least one of `label_ids` or `remove_labels`".into(),
            });
        }

        self.api.modify_labels(id, &add, &remove).await?;
        Ok(format!("✅ Labels updated successfully for message: {id}"))
    }

    async fn tool_search_emails(&self, params: &Value) -> Result<String> {
        let tool = "gmail_search_emails";
        let q = params::required_str(params, tool, "query")?;
        let query = MessageQuery {
            max_results: params::positive_int(params, tool, "max_results", DEFAULT_MAX_RESULTS)?,
            label_ids: Vec::new(),
            q: Some(q.to_string()),
        };

        let refs = self.api.list_messages(&query).await?;
        if refs.is_empty() {
            return Ok("🔍 No matching emails found.".to_string());
        }

        let mut out = format!("🔍 Search Results for: '{q}'\n\n");
        for msg in &refs {
            let message = self.api.get_message(&msg.id, MessageFormat::Summary).await?;
            out.push_str(&format!("### {}\n", message.subject()));
            out.push_str(&format!("**From**: {}\n", message.sender()));
            out.push_str(&format!("**Date**: {}\n", message.date()));
            out.push_str(&format!("**ID**: `{}`\n\n", message.id));
        }
        Ok(out)
    }

    async fn tool_get_email_thread(&self, params: &Value) -> Result<String> {
        let id = params::required_str(params, "gmail_get_email_thread", "thread_id")?;
        let thread = self.api.get_thread(id).await?;
        if thread.messages.is_empty() {
            return Ok("No messages found in thread.".to_string());
        }

        let mut out = String::from("📧 Email Thread:\n\n");
        for message in &thread.messages {
            out.push_str(&format!("### {}\n", message.subject()));
            out.push_str(&format!("**From**: {}\n", message.sender()));
            out.push_str(&format!("**Date**: {}\n", message.date()));
            out.push_str("\n---\n");
            out.push_str(&message.body_text());
            out.push_str("\n---\n\n");
        }
        Ok(out)
    }

    /// Tool manifest, available without a client.
    pub fn tool_definitions() -> Vec<ToolDefinition> {
        let compose_schema = json!({
            "type": "object",
            "properties": {
                "to": { "type": "string", "description": "Recipient email address" },
                "subject": { "type": "string", "description": "Email subject" },
                "body": { "type": "string", "description": "Email body content" },
                "cc": { "type": "string", "description": "CC recipients, comma-separated" },
                "bcc": { "type": "string", "description": "BCC recipients, comma-separated" },
                "html": { "type": "boolean", "description": "Send the body as HTML (default: false)" }
            },
            "required": ["to", "subject", "body"]
        });

        vec![
            ToolDefinition {
                name: "gmail_send_email".into(),
                description: "Send an email from the user's Gmail account".into(),
                parameters: compose_schema.clone(),
            },
            ToolDefinition {
                name: "gmail_create_draft".into(),
                description: "Create an email draft without sending it".into(),
                parameters: compose_schema,
            },
            ToolDefinition {
                name: "gmail_list_emails".into(),
                description: "List recent emails, by default from the inbox".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "max_results": { "type": "integer", "description": "Maximum number of emails (default: 10)" },
                        "label_ids": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Label IDs to filter by (default: [\"INBOX\"])"
                        }
                    },
                    "required": []
                }),
            },
            ToolDefinition {
                name: "gmail_read_email".into(),
                description: "Read the full content of an email".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "message_id": { "type": "string", "description": "ID of the email to read" }
                    },
                    "required": ["message_id"]
                }),
            },
            ToolDefinition {
                name: "gmail_create_label".into(),
                description: "Create a new Gmail label".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Label name" },
                        "label_list_visibility": {
                            "type": "string",
                            "enum": ["labelShow", "labelShowIfUnread", "labelHide"],
                            "description": "Visibility in the label list (default: labelShow)"
                        },
                        "message_list_visibility": {
                            "type": "string",
                            "enum": ["show", "hide"],
                            "description": "Visibility in the message list (default: show)"
                        },
                        "color": {
                            "type": "object",
                            "properties": {
                                "textColor": { "type": "string" },
                                "backgroundColor": { "type": "string" }
                            },
                            "description": "Optional label colour"
                        }
                    },
                    "required": ["name"]
                }),
            },
            ToolDefinition {
                name: "gmail_list_labels".into(),
                description: "List all Gmail labels with their IDs".into(),
                parameters: json!({ "type": "object", "properties": {}, "required": [] }),
            },
            ToolDefinition {
                name: "gmail_apply_label".into(),
                description: "Add labels to or remove labels from an email".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "message_id": { "type": "string", "description": "ID of the email" },
                        "label_ids": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Label IDs to add"
                        },
                        "remove_labels": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Label IDs to remove"
                        }
                    },
                    "required": ["message_id", "label_ids"]
                }),
            },
            ToolDefinition {
                name: "gmail_search_emails".into(),
                description: "Search emails using Gmail query syntax".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Gmail search query, e.g. 'from:alice is:unread'" },
                        "max_results": { "type": "integer", "description": "Maximum number of results (default: 10)" }
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "gmail_get_email_thread".into(),
                description: "Get every message in an email thread".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "thread_id": { "type": "string", "description": "ID of the thread" }
                    },
                    "required": ["thread_id"]
                }),
            },
        ]
    }
}

#[async_trait]
impl Adapter for GmailAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    fn provider(&self) -> &'static ProviderSpec {
        &provider::GMAIL
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        Self::tool_definitions()
    }

    async fn execute_tool(&self, name: &str, params: Value) -> String {
        let result = match name {
            "gmail_send_email" => self.tool_send_email(&params).await,
            "gmail_create_draft" => self.tool_create_draft(&params).await,
            "gmail_list_emails" => self.tool_list_emails(&params).await,
            "gmail_read_email" => self.tool_read_email(&params).await,
            "gmail_create_label" => self.tool_create_label(&params).await,
            "gmail_list_labels" => self.tool_list_labels().await,
            "gmail_apply_label" => self.tool_apply_label(&params).await,
            "gmail_search_emails" => self.tool_search_emails(&params).await,
            "gmail_get_email_thread" => self.tool_get_email_thread(&params).await,
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
