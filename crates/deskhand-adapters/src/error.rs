//! Adapter error types and the failure-string mapping.
//!
//! Tool calls never surface errors to the agent; every [`AdapterError`] is
//! rendered through [`failure`] into the string the agent sees.

use crate::api::ApiError;

/// Unified error type for Deskhand adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The requested tool does not exist on this adapter.
    #[error("tool not found: `{tool_name}` on adapter `{adapter_id}`")]
    ToolNotFound {
        adapter_id: String,
        tool_name: String,
    },

    /// The parameters supplied to a tool are invalid.
    #[error("invalid parameters for tool `{tool_name}`: {reason}")]
    InvalidParams { tool_name: String, reason: String },

    /// The provider API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Render a failed tool call as the agent-facing message.
pub fn failure(action: &str, err: &AdapterError) -> String {
    tracing::warn!(action, error = %err, "tool call failed");
    format!("❌ Failed to {action}: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_prefixes_action() {
        let err = AdapterError::InvalidParams {
            tool_name: "gmail_send_email".into(),
            reason: "missing required parameter `to`".into(),
        };
        assert_eq!(
            failure("send email", &err),
            "❌ Failed to send email: invalid parameters for tool `gmail_send_email`: missing required parameter `to`"
        );
    }

    #[test]
    fn api_errors_display_transparently() {
        let err: AdapterError = ApiError::Status {
            status: 404,
            message: "Requested entity was not found.".into(),
        }
        .into();
        assert_eq!(
            failure("get event", &err),
            "❌ Failed to get event: HTTP 404: Requested entity was not found."
        );
    }
}
