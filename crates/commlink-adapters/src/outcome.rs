//! Outcome envelope and response classification.
//!
//! Every `invoke` call ends in exactly one [`Outcome`].  Success outcomes
//! are built by provider encoders; failure outcomes are built here from a
//! [`ToolError`], which makes this module the single place where parse,
//! validation, transport and provider failures converge.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::ToolError;
use crate::request::ProviderResponse;

/// Maximum length, in characters, of provider and transport error text.
pub const MAX_ERROR_CHARS: usize = 100;

/// The normalized result of one `invoke` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Whether the message (or group) was accepted by the provider.
    pub success: bool,
    /// Human-readable summary on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Human-readable reason on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Optional provider-specific detail, flattened into the envelope.
    #[serde(flatten)]
    pub detail: Map<String, Value>,
}

impl Outcome {
    /// A success outcome with the given summary.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            detail: Map::new(),
        }
    }

    /// A failure outcome with the given reason.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            detail: Map::new(),
        }
    }

    /// Attach one detail field.  `null` values are dropped.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.detail.insert(key.to_string(), value);
        }
        self
    }

    /// Convert any call-time failure into a failure outcome.
    ///
    /// Provider and transport text comes from third parties and is
    /// truncated to [`MAX_ERROR_CHARS`]; parse and validation messages are
    /// kept whole so the agent can see the accepted formats.
    pub fn from_error(err: &ToolError) -> Self {
        match err {
            ToolError::Parse(_) | ToolError::Validation(_) => Self::failure(err.to_string()),
            ToolError::Transport { reason, timed_out } => {
                Self::failure(truncate(reason, MAX_ERROR_CHARS))
                    .with("timedOut", timed_out.then_some(true))
            }
            ToolError::Provider { status, reason } => {
                Self::failure(truncate(reason, MAX_ERROR_CHARS)).with("status", *status)
            }
        }
    }

    /// Serialize into the string handed back to the agent.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            json!({ "success": self.success, "error": "failed to encode outcome" }).to_string()
        })
    }
}

/// How a provider signals business success in its response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessSignal {
    /// `{"ok": true}` (Telegram, several WhatsApp gateways).
    OkFlag,
    /// `{"success": true}` at the top level or nested as `data.success`.
    SuccessFlag,
    /// Any 2xx status is success (incoming webhooks).
    HttpStatus,
}

impl SuccessSignal {
    fn is_satisfied(self, body: &Value) -> bool {
        match self {
            Self::OkFlag => body.get("ok").and_then(Value::as_bool).unwrap_or(false),
            Self::SuccessFlag => {
                body.get("success").and_then(Value::as_bool).unwrap_or(false)
                    || body
                        .pointer("/data/success")
                        .and_then(Value::as_bool)
                        .unwrap_or(false)
            }
            Self::HttpStatus => true,
        }
    }
}

/// Check a provider response against its success signal.
///
/// Non-2xx statuses and falsy success flags both become
/// [`ToolError::Provider`], with the most specific error text the body
/// offers.
pub fn check_response(
    service: &str,
    response: &ProviderResponse,
    signal: SuccessSignal,
) -> std::result::Result<(), ToolError> {
    if response.is_http_success() && signal.is_satisfied(&response.body) {
        return Ok(());
    }

    let detail = error_text(&response.body).unwrap_or_else(|| {
        match (response.is_http_success(), &response.body) {
            (true, body) => body_snippet(body),
            (false, Value::Null) => format!("HTTP {}", response.status),
            (false, body) => format!("HTTP {}: {}", response.status, body_snippet(body)),
        }
    });

    Err(ToolError::Provider {
        status: Some(response.status),
        reason: format!("{service} API error: {detail}"),
    })
}

/// Pull a human-readable error message out of a provider body.
fn error_text(body: &Value) -> Option<String> {
    ["description", "message", "msg", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn body_snippet(body: &Value) -> String {
    match body {
        Value::Null => "empty response".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truncate `text` to at most `max` characters on a char boundary.
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
