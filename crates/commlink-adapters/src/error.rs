//! Adapter error types.
//!
//! Two layers of errors exist.  [`AdapterError`] covers construction and
//! registry failures: it is returned to the host, which owns the tool
//! lifecycle.  [`ToolError`] covers everything that can go wrong inside a
//! single `invoke` call and never escapes the adapter boundary; it is
//! converted into a failure [`Outcome`](crate::outcome::Outcome) instead.

/// Construction-time error for commlink adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A required configuration value or credential is absent or empty.
    #[error("missing configuration for `{tool}`: `{field}` is required")]
    MissingConfig { tool: String, field: String },

    /// A configuration value is present but unusable.
    #[error("invalid configuration for `{tool}`: {reason}")]
    InvalidConfig { tool: String, reason: String },

    /// The requested tool is not known to the registry.
    #[error("unknown tool: `{0}`")]
    UnknownTool(String),

    /// The resolved configuration could not be mapped onto the typed config.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// A typed rejection reason produced by a
/// [`RequestValidator`](crate::traits::RequestValidator).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A required request field is missing or blank.
    #[error("{0} was not provided in the input!")]
    MissingField(&'static str),

    /// The recipient identifier does not have the shape the provider expects.
    #[error("Invalid {expected}: `{recipient}`")]
    MalformedRecipient {
        recipient: String,
        expected: &'static str,
    },

    /// The message text is longer than the provider accepts.
    #[error(
        "Message exceeds the maximum length of {max} characters. Current length: {actual} characters."
    )]
    MessageTooLong { max: usize, actual: usize },

    /// A local media file does not exist.
    #[error("{label} file not found at path: {path}")]
    MediaNotFound { label: &'static str, path: String },

    /// A remote media reference could not be downloaded.
    #[error("Could not fetch media from {url}: {reason}")]
    MediaUnavailable { url: String, reason: String },

    /// The media extension is not in the allow-list for its kind.
    #[error("Unsupported {label} format: {extension}. Supported formats are: {allowed}.")]
    UnsupportedMediaType {
        label: &'static str,
        extension: String,
        allowed: String,
    },

    /// The media exceeds the size ceiling for its transport.
    #[error("{label} size exceeds {limit_mb}MB limit. Current size: {actual_mb:.2}MB")]
    MediaTooLarge {
        label: &'static str,
        limit_mb: u64,
        actual_mb: f64,
    },

    /// A schedule time is configured without a timezone.
    #[error("Timezone is required when scheduling is enabled")]
    MissingTimezone,

    /// The schedule time does not follow `YYYY-MM-DD HH:mm:ss`.
    #[error("Invalid schedule time `{0}`: expected format YYYY-MM-DD HH:mm:ss")]
    InvalidScheduleTime(String),
}

/// A failure inside one `invoke` call.
///
/// Every variant is caught at the adapter boundary and encoded as a
/// `success: false` outcome.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Neither the JSON form nor the natural-language form matched.
    #[error("{0}")]
    Parse(String),

    /// The parsed request broke a provider precondition.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The HTTP call failed before a response arrived.
    #[error("{reason}")]
    Transport { reason: String, timed_out: bool },

    /// The provider answered, but the answer signals failure.
    #[error("{reason}")]
    Provider { status: Option<u16>, reason: String },
}

impl ToolError {
    /// Map a `reqwest` send failure into a transport error.
    pub fn transport(service: &str, err: &reqwest::Error) -> Self {
        let timed_out = err.is_timeout();
        let reason = if timed_out {
            format!("{service} request timed out")
        } else {
            format!("{service} request failed: {err}")
        };
        Self::Transport { reason, timed_out }
    }

    /// Short machine-readable name of the failing stage.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Validation(_) => "validation",
            Self::Transport { .. } => "transport",
            Self::Provider { .. } => "provider",
        }
    }
}
