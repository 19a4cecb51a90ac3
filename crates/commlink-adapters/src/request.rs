//! Per-call request types.
//!
//! A [`ParsedRequest`] is produced by an input parser, turned into a
//! [`ValidatedRequest`] by a validator and consumed by a provider invoker.
//! None of them outlive the `invoke` call that created them.

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Where a media file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    /// A path on the local filesystem.
    Local(PathBuf),
    /// A remote `http`/`https` URL that is downloaded before sending.
    Remote(String),
}

impl MediaRef {
    /// Classify a raw reference: anything starting with `http` is remote.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http") {
            Self::Remote(raw.to_string())
        } else {
            Self::Local(PathBuf::from(raw))
        }
    }

    /// The final path component, used as the upload file name.
    pub fn file_name(&self) -> String {
        match self {
            Self::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Self::Remote(raw) => {
                let path = url::Url::parse(raw)
                    .map(|u| u.path().to_string())
                    .unwrap_or_else(|_| raw.clone());
                path.rsplit('/').next().unwrap_or_default().to_string()
            }
        }
    }

    /// Lower-cased extension including the leading dot, or an empty string.
    pub fn extension(&self) -> String {
        let name = self.file_name();
        Path::new(&name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// The typed form of one agent input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Recipient identifier(s), comma-joined for bulk sends.  Empty for
    /// providers without a recipient (webhooks).
    pub recipient: String,
    /// Message text, or the group subject for group creation.
    pub text: Option<String>,
    /// Optional caption for media sends.
    pub caption: Option<String>,
    /// Media reference supplied by the agent.
    pub media: Option<MediaRef>,
    /// Optional group picture URL for group creation.
    pub group_picture_url: Option<String>,
}

impl ParsedRequest {
    /// Split the comma-joined recipient field into trimmed, non-empty ids.
    pub fn recipients(&self) -> Vec<String> {
        split_recipients(&self.recipient)
    }
}

/// Split a comma-joined recipient list into trimmed, non-empty entries.
pub fn split_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Media bytes that passed validation and are ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    /// Upload file name (basename of the reference).
    pub file_name: String,
    /// MIME type derived from the extension.
    pub mime: &'static str,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// A request that passed every provider precondition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Normalized recipients, in input order.
    pub recipients: Vec<String>,
    /// Message text or group subject.
    pub text: Option<String>,
    /// Caption for media sends.
    pub caption: Option<String>,
    /// Resolved media, if the message kind needs it.
    pub media: Option<MediaPayload>,
    /// Group picture URL for group creation.
    pub group_picture_url: Option<String>,
}

impl ValidatedRequest {
    /// Recipients joined back into the comma-separated wire form.
    pub fn recipient_list(&self) -> String {
        self.recipients.join(",")
    }
}

/// The raw answer of a provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body parsed as JSON; non-JSON bodies are kept as a JSON string and
    /// empty bodies as `null`.
    pub body: Value,
}

impl ProviderResponse {
    /// Read a `reqwest` response into a [`ProviderResponse`].
    pub async fn read(response: reqwest::Response) -> std::result::Result<Self, reqwest::Error> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(Self { status, body })
    }

    /// Whether the HTTP status is in the 2xx range.
    pub fn is_http_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
