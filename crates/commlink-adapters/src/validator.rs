//! Request validation.
//!
//! [`MessageValidator`] enforces the preconditions shared by the messaging
//! providers: recipient shape, text presence and length, media existence,
//! extension and size, and scheduling.  It runs before any provider call.
//! A rejected request never reaches the invoker.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::error::ValidationError;
use crate::request::{MediaPayload, MediaRef, ParsedRequest, ValidatedRequest};
use crate::traits::{RequestValidator, StageResult};

/// One mebibyte.
pub const MB: u64 = 1024 * 1024;

/// Timeout for downloading remote media.
const MEDIA_FETCH_TIMEOUT_SECS: u64 = 30;

static GROUP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{15,20}(-\d+)?@g\.us$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// What a recipient identifier must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientPolicy {
    /// The provider has no recipient (incoming webhooks).
    NotUsed,
    /// Any non-empty identifier.
    Any,
    /// 10–15 digits once non-digit characters are stripped.
    PhoneNumber,
    /// A WhatsApp group id such as `120363123456789012@g.us`.
    GroupId,
}

impl RecipientPolicy {
    fn accepts(self, id: &str) -> bool {
        match self {
            Self::NotUsed | Self::Any => true,
            Self::PhoneNumber => is_phone_number(id),
            Self::GroupId => is_group_id(id),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::NotUsed | Self::Any => "recipient",
            Self::PhoneNumber => "phone number",
            Self::GroupId => "group ID",
        }
    }
}

/// Whether `id` holds 10–15 digits after stripping non-digits.
pub fn is_phone_number(id: &str) -> bool {
    let digits = id.chars().filter(char::is_ascii_digit).count();
    (10..=15).contains(&digits)
}

/// Whether `id` is a WhatsApp group identifier.
pub fn is_group_id(id: &str) -> bool {
    GROUP_ID.is_match(id)
}

/// Whether message text is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPolicy {
    /// Text must be present and non-blank, optionally capped in characters.
    Required { max_chars: Option<usize> },
    /// Text may be absent (media sends use it as a caption).
    Optional,
}

/// A family of media with its own extension allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    /// Allowed extensions, lower-case and without the dot.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Image => &["jpg", "jpeg", "png", "webp", "gif"],
            Self::Video => &["mp4", "3gp", "avi"],
            Self::Document => &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "rar"],
        }
    }

    /// Human label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Video => "Video",
            Self::Document => "File",
        }
    }

    fn format_label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "file",
        }
    }
}

/// MIME type for an extension (without the dot).
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "3gp" => "video/3gpp",
        "avi" => "video/x-msvideo",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        _ => "application/octet-stream",
    }
}

/// Where the media for a send comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// The agent supplies the media reference in each input.
    Request,
    /// The media reference is fixed by the adapter configuration.
    Configured(MediaRef),
}

/// Media rules for one message kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPolicy {
    /// Which allow-list applies.
    pub kind: MediaKind,
    /// Hard size ceiling in bytes.
    pub max_bytes: u64,
    /// Where the reference comes from.
    pub source: MediaSource,
}

/// A configured delivery schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Send time, `YYYY-MM-DD HH:mm:ss`.
    pub time_to_send: String,
    /// IANA timezone name; mandatory whenever a time is set.
    pub timezone: Option<String>,
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Rule-driven validator shared by all messaging tools.
#[derive(Debug, Clone)]
pub struct MessageValidator {
    recipient: RecipientPolicy,
    text: TextPolicy,
    text_label: &'static str,
    media: Option<MediaPolicy>,
    schedule: Option<Schedule>,
    http: reqwest::Client,
}

impl MessageValidator {
    /// Create a validator with the given recipient and text policies.
    pub fn new(recipient: RecipientPolicy, text: TextPolicy, http: reqwest::Client) -> Self {
        Self {
            recipient,
            text,
            text_label: "Message text",
            media: None,
            schedule: None,
            http,
        }
    }

    /// Require media matching `policy`.
    pub fn with_media(mut self, policy: MediaPolicy) -> Self {
        self.media = Some(policy);
        self
    }

    /// Check the configured schedule on every call.
    pub fn with_schedule(mut self, schedule: Option<Schedule>) -> Self {
        self.schedule = schedule;
        self
    }

    /// Name used when the required text is missing (e.g. `Group subject`).
    pub fn with_text_label(mut self, label: &'static str) -> Self {
        self.text_label = label;
        self
    }

    fn check_schedule(&self) -> Result<(), ValidationError> {
        let Some(schedule) = &self.schedule else {
            return Ok(());
        };
        if schedule
            .timezone
            .as_deref()
            .is_none_or(|tz| tz.trim().is_empty())
        {
            return Err(ValidationError::MissingTimezone);
        }
        chrono::NaiveDateTime::parse_from_str(&schedule.time_to_send, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| ValidationError::InvalidScheduleTime(schedule.time_to_send.clone()))?;
        Ok(())
    }

    fn check_recipients(&self, request: &ParsedRequest) -> Result<Vec<String>, ValidationError> {
        if self.recipient == RecipientPolicy::NotUsed {
            return Ok(Vec::new());
        }

        let recipients = request.recipients();
        if recipients.is_empty() {
            return Err(ValidationError::MissingField("Chat ID"));
        }

        if let Some(bad) = recipients.iter().find(|id| !self.recipient.accepts(id)) {
            return Err(ValidationError::MalformedRecipient {
                recipient: bad.clone(),
                expected: self.recipient.label(),
            });
        }

        Ok(recipients)
    }

    fn check_text(&self, request: &ParsedRequest) -> Result<Option<String>, ValidationError> {
        let text = request
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        match self.text {
            TextPolicy::Optional => Ok(text),
            TextPolicy::Required { max_chars } => {
                let text = text.ok_or(ValidationError::MissingField(self.text_label))?;
                if let Some(max) = max_chars {
                    let actual = text.chars().count();
                    if actual > max {
                        return Err(ValidationError::MessageTooLong { max, actual });
                    }
                }
                Ok(Some(text))
            }
        }
    }

    async fn resolve_media(
        &self,
        policy: &MediaPolicy,
        request: &ParsedRequest,
    ) -> Result<MediaPayload, ValidationError> {
        let media = match &policy.source {
            MediaSource::Request => request
                .media
                .clone()
                .ok_or(ValidationError::MissingField("Media path"))?,
            MediaSource::Configured(configured) => configured.clone(),
        };

        let extension = media.extension();
        let bare = extension.trim_start_matches('.');
        if !policy.kind.extensions().contains(&bare) {
            return Err(ValidationError::UnsupportedMediaType {
                label: policy.kind.format_label(),
                extension,
                allowed: policy.kind.extensions().join(", "),
            });
        }

        let bytes = match &media {
            MediaRef::Local(path) => {
                let metadata = tokio::fs::metadata(path).await.map_err(|_| {
                    ValidationError::MediaNotFound {
                        label: policy.kind.label(),
                        path: path.display().to_string(),
                    }
                })?;
                if !metadata.is_file() {
                    return Err(ValidationError::MediaNotFound {
                        label: policy.kind.label(),
                        path: path.display().to_string(),
                    });
                }
                check_size(policy, metadata.len())?;
                tokio::fs::read(path)
                    .await
                    .map_err(|e| ValidationError::MediaNotFound {
                        label: policy.kind.label(),
                        path: format!("{} ({e})", path.display()),
                    })?
            }
            MediaRef::Remote(url) => self.fetch_remote(url, policy).await?,
        };

        check_size(policy, bytes.len() as u64)?;

        debug!(
            file_name = %media.file_name(),
            size_bytes = bytes.len(),
            "media resolved"
        );

        Ok(MediaPayload {
            file_name: media.file_name(),
            mime: mime_for_extension(bare),
            bytes,
        })
    }

    /// Download `url`, giving up as soon as the body outgrows the policy cap.
    async fn fetch_remote(
        &self,
        url: &str,
        policy: &MediaPolicy,
    ) -> Result<Vec<u8>, ValidationError> {
        let unavailable = |reason: String| ValidationError::MediaUnavailable {
            url: url.to_string(),
            reason,
        };

        url::Url::parse(url).map_err(|e| unavailable(e.to_string()))?;

        let mut response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(MEDIA_FETCH_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}", status.as_u16())));
        }

        if let Some(len) = response.content_length() {
            check_size(policy, len)?;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| unavailable(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
            check_size(policy, bytes.len() as u64)?;
        }
        Ok(bytes)
    }
}

fn check_size(policy: &MediaPolicy, len: u64) -> Result<(), ValidationError> {
    if len > policy.max_bytes {
        return Err(ValidationError::MediaTooLarge {
            label: policy.kind.label(),
            limit_mb: policy.max_bytes / MB,
            actual_mb: len as f64 / MB as f64,
        });
    }
    Ok(())
}

#[async_trait]
impl RequestValidator for MessageValidator {
    async fn validate(&self, request: ParsedRequest) -> StageResult<ValidatedRequest> {
        self.check_schedule()?;
        let recipients = self.check_recipients(&request)?;
        let text = self.check_text(&request)?;

        let media = match &self.media {
            Some(policy) => Some(self.resolve_media(policy, &request).await?),
            None => None,
        };

        Ok(ValidatedRequest {
            recipients,
            text,
            caption: request.caption.filter(|c| !c.trim().is_empty()),
            media,
            group_picture_url: request.group_picture_url,
        })
    }
}
