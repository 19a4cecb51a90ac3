//! Flexible input parsing.
//!
//! Agents hand tools a single string which may be a JSON object or loose
//! natural language.  [`FlexibleParser`] recovers a [`ParsedRequest`] from
//! either form:
//!
//! 1. Strict JSON.  If the input is an object carrying every required field
//!    of the [`RequestShape`], it is used as-is; JSON always wins.
//! 2. Natural language.  Fixed, case-insensitive [`Pattern`]s extract each
//!    field.  Free-text fields stop at the first period.
//! 3. Recipient normalization.  Every identifier starting with `0` gets a
//!    `2` prepended, whichever path produced it.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ToolError;
use crate::request::{MediaRef, ParsedRequest, split_recipients};
use crate::traits::{InputParser, StageResult};

// ---------------------------------------------------------------------------
// Natural-language patterns
// ---------------------------------------------------------------------------

static CHAT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)chat Number\s*:\s*(\d+)").expect("valid regex"));
static MESSAGE_WILL_BE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)message will be\s*(.+)$").expect("valid regex"));
static WITH_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)with text\s*(.+?)(?:\.|$)").expect("valid regex"));
static TEXT_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)text\s*:\s*(.+?)(?:\.|$)").expect("valid regex"));
static FILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)file path is\s*([^\s]+)").expect("valid regex"));
static IMAGE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)image path is\s*([^\s]+)").expect("valid regex"));
static CAPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)caption\s*(.+?)(?:\.|$)").expect("valid regex"));

/// A natural-language extraction pattern.  All patterns are
/// case-insensitive and capture the field value in group 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// `chat Number : <digits>`
    ChatNumber,
    /// `message will be <rest of input>`
    MessageWillBe,
    /// `with text <text up to period>`
    WithText,
    /// `text: <text up to period>`
    TextColon,
    /// `file path is <token>`
    FilePath,
    /// `image path is <token>`
    ImagePath,
    /// `caption <text up to period>`
    Caption,
}

impl Pattern {
    fn regex(self) -> &'static Regex {
        match self {
            Self::ChatNumber => &CHAT_NUMBER,
            Self::MessageWillBe => &MESSAGE_WILL_BE,
            Self::WithText => &WITH_TEXT,
            Self::TextColon => &TEXT_COLON,
            Self::FilePath => &FILE_PATH,
            Self::ImagePath => &IMAGE_PATH,
            Self::Caption => &CAPTION,
        }
    }

    /// Return the trimmed capture of this pattern in `input`, if any.
    pub fn extract(self, input: &str) -> Option<String> {
        self.regex()
            .captures(input)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

/// How one request field is recovered.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// JSON keys accepted for this field, in priority order.
    pub json_keys: &'static [&'static str],
    /// Natural-language patterns tried in order; the first match wins.
    pub patterns: &'static [Pattern],
    /// Whether the field must be present for a parse path to succeed.
    pub required: bool,
}

impl FieldRule {
    /// A required field.
    pub const fn required(
        json_keys: &'static [&'static str],
        patterns: &'static [Pattern],
    ) -> Self {
        Self {
            json_keys,
            patterns,
            required: true,
        }
    }

    /// An optional field.
    pub const fn optional(
        json_keys: &'static [&'static str],
        patterns: &'static [Pattern],
    ) -> Self {
        Self {
            json_keys,
            patterns,
            required: false,
        }
    }

    fn from_json(&self, object: &Map<String, Value>) -> Option<String> {
        self.json_keys
            .iter()
            .find_map(|key| object.get(*key).and_then(json_field_text))
    }

    fn from_text(&self, input: &str) -> Option<String> {
        self.patterns.iter().find_map(|p| p.extract(input))
    }
}

/// The fields a tool expects, and how to find them.
#[derive(Debug, Clone, Copy)]
pub struct RequestShape {
    /// Recipient identifier(s).
    pub recipient: Option<FieldRule>,
    /// Message text or group subject.
    pub text: Option<FieldRule>,
    /// Media path or URL.
    pub media: Option<FieldRule>,
    /// Media caption.
    pub caption: Option<FieldRule>,
    /// Group picture URL (group creation only).
    pub group_picture: Option<FieldRule>,
    /// When no structured form matches, treat the whole input as the text.
    pub raw_text_fallback: bool,
    /// Example JSON shown in the parse error.
    pub json_example: &'static str,
    /// Example natural-language input shown in the parse error.
    pub text_example: &'static str,
}

impl RequestShape {
    fn rules(&self) -> impl Iterator<Item = &FieldRule> {
        [
            &self.recipient,
            &self.text,
            &self.media,
            &self.caption,
            &self.group_picture,
        ]
        .into_iter()
        .flatten()
    }
}

/// Render a JSON value as field text: strings and numbers are accepted,
/// arrays of them are comma-joined, anything else is ignored.
fn json_field_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(json_field_text)
            .collect::<Vec<_>>()
            .join(","),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Prepend the `2` country-code digit to every identifier starting with `0`.
pub fn normalize_recipients(raw: &str) -> String {
    split_recipients(raw)
        .into_iter()
        .map(|id| {
            if id.starts_with('0') {
                format!("2{id}")
            } else {
                id
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// JSON-first, natural-language-second input parser.
#[derive(Debug, Clone, Copy)]
pub struct FlexibleParser {
    shape: RequestShape,
}

impl FlexibleParser {
    /// Create a parser for the given request shape.
    pub const fn new(shape: RequestShape) -> Self {
        Self { shape }
    }

    /// The shape this parser recognizes.
    pub fn shape(&self) -> &RequestShape {
        &self.shape
    }

    fn parse_json(&self, raw: &str) -> Option<ParsedRequest> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let object = value.as_object()?;

        let complete = self
            .shape
            .rules()
            .filter(|r| r.required)
            .all(|r| r.from_json(object).is_some());
        if !complete {
            return None;
        }

        Some(self.build(|rule| rule.from_json(object)))
    }

    fn parse_text(&self, raw: &str) -> Option<ParsedRequest> {
        let has_patterns = self.shape.rules().any(|r| !r.patterns.is_empty());
        if !has_patterns {
            return None;
        }

        let complete = self
            .shape
            .rules()
            .filter(|r| r.required)
            .all(|r| r.from_text(raw).is_some());
        if !complete {
            return None;
        }

        Some(self.build(|rule| rule.from_text(raw)))
    }

    fn parse_raw_text(&self, raw: &str) -> Option<ParsedRequest> {
        let text = raw.trim();
        if !self.shape.raw_text_fallback || text.is_empty() {
            return None;
        }
        Some(ParsedRequest {
            text: Some(text.to_string()),
            ..Default::default()
        })
    }

    fn build(&self, field: impl Fn(&FieldRule) -> Option<String>) -> ParsedRequest {
        let pick = |rule: &Option<FieldRule>| rule.as_ref().and_then(&field);
        ParsedRequest {
            recipient: pick(&self.shape.recipient).unwrap_or_default(),
            text: pick(&self.shape.text),
            caption: pick(&self.shape.caption),
            media: pick(&self.shape.media).map(|m| MediaRef::parse(&m)),
            group_picture_url: pick(&self.shape.group_picture),
        }
    }

    fn format_error(&self) -> ToolError {
        ToolError::Parse(format!(
            "Input didn't match expected formats. Input should either be JSON structured like {} or in natural language like \"{}\"",
            self.shape.json_example, self.shape.text_example
        ))
    }
}

impl InputParser for FlexibleParser {
    fn parse(&self, raw: &str) -> StageResult<ParsedRequest> {
        let (mut request, path) = if let Some(req) = self.parse_json(raw) {
            (req, "json")
        } else if let Some(req) = self.parse_text(raw) {
            (req, "natural_language")
        } else if let Some(req) = self.parse_raw_text(raw) {
            (req, "raw_text")
        } else {
            return Err(self.format_error());
        };

        request.recipient = normalize_recipients(&request.recipient);

        debug!(
            path,
            recipient = %request.recipient,
            has_text = request.text.is_some(),
            has_media = request.media.is_some(),
            "input parsed"
        );

        Ok(request)
    }
}
