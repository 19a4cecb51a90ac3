//! OctobotWapp gateway adapter.
//!
//! One configured tool either sends messages (text, image, video or
//! document) to phone numbers or group ids, or creates WhatsApp groups.
//! The message kind, contact kind, media file and schedule are node
//! configuration; the agent only supplies `recipients`, `text_message` and,
//! for group creation, an optional `group_picture_url`.
//!
//! Every call is a multipart POST authenticated with an `x-api-token`
//! header.  Messages go to `apiUrl`, group creation to `groupApiUrl`.

use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{MULTIPART_TIMEOUT, dispatch, input_schema, media_part};
use crate::adapter::{ToolAdapter, http_client};
use crate::config::{ResolvedConfig, from_resolved, non_blank, require, require_url};
use crate::descriptor::{
    AdapterDescriptor, CredentialDescriptor, CredentialRef, InputParam, ParamOption, ParamType,
};
use crate::error::{AdapterError, Result};
use crate::outcome::{Outcome, SuccessSignal, check_response};
use crate::parser::{FieldRule, FlexibleParser, Pattern, RequestShape};
use crate::request::{MediaRef, ProviderResponse, ValidatedRequest};
use crate::traits::{OutcomeEncoder, ProviderInvoker, StageResult, ToolDefinition};
use crate::validator::{
    MB, MediaKind, MediaPolicy, MediaSource, MessageValidator, RecipientPolicy, Schedule,
    TextPolicy,
};

/// Registry name of the Octobot node.
pub const NAME: &str = "OctobotWapp";

/// Name of the credential the node consumes.
pub const CREDENTIAL_NAME: &str = "octobotWappApi";

/// Default message endpoint.
pub const DEFAULT_API_URL: &str = "https://api.zentramsg.com/v1/messages";

/// Default group-creation endpoint.
pub const DEFAULT_GROUP_API_URL: &str = "https://api.zentramsg.com/v1/whatsapp/groups/create";

/// Upload ceiling for image, video and document messages.
pub const MAX_MEDIA_BYTES: u64 = 16 * MB;

/// Default tool name shown to the agent.
pub const DEFAULT_TOOL_NAME: &str = "OctobotWappTool";

/// Default tool description shown to the agent.
pub const DEFAULT_TOOL_DESCRIPTION: &str = "Send WhatsApp messages or create groups via OctobotWapp API.
Input parameters:
- recipients: For messages: comma-separated numbers or group IDs. For group creation: comma-separated participant numbers
- text_message: For messages: the text to send. For group creation: the group name/subject
- group_picture_url (optional): URL of the group picture when creating groups";

const SERVICE: &str = "Octobot";

const RECIPIENTS: FieldRule = FieldRule::required(&["recipients", "ids"], &[Pattern::ChatNumber]);

const TEXT_SHAPE: RequestShape = RequestShape {
    recipient: Some(RECIPIENTS),
    text: Some(FieldRule::required(
        &["text_message", "text"],
        &[Pattern::MessageWillBe, Pattern::WithText],
    )),
    media: None,
    caption: None,
    group_picture: None,
    raw_text_fallback: false,
    json_example: r#"{"recipients": "201110076346,201110076347", "text_message": "message"}"#,
    text_example: "here is the chat Number: 201110076346 and the message will be ...",
};

const MEDIA_SHAPE: RequestShape = RequestShape {
    recipient: Some(RECIPIENTS),
    text: Some(FieldRule::optional(
        &["text_message", "text"],
        &[Pattern::MessageWillBe, Pattern::WithText],
    )),
    media: None,
    caption: None,
    group_picture: None,
    raw_text_fallback: false,
    json_example: r#"{"recipients": "201110076346", "text_message": "optional caption"}"#,
    text_example: "here is the chat Number: 201110076346 and the message will be ...",
};

const GROUP_SHAPE: RequestShape = RequestShape {
    recipient: Some(RECIPIENTS),
    text: Some(FieldRule::required(&["text_message", "subject"], &[Pattern::MessageWillBe])),
    media: None,
    caption: None,
    group_picture: Some(FieldRule::optional(&["group_picture_url"], &[])),
    raw_text_fallback: false,
    json_example: r#"{"recipients": "201110076346,201110076347", "text_message": "Group name", "group_picture_url": "optional URL"}"#,
    text_example: "here is the chat Number: 201110076346 and the message will be Group name",
};

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// What the configured tool does on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Text,
    Image,
    Video,
    Doc,
    CreateGroup,
}

impl MessageType {
    /// Parse the descriptor option value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "doc" => Some(Self::Doc),
            "create_group" => Some(Self::CreateGroup),
            _ => None,
        }
    }

    /// The wire value of `type_message`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Doc => "doc",
            Self::CreateGroup => "create_group",
        }
    }

    fn media_kind(self) -> Option<MediaKind> {
        match self {
            Self::Image => Some(MediaKind::Image),
            Self::Video => Some(MediaKind::Video),
            Self::Doc => Some(MediaKind::Document),
            Self::Text | Self::CreateGroup => None,
        }
    }

    fn shape(self) -> RequestShape {
        match self {
            Self::Text => TEXT_SHAPE,
            Self::Image | Self::Video | Self::Doc => MEDIA_SHAPE,
            Self::CreateGroup => GROUP_SHAPE,
        }
    }
}

/// Whether recipients are phone numbers or group ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactType {
    Numbers,
    Group,
}

impl ContactType {
    /// Parse the descriptor option value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "numbers" => Some(Self::Numbers),
            "group" => Some(Self::Group),
            _ => None,
        }
    }

    /// The wire value of `type_contact`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numbers => "numbers",
            Self::Group => "group",
        }
    }

    fn policy(self) -> RecipientPolicy {
        match self {
            Self::Numbers => RecipientPolicy::PhoneNumber,
            Self::Group => RecipientPolicy::GroupId,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration and descriptors
// ---------------------------------------------------------------------------

/// Credential fields merged with node inputs by the host.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OctobotConfig {
    #[serde(default, rename = "toolName")]
    pub tool_name: Option<String>,
    #[serde(default, rename = "toolDesc")]
    pub tool_desc: Option<String>,
    #[serde(default)]
    pub type_message: Option<String>,
    #[serde(default)]
    pub type_contact: Option<String>,
    #[serde(default)]
    pub media_path: Option<String>,
    #[serde(default)]
    pub time_to_send: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, rename = "apiToken")]
    pub api_token: Option<String>,
    #[serde(default, rename = "deviceUuid")]
    pub device_uuid: Option<String>,
    #[serde(default, rename = "deviceName")]
    pub device_name: Option<String>,
    #[serde(default, rename = "apiUrl")]
    pub api_url: Option<String>,
    #[serde(default, rename = "groupApiUrl")]
    pub group_api_url: Option<String>,
}

/// Node descriptor for the Octobot tool.
pub fn descriptor() -> AdapterDescriptor {
    AdapterDescriptor::communication(
        NAME,
        "OctobotWapp",
        "Send WhatsApp messages or create groups via OctobotWapp API",
    )
    .credential(CredentialRef {
        label: "Connect Credential".into(),
        name: "credential".into(),
        credential_names: vec![CREDENTIAL_NAME.into()],
        description: Some("Select OctobotWapp credentials".into()),
    })
    .inputs(vec![
        InputParam::new("Tool Name", "toolName", ParamType::String)
            .description("Specify the name of the tool")
            .default_value(DEFAULT_TOOL_NAME),
        InputParam::new("Tool Description", "toolDesc", ParamType::String)
            .description("Specify the description of the tool")
            .default_value(DEFAULT_TOOL_DESCRIPTION),
        InputParam::new("Message Type", "type_message", ParamType::Options)
            .description("Type of message to send or create group")
            .options(vec![
                ParamOption::new("Text Message", "text"),
                ParamOption::new("Image Message", "image"),
                ParamOption::new("Video Message", "video"),
                ParamOption::new("Document Message", "doc"),
                ParamOption::new("Create Group", "create_group"),
            ])
            .default_value("text"),
        InputParam::new("Recipient Type", "type_contact", ParamType::Options)
            .description("Type of recipients")
            .options(vec![
                ParamOption::new("Phone Numbers", "numbers"),
                ParamOption::new("Group IDs", "group"),
            ])
            .default_value("numbers"),
        InputParam::new("Media File Path", "media_path", ParamType::String)
            .description("Full path to media file (required for image/video/document messages)")
            .placeholder("/path/to/file.jpg")
            .additional(),
        InputParam::new("Schedule Time", "time_to_send", ParamType::String)
            .description(
                "Schedule time in format: YYYY-MM-DD HH:mm:ss (leave empty for immediate sending)",
            )
            .placeholder("e.g., 2025-05-20 11:33:00")
            .additional(),
        InputParam::new("Timezone", "timezone", ParamType::String)
            .description("Timezone for scheduled message (required if time_to_send is set)")
            .placeholder("e.g., Asia/Riyadh")
            .additional(),
        InputParam::new("Group API URL", "groupApiUrl", ParamType::String)
            .description("Group creation endpoint URL")
            .default_value(DEFAULT_GROUP_API_URL)
            .additional(),
    ])
}

/// The `octobotWappApi` credential descriptor.
pub fn credential_descriptor() -> CredentialDescriptor {
    CredentialDescriptor {
        name: CREDENTIAL_NAME.into(),
        label: "OctobotWapp API".into(),
        version: 1.0,
        description: "OctobotWapp API credentials for WhatsApp messaging".into(),
        inputs: vec![
            InputParam::new("Device Name", "deviceName", ParamType::String)
                .description("A friendly name to identify this WhatsApp device")
                .placeholder("e.g., Sales Team Phone"),
            InputParam::new("API Token", "apiToken", ParamType::Password)
                .description("Your OctobotWapp API Token")
                .placeholder("Enter your API token"),
            InputParam::new("Device UUID", "deviceUuid", ParamType::Password)
                .description("UUID of the WhatsApp device to send from")
                .placeholder("e.g., 123e4567-e89b-12d3-a456-426614174000"),
            InputParam::new("API URL", "apiUrl", ParamType::String)
                .description("OctobotWapp API endpoint URL")
                .default_value(DEFAULT_API_URL)
                .optional(),
        ],
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// The assembled Octobot tool.
pub type OctobotTool = ToolAdapter<FlexibleParser, MessageValidator, OctobotInvoker, OctobotEncoder>;

fn parse_option<T>(field: &str, raw: Option<String>, default: T, parse: fn(&str) -> Option<T>) -> Result<T> {
    match non_blank(raw) {
        None => Ok(default),
        Some(value) => parse(&value).ok_or_else(|| AdapterError::InvalidConfig {
            tool: NAME.to_string(),
            reason: format!("`{field}` has unsupported value `{value}`"),
        }),
    }
}

/// Construct the Octobot tool from resolved configuration.
pub fn build(values: ResolvedConfig) -> Result<OctobotTool> {
    let config: OctobotConfig = from_resolved(NAME, values)?;

    let token = require(NAME, "apiToken", config.api_token.as_deref())?;
    let device_uuid = require(NAME, "deviceUuid", config.device_uuid.as_deref())?;
    let message_type = parse_option("type_message", config.type_message, MessageType::Text, MessageType::parse)?;
    let contact_type = parse_option("type_contact", config.type_contact, ContactType::Numbers, ContactType::parse)?;

    let http = http_client()?;
    let (mode, validator) = match message_type {
        MessageType::CreateGroup => {
            let url = non_blank(config.group_api_url)
                .unwrap_or_else(|| DEFAULT_GROUP_API_URL.to_string());
            let validator = MessageValidator::new(
                RecipientPolicy::PhoneNumber,
                TextPolicy::Required { max_chars: None },
                http.clone(),
            )
            .with_text_label("Group subject");
            (
                Mode::CreateGroup {
                    url: require_url(NAME, "groupApiUrl", Some(&url))?,
                },
                validator,
            )
        }
        _ => {
            let url = non_blank(config.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string());
            let schedule = non_blank(config.time_to_send).map(|time_to_send| Schedule {
                time_to_send,
                timezone: non_blank(config.timezone),
            });
            let text_policy = match message_type {
                MessageType::Text => TextPolicy::Required { max_chars: None },
                _ => TextPolicy::Optional,
            };
            let mut validator = MessageValidator::new(contact_type.policy(), text_policy, http.clone())
                .with_schedule(schedule.clone());
            if let Some(kind) = message_type.media_kind() {
                let media_path = require(NAME, "media_path", config.media_path.as_deref())?;
                validator = validator.with_media(MediaPolicy {
                    kind,
                    max_bytes: MAX_MEDIA_BYTES,
                    source: MediaSource::Configured(MediaRef::parse(&media_path)),
                });
            }
            (
                Mode::Send {
                    url: require_url(NAME, "apiUrl", Some(&url))?,
                    message_type,
                    contact_type,
                    schedule,
                },
                validator,
            )
        }
    };

    let tool_name = non_blank(config.tool_name).unwrap_or_else(|| DEFAULT_TOOL_NAME.to_string());
    let description =
        non_blank(config.tool_desc).unwrap_or_else(|| DEFAULT_TOOL_DESCRIPTION.to_string());

    info!(
        tool = %tool_name,
        device = config.device_name.as_deref().unwrap_or("unnamed"),
        type_message = message_type.as_str(),
        type_contact = contact_type.as_str(),
        "octobot tool ready"
    );

    let shape = message_type.shape();
    Ok(ToolAdapter::new(
        ToolDefinition {
            name: tool_name,
            description,
            parameters: input_schema(&shape),
        },
        FlexibleParser::new(shape),
        validator,
        OctobotInvoker {
            http,
            token,
            device_uuid,
            mode: mode.clone(),
        },
        OctobotEncoder { mode },
    ))
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// The endpoint and fixed fields of one configured tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Send a message of a fixed kind.
    Send {
        url: String,
        message_type: MessageType,
        contact_type: ContactType,
        schedule: Option<Schedule>,
    },
    /// Create a group.
    CreateGroup { url: String },
}

/// Builds the multipart forms.  Holds the API token and device UUID.
pub struct OctobotInvoker {
    http: reqwest::Client,
    token: String,
    device_uuid: String,
    mode: Mode,
}

impl OctobotInvoker {
    /// The configured mode.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    fn message_form(
        &self,
        request: &ValidatedRequest,
        message_type: MessageType,
        contact_type: ContactType,
        schedule: Option<&Schedule>,
    ) -> StageResult<Form> {
        let mut form = Form::new()
            .text("device_uuid", self.device_uuid.clone())
            .text("type_message", message_type.as_str())
            .text("type_contact", contact_type.as_str())
            .text("ids", request.recipient_list());

        if let Some(schedule) = schedule {
            form = form.text("time_to_send", schedule.time_to_send.clone());
            if let Some(tz) = &schedule.timezone {
                form = form.text("timezone", tz.clone());
            }
        }
        if let Some(text) = &request.text {
            form = form.text("text_message", text.clone());
        }
        if let Some(media) = &request.media {
            form = form.part("media", media_part(SERVICE, media)?);
        }
        Ok(form)
    }

    fn group_form(&self, request: &ValidatedRequest) -> Form {
        let mut form = Form::new()
            .text("deviceUuid", self.device_uuid.clone())
            .text("subject", request.text.clone().unwrap_or_default())
            .text("participants", request.recipient_list());
        if let Some(picture) = &request.group_picture_url {
            form = form.text("groupPicture", picture.clone());
        }
        form
    }
}

#[async_trait]
impl ProviderInvoker for OctobotInvoker {
    async fn send(&self, request: &ValidatedRequest) -> StageResult<ProviderResponse> {
        let builder = match &self.mode {
            Mode::Send {
                url,
                message_type,
                contact_type,
                schedule,
            } => {
                debug!(
                    type_message = message_type.as_str(),
                    recipients = request.recipients.len(),
                    scheduled = schedule.is_some(),
                    "sending octobot message"
                );
                let form = self.message_form(request, *message_type, *contact_type, schedule.as_ref())?;
                self.http.post(url).multipart(form)
            }
            Mode::CreateGroup { url } => {
                debug!(participants = request.recipients.len(), "creating octobot group");
                self.http
                    .post(url)
                    .header("accept", "application/json")
                    .multipart(self.group_form(request))
            }
        };

        dispatch(
            SERVICE,
            builder
                .header("x-api-token", &self.token)
                .timeout(MULTIPART_TIMEOUT),
        )
        .await
    }
}

/// Maps gateway answers onto the compact Octobot outcome.
#[derive(Debug, Clone)]
pub struct OctobotEncoder {
    mode: Mode,
}

impl OutcomeEncoder for OctobotEncoder {
    fn encode(
        &self,
        request: &ValidatedRequest,
        response: &ProviderResponse,
    ) -> StageResult<Outcome> {
        check_response(SERVICE, response, SuccessSignal::SuccessFlag)?;

        match &self.mode {
            Mode::Send { message_type, .. } => {
                Ok(Outcome::success(format!("{} sent", message_type.as_str()))
                    .with("count", request.recipients.len())
                    .with("recipients", request.recipient_list()))
            }
            Mode::CreateGroup { .. } => {
                let subject = request.text.as_deref().unwrap_or_default();
                let message = response
                    .body
                    .get("msg")
                    .and_then(Value::as_str)
                    .filter(|m| !m.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Group \"{subject}\" created successfully"));
                let data = response.body.get("data").cloned().unwrap_or(Value::Null);
                let field = |key: &str| data.get(key).cloned().unwrap_or(Value::Null);

                Ok(Outcome::success(message)
                    .with("groupId", field("groupId"))
                    .with("subject", field("subject"))
                    .with("participants", field("participants"))
                    .with("inviteCode", field("inviteCode"))
                    .with("inviteLink", field("inviteLink"))
                    .with("groupPicture", field("groupPicture")))
            }
        }
    }
}
