//! WhatsApp gateway adapters.
//!
//! Four tools share one instance-scoped wire contract,
//! `POST {apiBase}/{instance_id}/{method}` with the API token in the body:
//!
//! | Tool             | Method         | Body                                   | Success      |
//! |------------------|----------------|----------------------------------------|--------------|
//! | `whatsappBot`    | `send-message` | JSON `{token, chat_id, text}`          | `ok`         |
//! | `waconnectText`  | `send-message` | JSON `{token, chat_id, text}`          | `success`    |
//! | `waconnectImage` | `send-image`   | multipart `token, chat_id, caption?, media` | `ok`    |
//! | `waconnectFile`  | `send-file`    | multipart `token, chat_id, caption?, media` | `ok`    |

use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{MULTIPART_TIMEOUT, dispatch, input_schema, media_part};
use crate::adapter::{ToolAdapter, http_client};
use crate::config::{ResolvedConfig, from_resolved, non_blank, require, require_url, string_like};
use crate::descriptor::{AdapterDescriptor, InputParam, ParamType};
use crate::error::{Result, ToolError};
use crate::outcome::{Outcome, SuccessSignal, check_response};
use crate::parser::{FieldRule, FlexibleParser, Pattern, RequestShape};
use crate::request::{ProviderResponse, ValidatedRequest};
use crate::traits::{OutcomeEncoder, ProviderInvoker, StageResult, ToolDefinition};
use crate::validator::{
    MB, MediaKind, MediaPolicy, MediaSource, MessageValidator, RecipientPolicy, TextPolicy,
};

/// Default base URL of the Wapilot gateway.
pub const WAPILOT_API_BASE: &str = "https://wapilot.net/api/v1";

/// Default base URL of the WaConnect gateway.
pub const WACONNECT_API_BASE: &str = "https://waconnect.aimicromind.com/api/v1";

/// Longest text the WaConnect gateway accepts.
pub const MAX_TEXT_CHARS: usize = 4096;

/// Upload ceiling of the WaConnect media endpoints.
pub const MAX_MEDIA_BYTES: u64 = 5 * MB;

const SERVICE: &str = "WhatsApp";

const CHAT_ID: FieldRule = FieldRule::required(&["chat_id"], &[Pattern::ChatNumber]);
const CAPTION: FieldRule = FieldRule::optional(&["caption"], &[Pattern::Caption]);

const BOT_SHAPE: RequestShape = RequestShape {
    recipient: Some(CHAT_ID),
    text: Some(FieldRule::required(&["text"], &[Pattern::MessageWillBe])),
    media: None,
    caption: None,
    group_picture: None,
    raw_text_fallback: false,
    json_example: r#"{"text": "message", "chat_id": "number"}"#,
    text_example: "here is the chat Number: 12345 and the message will be ...",
};

const TEXT_SHAPE: RequestShape = RequestShape {
    recipient: Some(CHAT_ID),
    text: Some(FieldRule::required(
        &["text"],
        &[Pattern::WithText, Pattern::TextColon],
    )),
    media: None,
    caption: None,
    group_picture: None,
    raw_text_fallback: false,
    json_example: r#"{"chat_id": "number", "text": "message content"}"#,
    text_example: "send message to chat Number: 12345 with text Hello there.",
};

const IMAGE_SHAPE: RequestShape = RequestShape {
    recipient: Some(CHAT_ID),
    text: None,
    media: Some(FieldRule::required(&["image_path"], &[Pattern::ImagePath])),
    caption: Some(CAPTION),
    group_picture: None,
    raw_text_fallback: false,
    json_example: r#"{"image_path": "path/to/image.jpg", "chat_id": "number", "caption": "optional text"}"#,
    text_example: "here is the chat Number: 12345 and the image path is path/to/image.jpg with caption This is my image.",
};

const FILE_SHAPE: RequestShape = RequestShape {
    recipient: Some(CHAT_ID),
    text: None,
    media: Some(FieldRule::required(&["file_path"], &[Pattern::FilePath])),
    caption: Some(CAPTION),
    group_picture: None,
    raw_text_fallback: false,
    json_example: r#"{"file_path": "path/to/file.pdf", "chat_id": "number", "caption": "optional text"}"#,
    text_example: "here is the chat Number: 12345 and the file path is path/to/file.pdf with caption This is my document.",
};

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// One of the gateway tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayTool {
    /// Wapilot text messages.
    WapilotText,
    /// WaConnect text messages.
    WaConnectText,
    /// WaConnect image uploads.
    WaConnectImage,
    /// WaConnect document uploads.
    WaConnectFile,
}

impl GatewayTool {
    /// Every gateway tool, in registry order.
    pub const ALL: [Self; 4] = [
        Self::WapilotText,
        Self::WaConnectText,
        Self::WaConnectImage,
        Self::WaConnectFile,
    ];

    /// Registry name of the node.
    pub fn node_name(self) -> &'static str {
        match self {
            Self::WapilotText => "whatsappBot",
            Self::WaConnectText => "waconnectText",
            Self::WaConnectImage => "waconnectImage",
            Self::WaConnectFile => "waconnectFile",
        }
    }

    /// Look a variant up by its registry name.
    pub fn from_node_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.node_name() == name)
    }

    fn label(self) -> &'static str {
        match self {
            Self::WapilotText => "Whatsapp Bot",
            Self::WaConnectText => "WaConnect Text",
            Self::WaConnectImage => "WaConnect Image",
            Self::WaConnectFile => "WaConnect File",
        }
    }

    fn summary(self) -> &'static str {
        match self {
            Self::WapilotText => "Send messages to phone number via whatsapp",
            Self::WaConnectText => "Send text messages to phone number via WhatsApp",
            Self::WaConnectImage => "Send images to phone number via WhatsApp",
            Self::WaConnectFile => "Send document files to phone number via WhatsApp",
        }
    }

    fn tool_name(self) -> &'static str {
        match self {
            Self::WapilotText => "whatsappTool",
            Self::WaConnectText => "whatsappTextTool",
            Self::WaConnectImage => "whatsappImageTool",
            Self::WaConnectFile => "whatsappFileTool",
        }
    }

    fn tool_description(self) -> String {
        let shape = self.shape();
        let what = match self {
            Self::WapilotText | Self::WaConnectText => "text messages",
            Self::WaConnectImage => "images (local path or URL, optional caption)",
            Self::WaConnectFile => "document files (local path or URL, optional caption)",
        };
        format!(
            "Send {what} to Whatsapp chats. \
             The API token and instance id are configured on the node; never ask the user for them. \
             Input can be JSON like {} or natural language like \"{}\". \
             \"chat_id\" is the recipient phone number; numbers starting with 0 get the 2 country prefix. \
             The output is a JSON object with \"success\" and either \"message\" or \"error\".",
            shape.json_example, shape.text_example
        )
    }

    fn default_api_base(self) -> &'static str {
        match self {
            Self::WapilotText => WAPILOT_API_BASE,
            _ => WACONNECT_API_BASE,
        }
    }

    fn method(self) -> &'static str {
        match self {
            Self::WapilotText | Self::WaConnectText => "send-message",
            Self::WaConnectImage => "send-image",
            Self::WaConnectFile => "send-file",
        }
    }

    fn shape(self) -> RequestShape {
        match self {
            Self::WapilotText => BOT_SHAPE,
            Self::WaConnectText => TEXT_SHAPE,
            Self::WaConnectImage => IMAGE_SHAPE,
            Self::WaConnectFile => FILE_SHAPE,
        }
    }

    fn text_policy(self) -> TextPolicy {
        match self {
            Self::WapilotText => TextPolicy::Required { max_chars: None },
            Self::WaConnectText => TextPolicy::Required {
                max_chars: Some(MAX_TEXT_CHARS),
            },
            Self::WaConnectImage | Self::WaConnectFile => TextPolicy::Optional,
        }
    }

    fn media_kind(self) -> Option<MediaKind> {
        match self {
            Self::WapilotText | Self::WaConnectText => None,
            Self::WaConnectImage => Some(MediaKind::Image),
            Self::WaConnectFile => Some(MediaKind::Document),
        }
    }

    fn signal(self) -> SuccessSignal {
        match self {
            Self::WaConnectText => SuccessSignal::SuccessFlag,
            _ => SuccessSignal::OkFlag,
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Self::WapilotText | Self::WaConnectText => "Message",
            Self::WaConnectImage => "Image",
            Self::WaConnectFile => "File",
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration and construction
// ---------------------------------------------------------------------------

/// The assembled gateway tool.
pub type WhatsappTool = ToolAdapter<FlexibleParser, MessageValidator, GatewayInvoker, GatewayEncoder>;

/// Node-level configuration shared by the gateway tools.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default, rename = "apiToken")]
    pub api_token: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub instance_id: Option<String>,
    /// Override of the gateway base URL.
    #[serde(default, rename = "apiBase")]
    pub api_base: Option<String>,
}

/// Node descriptor for one gateway tool.
pub fn descriptor(tool: GatewayTool) -> AdapterDescriptor {
    AdapterDescriptor::communication(tool.node_name(), tool.label(), tool.summary()).inputs(vec![
        InputParam::new("Api Token", "apiToken", ParamType::Password)
            .description("Your WhatsApp API Token"),
        InputParam::new("Instance ID", "instance_id", ParamType::String)
            .description("Your WhatsApp instance ID"),
        InputParam::new("API Base URL", "apiBase", ParamType::String)
            .description("Gateway base URL")
            .default_value(tool.default_api_base())
            .additional(),
    ])
}

/// Construct a gateway tool from resolved configuration.
pub fn build(tool: GatewayTool, values: ResolvedConfig) -> Result<WhatsappTool> {
    let name = tool.node_name();
    let config: GatewayConfig = from_resolved(name, values)?;
    let token = require(name, "apiToken", config.api_token.as_deref())?;
    let instance_id = require(name, "instance_id", config.instance_id.as_deref())?;
    let api_base =
        non_blank(config.api_base).unwrap_or_else(|| tool.default_api_base().to_string());
    let api_base = require_url(name, "apiBase", Some(&api_base))?;

    let http = http_client()?;
    let mut validator = MessageValidator::new(RecipientPolicy::PhoneNumber, tool.text_policy(), http.clone());
    if let Some(kind) = tool.media_kind() {
        validator = validator.with_media(MediaPolicy {
            kind,
            max_bytes: MAX_MEDIA_BYTES,
            source: MediaSource::Request,
        });
    }

    info!(tool = tool.tool_name(), method = tool.method(), "whatsapp gateway tool ready");

    let shape = tool.shape();
    Ok(ToolAdapter::new(
        ToolDefinition {
            name: tool.tool_name().to_string(),
            description: tool.tool_description(),
            parameters: input_schema(&shape),
        },
        FlexibleParser::new(shape),
        validator,
        GatewayInvoker {
            http,
            url: format!("{api_base}/{instance_id}/{}", tool.method()),
            token,
            tool,
        },
        GatewayEncoder { tool },
    ))
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Sends to the instance-scoped gateway endpoint.  Holds the API token.
pub struct GatewayInvoker {
    http: reqwest::Client,
    url: String,
    token: String,
    tool: GatewayTool,
}

impl GatewayInvoker {
    /// The endpoint this invoker posts to.
    pub fn endpoint(&self) -> &str {
        &self.url
    }

    fn json_request(&self, request: &ValidatedRequest) -> reqwest::RequestBuilder {
        let body = json!({
            "token": self.token,
            "chat_id": request.recipient_list(),
            "text": request.text.as_deref().unwrap_or_default(),
        });
        self.http.post(&self.url).json(&body)
    }

    fn multipart_request(&self, request: &ValidatedRequest) -> StageResult<reqwest::RequestBuilder> {
        let media = request.media.as_ref().ok_or_else(|| ToolError::Provider {
            status: None,
            reason: format!("{SERVICE} {} upload has no media", self.tool.noun()),
        })?;

        let mut form = Form::new()
            .text("token", self.token.clone())
            .text("chat_id", request.recipient_list());
        if let Some(caption) = &request.caption {
            form = form.text("caption", caption.clone());
        }
        form = form.part("media", media_part(SERVICE, media)?);

        Ok(self
            .http
            .post(&self.url)
            .multipart(form)
            .timeout(MULTIPART_TIMEOUT))
    }
}

#[async_trait]
impl ProviderInvoker for GatewayInvoker {
    async fn send(&self, request: &ValidatedRequest) -> StageResult<ProviderResponse> {
        debug!(
            tool = self.tool.tool_name(),
            chat_id = %request.recipient_list(),
            has_media = request.media.is_some(),
            "sending whatsapp gateway request"
        );
        let builder = match self.tool.media_kind() {
            None => self.json_request(request),
            Some(_) => self.multipart_request(request)?,
        };
        dispatch(SERVICE, builder).await
    }
}

/// Checks the gateway's success flag and names the recipient.
#[derive(Debug, Clone, Copy)]
pub struct GatewayEncoder {
    tool: GatewayTool,
}

impl OutcomeEncoder for GatewayEncoder {
    fn encode(
        &self,
        request: &ValidatedRequest,
        response: &ProviderResponse,
    ) -> StageResult<Outcome> {
        check_response(SERVICE, response, self.tool.signal())?;
        Ok(Outcome::success(format!(
            "{} sent successfully to this number '{}'!",
            self.tool.noun(),
            request.recipient_list()
        )))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::error::AdapterError;
    use crate::traits::AgentTool;

    fn config(v: Value) -> ResolvedConfig {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn node_names_round_trip() {
        for tool in GatewayTool::ALL {
            assert_eq!(GatewayTool::from_node_name(tool.node_name()), Some(tool));
        }
        assert_eq!(GatewayTool::from_node_name("telegramBot"), None);
    }

    #[test]
    fn endpoint_is_instance_scoped() {
        let tool = build(
            GatewayTool::WaConnectImage,
            config(json!({ "apiToken": "t", "instance_id": 7788 })),
        )
        .unwrap();
        assert_eq!(
            tool.invoker().endpoint(),
            "https://waconnect.aimicromind.com/api/v1/7788/send-image"
        );

        let bot = build(
            GatewayTool::WapilotText,
            config(json!({ "apiToken": "t", "instance_id": "abc" })),
        )
        .unwrap();
        assert_eq!(bot.invoker().endpoint(), "https://wapilot.net/api/v1/abc/send-message");
    }

    #[test]
    fn missing_instance_id_fails_construction() {
        let err = build(GatewayTool::WaConnectText, config(json!({ "apiToken": "t" })))
            .err()
            .unwrap();
        assert!(matches!(err, AdapterError::MissingConfig { ref field, .. } if field == "instance_id"));
    }

    #[test]
    fn descriptor_declares_credentials() {
        let d = descriptor(GatewayTool::WaConnectFile);
        assert_eq!(d.name, "waconnectFile");
        assert_eq!(d.input("apiToken").unwrap().kind, ParamType::Password);
        assert!(d.input("apiBase").unwrap().additional_params);
    }

    #[test]
    fn encoder_names_media_noun() {
        let request = ValidatedRequest {
            recipients: vec!["201110076346".into()],
            ..Default::default()
        };
        let ok = ProviderResponse {
            status: 200,
            body: json!({ "ok": true }),
        };
        let outcome = GatewayEncoder {
            tool: GatewayTool::WaConnectFile,
        }
        .encode(&request, &ok)
        .unwrap();
        assert_eq!(
            outcome.message.as_deref(),
            Some("File sent successfully to this number '201110076346'!")
        );
    }

    #[tokio::test]
    async fn text_over_limit_never_reaches_gateway() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let tool = build(
            GatewayTool::WaConnectText,
            config(json!({ "apiToken": "t", "instance_id": "1", "apiBase": server.url() })),
        )
        .unwrap();
        let input = json!({ "chat_id": "201110076346", "text": "a".repeat(MAX_TEXT_CHARS + 1) });
        let out: Value = serde_json::from_str(&tool.invoke(&input.to_string()).await).unwrap();

        mock.assert_async().await;
        assert_eq!(out["success"], json!(false));
        assert_eq!(
            out["error"],
            json!("Message exceeds the maximum length of 4096 characters. Current length: 4097 characters.")
        );
    }

    #[tokio::test]
    async fn image_is_uploaded_as_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, b"fake png bytes").unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/55/send-image")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("multipart/form-data".into()),
            )
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(r#"name="chat_id"\r\n\r\n201110076346"#.into()),
                mockito::Matcher::Regex(r#"name="caption"\r\n\r\nMy cat"#.into()),
                mockito::Matcher::Regex(r#"filename="cat.png""#.into()),
            ]))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let tool = build(
            GatewayTool::WaConnectImage,
            config(json!({ "apiToken": "t", "instance_id": "55", "apiBase": server.url() })),
        )
        .unwrap();
        let input = format!(
            "here is the chat Number: 01110076346 and the image path is {} with caption My cat. Thanks",
            path.display()
        );
        let out: Value = serde_json::from_str(&tool.invoke(&input).await).unwrap();

        mock.assert_async().await;
        assert_eq!(
            out["message"],
            json!("Image sent successfully to this number '201110076346'!")
        );
    }
}
