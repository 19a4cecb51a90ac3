//! Slack and Discord incoming-webhook adapters.
//!
//! Both post the agent's text to a single configured URL; they differ only
//! in the body key (`text` for Slack, `content` for Discord).  Any 2xx
//! status counts as delivered: Slack answers `200 ok`, Discord `204`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{dispatch, input_schema};
use crate::adapter::{ToolAdapter, http_client};
use crate::config::{ResolvedConfig, from_resolved, require_url};
use crate::descriptor::{AdapterDescriptor, InputParam, ParamType};
use crate::error::Result;
use crate::outcome::{Outcome, SuccessSignal, check_response};
use crate::parser::{FieldRule, FlexibleParser, RequestShape};
use crate::request::{ProviderResponse, ValidatedRequest};
use crate::traits::{OutcomeEncoder, ProviderInvoker, StageResult, ToolDefinition};
use crate::validator::{MessageValidator, RecipientPolicy, TextPolicy};

/// Registry name of the Slack node.
pub const SLACK_NAME: &str = "slackWebhook";

/// Registry name of the Discord node.
pub const DISCORD_NAME: &str = "discordWebhook";

const SLACK_SHAPE: RequestShape = RequestShape {
    recipient: None,
    text: Some(FieldRule::required(&["text"], &[])),
    media: None,
    caption: None,
    group_picture: None,
    raw_text_fallback: true,
    json_example: r#"{"text": "message"}"#,
    text_example: "Deployment finished successfully",
};

const DISCORD_SHAPE: RequestShape = RequestShape {
    recipient: None,
    text: Some(FieldRule::required(&["content"], &[])),
    media: None,
    caption: None,
    group_picture: None,
    raw_text_fallback: true,
    json_example: r#"{"content": "message"}"#,
    text_example: "Deployment finished successfully",
};

/// Which webhook flavour a tool targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookKind {
    Slack,
    Discord,
}

impl WebhookKind {
    /// Registry name of the node.
    pub fn node_name(self) -> &'static str {
        match self {
            Self::Slack => SLACK_NAME,
            Self::Discord => DISCORD_NAME,
        }
    }

    fn service(self) -> &'static str {
        match self {
            Self::Slack => "Slack",
            Self::Discord => "Discord",
        }
    }

    fn tool_name(self) -> &'static str {
        match self {
            Self::Slack => "Slack",
            Self::Discord => "discord",
        }
    }

    fn tool_description(self) -> &'static str {
        match self {
            Self::Slack => {
                "Send a message to a Slack channel. The whole input is posted as the message text. \
                 You may need to send this message and then use another tool."
            }
            Self::Discord => {
                "Send a message to a Discord channel. The whole input is posted as the message content. \
                 You may need to send this message and then use another tool."
            }
        }
    }

    fn body_key(self) -> &'static str {
        match self {
            Self::Slack => "text",
            Self::Discord => "content",
        }
    }

    fn shape(self) -> RequestShape {
        match self {
            Self::Slack => SLACK_SHAPE,
            Self::Discord => DISCORD_SHAPE,
        }
    }
}

/// The assembled webhook tool.
pub type WebhookTool = ToolAdapter<FlexibleParser, MessageValidator, WebhookInvoker, WebhookEncoder>;

/// Node-level configuration shared by both webhook tools.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    #[serde(default, rename = "webhookURL")]
    pub webhook_url: Option<String>,
}

/// Node descriptor for one webhook flavour.
pub fn descriptor(kind: WebhookKind) -> AdapterDescriptor {
    let (label, description, field_description) = match kind {
        WebhookKind::Slack => (
            "Slack Webhook",
            "Send messages to Slack via Webhook",
            "Your slack webhook URL",
        ),
        WebhookKind::Discord => (
            "Discord Webhook",
            "Send messages to a Discord channel via Webhook",
            "Your discord webhook URL",
        ),
    };
    AdapterDescriptor::communication(kind.node_name(), label, description).inputs(vec![
        InputParam::new("Webhook URL", "webhookURL", ParamType::Password)
            .description(field_description),
    ])
}

/// Construct a webhook tool from resolved configuration.
pub fn build(kind: WebhookKind, values: ResolvedConfig) -> Result<WebhookTool> {
    let name = kind.node_name();
    let config: WebhookConfig = from_resolved(name, values)?;
    let url = require_url(name, "webhookURL", config.webhook_url.as_deref())?;

    let http = http_client()?;
    let validator = MessageValidator::new(
        RecipientPolicy::NotUsed,
        TextPolicy::Required { max_chars: None },
        http.clone(),
    );
    let shape = kind.shape();

    info!(tool = kind.tool_name(), "webhook tool ready");

    Ok(ToolAdapter::new(
        ToolDefinition {
            name: kind.tool_name().to_string(),
            description: kind.tool_description().to_string(),
            parameters: input_schema(&shape),
        },
        FlexibleParser::new(shape),
        validator,
        WebhookInvoker { http, url, kind },
        WebhookEncoder { kind },
    ))
}

/// Posts the message to the webhook URL.  The URL is the credential.
pub struct WebhookInvoker {
    http: reqwest::Client,
    url: String,
    kind: WebhookKind,
}

#[async_trait]
impl ProviderInvoker for WebhookInvoker {
    async fn send(&self, request: &ValidatedRequest) -> StageResult<ProviderResponse> {
        let text = request.text.as_deref().unwrap_or_default();
        let mut body = Map::new();
        body.insert(self.kind.body_key().to_string(), Value::String(text.to_string()));
        debug!(service = self.kind.service(), chars = text.chars().count(), "posting webhook message");
        dispatch(self.kind.service(), self.http.post(&self.url).json(&Value::Object(body))).await
    }
}

/// Accepts any 2xx answer.
#[derive(Debug, Clone, Copy)]
pub struct WebhookEncoder {
    kind: WebhookKind,
}

impl OutcomeEncoder for WebhookEncoder {
    fn encode(
        &self,
        _request: &ValidatedRequest,
        response: &ProviderResponse,
    ) -> StageResult<Outcome> {
        check_response(self.kind.service(), response, SuccessSignal::HttpStatus)?;
        Ok(Outcome::success(format!(
            "Message sent successfully to {}!",
            self.kind.service()
        )))
    }
}
