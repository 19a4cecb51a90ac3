//! Telegram Bot API adapter.
//!
//! Sends one text message per call through
//! `POST {apiBase}/bot{token}/sendMessage` with a JSON body
//! `{chat_id, text}`.  Telegram answers `{ "ok": true, "result": {...} }`
//! on success and `{ "ok": false, "error_code": 400, "description": "..." }`
//! on failure.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{dispatch, input_schema};
use crate::adapter::{ToolAdapter, http_client};
use crate::config::{ResolvedConfig, from_resolved, non_blank, require, require_url};
use crate::descriptor::{AdapterDescriptor, InputParam, ParamType};
use crate::error::Result;
use crate::outcome::{Outcome, SuccessSignal, check_response};
use crate::parser::{FieldRule, FlexibleParser, Pattern, RequestShape};
use crate::request::{ProviderResponse, ValidatedRequest};
use crate::traits::{OutcomeEncoder, ProviderInvoker, StageResult, ToolDefinition};
use crate::validator::{MessageValidator, RecipientPolicy, TextPolicy};

/// Registry name of the Telegram node.
pub const NAME: &str = "telegramBot";

/// Default Telegram Bot API host.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

const SERVICE: &str = "Telegram";

const TOOL_NAME: &str = "telegram";

const TOOL_DESCRIPTION: &str = "Send messages to Telegram chats. \
Input should be a JSON string with two keys: \"chat_id\" and \"text\" (\"chatId\" and \"message\" are accepted too). \
Natural language like \"here is the chat Number : 12345 and the message will be Hello\" also works. \
The output is a JSON object with \"success\" and either \"message\" or \"error\".";

const SHAPE: RequestShape = RequestShape {
    recipient: Some(FieldRule::required(&["chat_id", "chatId"], &[Pattern::ChatNumber])),
    text: Some(FieldRule::required(
        &["text", "message"],
        &[Pattern::MessageWillBe, Pattern::WithText],
    )),
    media: None,
    caption: None,
    group_picture: None,
    raw_text_fallback: false,
    json_example: r#"{"chat_id": "number", "text": "message"}"#,
    text_example: "here is the chat Number: 12345 and the message will be ...",
};

/// The assembled Telegram tool.
pub type TelegramTool = ToolAdapter<FlexibleParser, MessageValidator, TelegramInvoker, TelegramEncoder>;

/// Node-level configuration of the Telegram tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot token issued by @BotFather.
    #[serde(default, rename = "botToken")]
    pub bot_token: Option<String>,
    /// Override of the Bot API host, mainly for local Bot API servers.
    #[serde(default, rename = "apiBase")]
    pub api_base: Option<String>,
}

/// Node descriptor for the Telegram tool.
pub fn descriptor() -> AdapterDescriptor {
    AdapterDescriptor::communication(NAME, "Telegram Bot", "Send messages to a Telegram chat").inputs(
        vec![
            InputParam::new("Bot Token", "botToken", ParamType::Password)
                .description("Your Telegram Bot API Token"),
            InputParam::new("API Base URL", "apiBase", ParamType::String)
                .description("Telegram Bot API host")
                .default_value(DEFAULT_API_BASE)
                .additional(),
        ],
    )
}

/// Construct the Telegram tool from resolved configuration.
pub fn build(values: ResolvedConfig) -> Result<TelegramTool> {
    let config: TelegramConfig = from_resolved(NAME, values)?;
    let token = require(NAME, "botToken", config.bot_token.as_deref())?;
    let api_base = non_blank(config.api_base).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let api_base = require_url(NAME, "apiBase", Some(&api_base))?;

    let http = http_client()?;
    let invoker = TelegramInvoker {
        http: http.clone(),
        endpoint: format!("{api_base}/bot{token}/sendMessage"),
    };
    let validator = MessageValidator::new(
        RecipientPolicy::Any,
        TextPolicy::Required { max_chars: None },
        http,
    );

    info!(tool = TOOL_NAME, "telegram tool ready");

    Ok(ToolAdapter::new(
        ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: TOOL_DESCRIPTION.to_string(),
            parameters: input_schema(&SHAPE),
        },
        FlexibleParser::new(SHAPE),
        validator,
        invoker,
        TelegramEncoder,
    ))
}

/// Posts `sendMessage` calls.  The endpoint embeds the bot token; keep
/// this type out of `Debug` output.
pub struct TelegramInvoker {
    http: reqwest::Client,
    endpoint: String,
}

#[async_trait]
impl ProviderInvoker for TelegramInvoker {
    async fn send(&self, request: &ValidatedRequest) -> StageResult<ProviderResponse> {
        let body = json!({
            "chat_id": request.recipient_list(),
            "text": request.text.as_deref().unwrap_or_default(),
        });
        debug!(chat_id = %request.recipient_list(), "sending telegram message");
        dispatch(SERVICE, self.http.post(&self.endpoint).json(&body)).await
    }
}

/// Checks the `ok` flag of a Bot API answer.
#[derive(Debug, Clone, Copy)]
pub struct TelegramEncoder;

impl OutcomeEncoder for TelegramEncoder {
    fn encode(
        &self,
        request: &ValidatedRequest,
        response: &ProviderResponse,
    ) -> StageResult<Outcome> {
        check_response(SERVICE, response, SuccessSignal::OkFlag)?;
        let mut outcome = Outcome::success("Message sent successfully to Telegram!")
            .with("chatId", request.recipient_list());
        if let Some(id) = response.body.pointer("/result/message_id") {
            outcome = outcome.with("messageId", id.clone());
        }
        Ok(outcome)
    }
}
