//! Provider plugins.
//!
//! Each submodule supplies the strategies, typed configuration and
//! descriptor for one provider family:
//!
//! - [`telegram`]: Telegram Bot API `sendMessage`
//! - [`webhook`]: Slack and Discord incoming webhooks
//! - [`whatsapp`]: the Wapilot and WaConnect WhatsApp gateways
//! - [`octobot`]: the OctobotWapp multi-purpose gateway (messages, media,
//!   scheduling, group creation)

pub mod octobot;
pub mod telegram;
pub mod webhook;
pub mod whatsapp;

use std::time::Duration;

use reqwest::multipart::Part;
use serde_json::{Map, Value, json};

use crate::error::ToolError;
use crate::parser::{FieldRule, RequestShape};
use crate::request::{MediaPayload, ProviderResponse};
use crate::traits::StageResult;

/// Timeout applied to multipart media posts.
pub(crate) const MULTIPART_TIMEOUT: Duration = Duration::from_secs(30);

/// Send a prepared request and read the answer.
///
/// The request URL is stripped from transport errors because some
/// providers carry credentials in the path.
pub(crate) async fn dispatch(
    service: &str,
    request: reqwest::RequestBuilder,
) -> StageResult<ProviderResponse> {
    let response = request
        .send()
        .await
        .map_err(|e| ToolError::transport(service, &e.without_url()))?;
    ProviderResponse::read(response)
        .await
        .map_err(|e| ToolError::transport(service, &e.without_url()))
}

/// Build the multipart file part for validated media.
pub(crate) fn media_part(service: &str, media: &MediaPayload) -> StageResult<Part> {
    Part::bytes(media.bytes.clone())
        .file_name(media.file_name.clone())
        .mime_str(media.mime)
        .map_err(|e| ToolError::transport(service, &e))
}

/// Derive the JSON schema of the structured input form from a request shape.
pub(crate) fn input_schema(shape: &RequestShape) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    let fields = [
        (&shape.recipient, "Recipient identifier(s), comma-separated for bulk sends"),
        (&shape.text, "Message text"),
        (&shape.media, "Local path or http(s) URL of the media file"),
        (&shape.caption, "Optional caption"),
        (&shape.group_picture, "Optional URL of the group picture"),
    ];

    for (rule, description) in fields {
        let Some(rule) = rule else { continue };
        add_field(&mut properties, &mut required, rule, description);
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn add_field(
    properties: &mut Map<String, Value>,
    required: &mut Vec<Value>,
    rule: &FieldRule,
    description: &str,
) {
    let Some(key) = rule.json_keys.first() else {
        return;
    };
    properties.insert(
        (*key).to_string(),
        json!({ "type": "string", "description": description }),
    );
    if rule.required {
        required.push(Value::String((*key).to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Pattern;

    #[test]
    fn schema_lists_primary_keys_and_required_fields() {
        const SHAPE: RequestShape = RequestShape {
            recipient: Some(FieldRule::required(&["chat_id", "chatId"], &[Pattern::ChatNumber])),
            text: None,
            media: Some(FieldRule::required(&["image_path"], &[Pattern::ImagePath])),
            caption: Some(FieldRule::optional(&["caption"], &[Pattern::Caption])),
            group_picture: None,
            raw_text_fallback: false,
            json_example: "{}",
            text_example: "",
        };
        let schema = input_schema(&SHAPE);
        assert_eq!(schema["type"], json!("object"));
        assert!(schema["properties"].get("chat_id").is_some());
        assert!(schema["properties"].get("chatId").is_none());
        assert!(schema["properties"].get("caption").is_some());
        assert_eq!(schema["required"], json!(["chat_id", "image_path"]));
    }

    #[test]
    fn media_part_accepts_known_mime() {
        let media = MediaPayload {
            file_name: "cat.png".into(),
            mime: "image/png",
            bytes: vec![1, 2, 3],
        };
        assert!(media_part("Test", &media).is_ok());
    }
}
