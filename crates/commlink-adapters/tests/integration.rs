//! Integration tests for the commlink-adapters crate.
//!
//! Every tool is built through the registry, exactly as a host would, and
//! driven against a local stub provider.

use std::sync::Arc;

use commlink_adapters::registry::build_tool;
use commlink_adapters::{AgentTool, ResolvedConfig};
use mockito::Matcher;
use serde_json::{Value, json};

fn values(v: Value) -> ResolvedConfig {
    v.as_object().cloned().unwrap()
}

fn tool(name: &str, config: Value) -> Arc<dyn AgentTool> {
    build_tool(name, values(config)).unwrap()
}

async fn invoke(tool: &Arc<dyn AgentTool>, input: &str) -> Value {
    serde_json::from_str(&tool.invoke(input).await).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════
//  WhatsApp gateways
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn leading_zero_recipient_gets_country_digit() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/inst-1/send-message")
        .match_body(Matcher::Json(json!({
            "token": "tok",
            "chat_id": "20101234567",
            "text": "hello"
        })))
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;

    let tool = tool(
        "waconnectText",
        json!({ "apiToken": "tok", "instance_id": "inst-1", "apiBase": server.url() }),
    );
    let out = invoke(&tool, r#"{"chat_id":"0101234567","text":"hello"}"#).await;

    mock.assert_async().await;
    assert_eq!(out["success"], json!(true));
    assert!(out["message"].as_str().unwrap().contains("20101234567"));
}

#[tokio::test]
async fn natural_language_input_reaches_wapilot() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/42/send-message")
        .match_body(Matcher::Json(json!({
            "token": "tok",
            "chat_id": "201110076346",
            "text": "Hi there"
        })))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let tool = tool(
        "whatsappBot",
        json!({ "apiToken": "tok", "instance_id": 42, "apiBase": server.url() }),
    );
    let out = invoke(
        &tool,
        "here is the chat Number : 201110076346 and the message will be Hi there",
    )
    .await;

    mock.assert_async().await;
    assert_eq!(
        out,
        json!({ "success": true, "message": "Message sent successfully to this number '201110076346'!" })
    );
}

#[tokio::test]
async fn with_text_phrase_reaches_waconnect() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/9/send-message")
        .match_body(Matcher::Json(json!({
            "token": "tok",
            "chat_id": "201110076346",
            "text": "Hello there"
        })))
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;

    let tool = tool(
        "waconnectText",
        json!({ "apiToken": "tok", "instance_id": "9", "apiBase": server.url() }),
    );
    let out = invoke(
        &tool,
        "send message to chat Number: 01110076346 with text Hello there. See you",
    )
    .await;

    mock.assert_async().await;
    assert_eq!(
        out["message"],
        json!("Message sent successfully to this number '201110076346'!")
    );
}

#[tokio::test]
async fn json_input_wins_over_embedded_phrases() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/42/send-message")
        .match_body(Matcher::PartialJson(json!({
            "chat_id": "201110076346",
            "text": "the chat Number : 999 and the message will be ignored"
        })))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let tool = tool(
        "whatsappBot",
        json!({ "apiToken": "tok", "instance_id": "42", "apiBase": server.url() }),
    );
    let input = json!({
        "chat_id": "201110076346",
        "text": "the chat Number : 999 and the message will be ignored"
    });
    let out = invoke(&tool, &input.to_string()).await;

    mock.assert_async().await;
    assert_eq!(out["success"], json!(true));
}

#[tokio::test]
async fn oversized_image_is_rejected_before_upload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("holiday.png");
    std::fs::File::create(&path)
        .unwrap()
        .set_len(6 * 1024 * 1024)
        .unwrap();

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let tool = tool(
        "waconnectImage",
        json!({ "apiToken": "tok", "instance_id": "1", "apiBase": server.url() }),
    );
    let input = json!({ "chat_id": "201110076346", "image_path": path.to_string_lossy() });
    let out = invoke(&tool, &input.to_string()).await;

    mock.assert_async().await;
    assert_eq!(
        out,
        json!({ "success": false, "error": "Image size exceeds 5MB limit. Current size: 6.00MB" })
    );
}

#[tokio::test]
async fn oversized_remote_image_is_rejected_before_upload() {
    let mut server = mockito::Server::new_async().await;
    let download = server
        .mock("GET", "/media/poster.png")
        .with_status(200)
        .with_body(vec![b'a'; 6 * 1024 * 1024])
        .create_async()
        .await;
    let upload = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let tool = tool(
        "waconnectImage",
        json!({ "apiToken": "tok", "instance_id": "1", "apiBase": server.url() }),
    );
    let input = json!({
        "chat_id": "201110076346",
        "image_path": format!("{}/media/poster.png", server.url())
    });
    let out = invoke(&tool, &input.to_string()).await;

    download.assert_async().await;
    upload.assert_async().await;
    assert_eq!(
        out,
        json!({ "success": false, "error": "Image size exceeds 5MB limit. Current size: 6.00MB" })
    );
}

#[tokio::test]
async fn unfetchable_remote_file_never_reaches_gateway() {
    let mut server = mockito::Server::new_async().await;
    let download = server
        .mock("GET", "/files/report.pdf")
        .with_status(404)
        .create_async()
        .await;
    let upload = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let tool = tool(
        "waconnectFile",
        json!({ "apiToken": "tok", "instance_id": "1", "apiBase": server.url() }),
    );
    let input = format!(
        "here is the chat Number: 201110076346 and the file path is {}/files/report.pdf",
        server.url()
    );
    let out = invoke(&tool, &input).await;

    download.assert_async().await;
    upload.assert_async().await;
    assert_eq!(out["success"], json!(false));
    assert!(out["error"].as_str().unwrap().contains("HTTP 404"));
}

#[tokio::test]
async fn remote_file_is_downloaded_and_forwarded() {
    let mut server = mockito::Server::new_async().await;
    let download = server
        .mock("GET", "/files/report.pdf")
        .with_status(200)
        .with_body("%PDF-1.4 quarterly")
        .create_async()
        .await;
    let upload = server
        .mock("POST", "/1/send-file")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"filename="report.pdf""#.into()),
            Matcher::Regex("%PDF-1.4 quarterly".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let tool = tool(
        "waconnectFile",
        json!({ "apiToken": "tok", "instance_id": "1", "apiBase": server.url() }),
    );
    let input = json!({
        "chat_id": "201110076346",
        "file_path": format!("{}/files/report.pdf", server.url())
    });
    let out = invoke(&tool, &input.to_string()).await;

    download.assert_async().await;
    upload.assert_async().await;
    assert_eq!(
        out["message"],
        json!("File sent successfully to this number '201110076346'!")
    );
}

#[tokio::test]
async fn provider_error_text_is_bounded() {
    let mut server = mockito::Server::new_async().await;
    let long = "quota exceeded ".repeat(20);
    let mock = server
        .mock("POST", "/1/send-message")
        .with_status(200)
        .with_body(json!({ "ok": false, "message": long }).to_string())
        .create_async()
        .await;

    let tool = tool(
        "whatsappBot",
        json!({ "apiToken": "tok", "instance_id": "1", "apiBase": server.url() }),
    );
    let out = invoke(&tool, r#"{"chat_id":"201110076346","text":"hi"}"#).await;

    mock.assert_async().await;
    assert_eq!(out["success"], json!(false));
    let error = out["error"].as_str().unwrap();
    assert!(error.starts_with("WhatsApp API error: quota exceeded"));
    assert_eq!(error.chars().count(), 100);
}

#[tokio::test]
async fn transport_failure_becomes_failure_outcome() {
    // Nothing listens on port 1.
    let tool = tool(
        "whatsappBot",
        json!({ "apiToken": "tok", "instance_id": "1", "apiBase": "http://127.0.0.1:1" }),
    );
    let out = invoke(&tool, r#"{"chat_id":"201110076346","text":"hi"}"#).await;

    assert_eq!(out["success"], json!(false));
    assert!(out["error"].as_str().unwrap().starts_with("WhatsApp request"));
    assert!(!out["error"].as_str().unwrap().contains("tok"));
}

// ═══════════════════════════════════════════════════════════════════════
//  Octobot
// ═══════════════════════════════════════════════════════════════════════

fn octobot(server: &mockito::ServerGuard, extra: Value) -> Arc<dyn AgentTool> {
    let mut config = json!({
        "apiToken": "octo-token",
        "deviceUuid": "123e4567-e89b-12d3-a456-426614174000",
        "deviceName": "Sales Team Phone",
        "apiUrl": format!("{}/v1/messages", server.url()),
        "groupApiUrl": format!("{}/v1/whatsapp/groups/create", server.url()),
    });
    for (k, v) in extra.as_object().unwrap() {
        config[k] = v.clone();
    }
    tool("OctobotWapp", config)
}

#[tokio::test]
async fn group_creation_posts_participants_and_subject() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/whatsapp/groups/create")
        .match_header("x-api-token", "octo-token")
        .match_header("accept", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="deviceUuid"\r\n\r\n123e4567-e89b-12d3-a456-426614174000"#.into()),
            Matcher::Regex(r#"name="subject"\r\n\r\nSales Team"#.into()),
            Matcher::Regex(
                r#"name="participants"\r\n\r\n201110076346,201110076347,201110076348"#.into(),
            ),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "msg": "Group created",
                "data": {
                    "groupId": "120363123456789012@g.us",
                    "subject": "Sales Team",
                    "participants": ["201110076346", "201110076347", "201110076348"],
                    "inviteCode": "AbCdEf",
                    "inviteLink": "https://chat.whatsapp.com/AbCdEf"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let tool = octobot(&server, json!({ "type_message": "create_group" }));
    let out = invoke(
        &tool,
        r#"{"recipients":"201110076346,201110076347,01110076348","text_message":"Sales Team"}"#,
    )
    .await;

    mock.assert_async().await;
    assert_eq!(out["success"], json!(true));
    assert_eq!(out["message"], json!("Group created"));
    assert_eq!(out["groupId"], json!("120363123456789012@g.us"));
    assert_eq!(out["inviteLink"], json!("https://chat.whatsapp.com/AbCdEf"));
    assert!(out.get("groupPicture").is_none());
}

#[tokio::test]
async fn schedule_without_timezone_fails_before_any_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let tool = octobot(&server, json!({ "time_to_send": "2025-05-20 11:33:00" }));
    let out = invoke(&tool, r#"{"recipients":"201110076346","text_message":"hi"}"#).await;

    mock.assert_async().await;
    assert_eq!(
        out,
        json!({ "success": false, "error": "Timezone is required when scheduling is enabled" })
    );
}

#[tokio::test]
async fn missing_media_file_never_calls_provider() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let missing = octobot(
        &server,
        json!({ "type_message": "image", "media_path": "/definitely/not/here.jpg" }),
    );
    let out = invoke(&missing, r#"{"recipients":"201110076346"}"#).await;
    assert_eq!(
        out["error"],
        json!("Image file not found at path: /definitely/not/here.jpg")
    );

    mock.assert_async().await;
}

#[tokio::test]
async fn document_message_uploads_configured_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoice.pdf");
    std::fs::write(&path, "%PDF-1.4 invoice").unwrap();

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-token", "octo-token")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="type_message"\r\n\r\ndoc"#.into()),
            Matcher::Regex(r#"name="type_contact"\r\n\r\nnumbers"#.into()),
            Matcher::Regex(r#"name="text_message"\r\n\r\nYour invoice"#.into()),
            Matcher::Regex(r#"filename="invoice.pdf""#.into()),
        ]))
        .with_status(200)
        .with_body(r#"{"data":{"success":true}}"#)
        .create_async()
        .await;

    let tool = octobot(
        &server,
        json!({ "type_message": "doc", "media_path": path.to_string_lossy() }),
    );
    let out = invoke(
        &tool,
        r#"{"recipients":"201110076346","text_message":"Your invoice"}"#,
    )
    .await;

    mock.assert_async().await;
    assert_eq!(
        out,
        json!({
            "success": true,
            "message": "doc sent",
            "count": 1,
            "recipients": "201110076346"
        })
    );
}

#[tokio::test]
async fn octobot_business_failure_reports_msg() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_body(r#"{"success":false,"msg":"Device is offline"}"#)
        .create_async()
        .await;

    let tool = octobot(&server, json!({}));
    let out = invoke(&tool, r#"{"recipients":"201110076346","text_message":"hi"}"#).await;

    mock.assert_async().await;
    assert_eq!(out["success"], json!(false));
    assert_eq!(out["error"], json!("Octobot API error: Device is offline"));
    assert_eq!(out["status"], json!(200));
}

// ═══════════════════════════════════════════════════════════════════════
//  Telegram, Slack, Discord
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn telegram_numeric_chat_id_is_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bot42:secret/sendMessage")
        .match_body(Matcher::Json(json!({ "chat_id": "123456789", "text": "hi" })))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{"message_id":1}}"#)
        .create_async()
        .await;

    let tool = tool(
        "telegramBot",
        json!({ "botToken": "42:secret", "apiBase": server.url() }),
    );
    let out = invoke(&tool, r#"{"chat_id":123456789,"text":"hi"}"#).await;

    mock.assert_async().await;
    assert_eq!(out["message"], json!("Message sent successfully to Telegram!"));
    assert_eq!(out["chatId"], json!("123456789"));
}

#[tokio::test]
async fn telegram_ok_false_is_a_failure() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bot42:secret/sendMessage")
        .with_status(400)
        .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#)
        .create_async()
        .await;

    let tool = tool(
        "telegramBot",
        json!({ "botToken": "42:secret", "apiBase": server.url() }),
    );
    let out = invoke(&tool, r#"{"chatId":"1","message":"hi"}"#).await;

    mock.assert_async().await;
    assert_eq!(
        out,
        json!({
            "success": false,
            "error": "Telegram API error: Bad Request: chat not found",
            "status": 400
        })
    );
}

#[tokio::test]
async fn slack_sends_whole_raw_input() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/services/T0/B0/x")
        .match_body(Matcher::Json(json!({ "text": "Release 1.4 is live. Notes follow." })))
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let tool = tool(
        "slackWebhook",
        json!({ "webhookURL": format!("{}/services/T0/B0/x", server.url()) }),
    );
    let out = invoke(&tool, "Release 1.4 is live. Notes follow.").await;

    mock.assert_async().await;
    assert_eq!(out["message"], json!("Message sent successfully to Slack!"));
}

// ═══════════════════════════════════════════════════════════════════════
//  Construction and concurrency
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn construction_rejects_bad_configuration() {
    let unknown = build_tool(
        "waconnectText",
        values(json!({ "apiToken": "t", "instance_id": "1", "instanceId": "1" })),
    )
    .err()
    .unwrap();
    assert!(unknown.to_string().contains("instanceId"));

    let empty = build_tool("whatsappBot", values(json!({ "apiToken": "", "instance_id": "1" })))
        .err()
        .unwrap();
    assert!(empty.to_string().contains("apiToken"));

    let no_media = build_tool(
        "OctobotWapp",
        values(json!({
            "apiToken": "octo-token",
            "deviceUuid": "123e4567-e89b-12d3-a456-426614174000",
            "type_message": "video"
        })),
    )
    .err()
    .unwrap();
    assert_eq!(
        no_media.to_string(),
        "missing configuration for `OctobotWapp`: `media_path` is required"
    );
}

#[tokio::test]
async fn concurrent_invokes_share_one_tool() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/1/send-message")
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .expect(2)
        .create_async()
        .await;

    let tool = tool(
        "waconnectText",
        json!({ "apiToken": "tok", "instance_id": "1", "apiBase": server.url() }),
    );
    let first = Arc::clone(&tool);
    let second = Arc::clone(&tool);
    let (a, b) = tokio::join!(
        async move { first.invoke(r#"{"chat_id":"201110076346","text":"one"}"#).await },
        async move { second.invoke(r#"{"chat_id":"201110076347","text":"two"}"#).await },
    );

    mock.assert_async().await;
    assert!(a.contains("201110076346"));
    assert!(b.contains("201110076347"));
}
