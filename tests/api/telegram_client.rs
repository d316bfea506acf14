use crate::helpers::init_tracing;
use secrecy::Secret;
use serde_json::json;
use weather_notifier::configuration::TelegramSettings;
use weather_notifier::delivery::{DeliveryChannel, RenderMode};
use weather_notifier::telegram::{TelegramClient, TelegramError};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123456:test-token";

fn client(server: &MockServer) -> TelegramClient {
    init_tracing();
    TelegramClient::new(&TelegramSettings {
        base_url: server.uri(),
        bot_token: Secret::new(TOKEN.into()),
        poll_timeout_seconds: 0,
        timeout_milliseconds: 500,
    })
    .unwrap()
}

fn api_path(method: &str) -> String {
    format!("/bot{}/{}", TOKEN, method)
}

fn sent_message() -> serde_json::Value {
    json!({
        "ok": true,
        "result": {
            "message_id": 10,
            "chat": {"id": 42, "type": "private"},
            "text": "hi"
        }
    })
}

#[tokio::test]
async fn markdown_messages_carry_the_parse_mode() {
    // arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("sendMessage")))
        .and(body_json(json!({"chat_id": 42, "text": "*hi*", "parse_mode": "Markdown"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(sent_message()))
        .expect(1)
        .mount(&server)
        .await;

    // act
    let outcome =
        DeliveryChannel::send_message(&client(&server), 42, "*hi*", RenderMode::Markdown).await;

    // assert
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn rejected_markdown_is_resent_as_plain_text() {
    // arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("sendMessage")))
        .and(body_json(json!({"chat_id": 42, "text": "*hi", "parse_mode": "Markdown"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: can't parse entities"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("sendMessage")))
        .and(body_json(json!({"chat_id": 42, "text": "*hi"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(sent_message()))
        .expect(1)
        .mount(&server)
        .await;

    // act
    let outcome =
        DeliveryChannel::send_message(&client(&server), 42, "*hi", RenderMode::Markdown).await;

    // assert
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn api_errors_carry_code_and_description() {
    // arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("sendMessage")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        })))
        .mount(&server)
        .await;

    // act
    let outcome = client(&server).send_message(42, "hi", None).await;

    // assert
    match outcome {
        Err(TelegramError::Api {
            code, description, ..
        }) => {
            assert_eq!(code, 403);
            assert!(description.contains("blocked"));
        }
        other => panic!("Expected an API error, got {:?}", other),
    }
}

#[tokio::test]
async fn a_competing_poller_is_reported_as_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("getUpdates")))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "ok": false,
            "error_code": 409,
            "description": "Conflict: terminated by other getUpdates request"
        })))
        .mount(&server)
        .await;

    let outcome = client(&server).get_updates(None).await;

    assert!(outcome.unwrap_err().is_conflict());
}

#[tokio::test]
async fn updates_are_requested_from_the_offset() {
    // arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("getUpdates")))
        .and(body_json(json!({"offset": 8, "timeout": 0, "allowed_updates": ["message"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [{
                "update_id": 8,
                "message": {
                    "message_id": 3,
                    "from": {"id": 42, "is_bot": false, "first_name": "Ada"},
                    "chat": {"id": 42, "type": "private"},
                    "text": "/help"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // act
    let updates = client(&server).get_updates(Some(8)).await.unwrap();

    // assert
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/help"));
}

#[tokio::test]
async fn a_non_json_answer_is_an_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let outcome = client(&server).get_me().await;

    assert!(matches!(
        outcome,
        Err(TelegramError::UnexpectedStatus(status)) if status.as_u16() == 502
    ));
}

#[tokio::test]
async fn transport_errors_do_not_leak_the_token() {
    // Nothing listens on this port.
    let client = TelegramClient::new(&TelegramSettings {
        base_url: "http://127.0.0.1:9".into(),
        bot_token: Secret::new(TOKEN.into()),
        poll_timeout_seconds: 0,
        timeout_milliseconds: 500,
    })
    .unwrap();

    let error = client.get_me().await.unwrap_err();

    assert!(!format!("{:?}", error).contains("test-token"));
}
