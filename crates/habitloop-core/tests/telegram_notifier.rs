//! Telegram notifier against a mocked Bot API.

use std::time::Duration;

use habitloop_core::{Notifier, NotifyError, TelegramNotifier};
use mockito::Matcher;
use serde_json::json;

const TOKEN: &str = "123456:test-token";

fn notifier(server: &mockito::Server) -> TelegramNotifier {
    TelegramNotifier::new(&server.url(), TOKEN, Duration::from_secs(5)).unwrap()
}

#[test]
fn send_posts_chat_id_and_text() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/bot123456:test-token/sendMessage")
        .match_body(Matcher::Json(json!({
            "chat_id": "42",
            "text": "Reminder!\nGood luck!",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true,"result":{"message_id":7}}"#)
        .create();

    notifier(&server).send("42", "Reminder!\nGood luck!").unwrap();
    mock.assert();
}

#[test]
fn ok_false_becomes_rejection_with_description() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/bot123456:test-token/sendMessage")
        .with_status(200)
        .with_body(r#"{"ok":false,"description":"Bad Request: chat not found"}"#)
        .create();

    match notifier(&server).send("42", "hi") {
        Err(NotifyError::Rejected(reason)) => assert_eq!(reason, "Bad Request: chat not found"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn http_error_carries_status_and_description() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/bot123456:test-token/sendMessage")
        .with_status(403)
        .with_body(r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#)
        .create();

    match notifier(&server).send("42", "hi") {
        Err(NotifyError::Http { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "Forbidden: bot was blocked by the user");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn non_json_error_body_is_kept() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/bot123456:test-token/sendMessage")
        .with_status(502)
        .with_body("Bad Gateway")
        .create();

    match notifier(&server).send("42", "hi") {
        Err(NotifyError::Http { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body, "Bad Gateway");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn unreachable_server_is_transport_error() {
    let n = TelegramNotifier::new("http://127.0.0.1:9", TOKEN, Duration::from_secs(2)).unwrap();
    assert!(matches!(n.send("42", "hi"), Err(NotifyError::Transport(_))));
}

#[test]
fn bot_username_reads_get_me() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/bot123456:test-token/getMe")
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{"id":1,"is_bot":true,"username":"habit_bot"}}"#)
        .create();

    assert_eq!(notifier(&server).bot_username().unwrap(), "habit_bot");
}
