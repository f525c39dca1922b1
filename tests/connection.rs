use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use messenger_client::auth::CredentialProvider;
use messenger_client::event::model::{ClientFrame, ServerEvent};
use messenger_client::event::session::{Effect, Session, Status};
use messenger_client::event::url::socket_url;
use messenger_client::event::{Connection, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY};

#[test]
fn abnormal_closures_retry_exactly_five_times_then_stop() {
    let mut session = Session::new();
    session.connect_requested();
    session.on_open();

    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        assert_eq!(
            session.on_close(Some(1006)),
            Effect::Retry(Duration::from_millis(3000)),
            "attempt {attempt} should schedule a retry"
        );
        assert_eq!(session.attempts(), attempt);
        assert_eq!(session.status(), Status::Connecting);
    }

    assert_eq!(session.on_close(Some(1006)), Effect::GiveUp);
    assert_eq!(session.status(), Status::Error);
}

#[test]
fn retry_delay_is_fixed_not_exponential() {
    let mut session = Session::new();
    session.connect_requested();

    let first = session.on_close(None);
    let second = session.on_close(None);
    assert_eq!(first, Effect::Retry(RECONNECT_DELAY));
    assert_eq!(second, Effect::Retry(RECONNECT_DELAY));
}

#[test]
fn normal_closure_never_reconnects() {
    let mut session = Session::new();
    session.connect_requested();
    session.on_open();

    assert_eq!(session.on_close(Some(1000)), Effect::None);
    assert_eq!(session.status(), Status::Disconnected);
    assert_eq!(session.attempts(), 0);
}

#[test]
fn successful_open_resets_the_retry_budget() {
    let mut session = Session::new();
    session.connect_requested();

    for _ in 0..4 {
        session.on_close(Some(1006));
    }
    session.on_open();
    assert_eq!(session.attempts(), 0);

    for _ in 0..MAX_RECONNECT_ATTEMPTS {
        assert!(matches!(session.on_close(Some(1006)), Effect::Retry(_)));
    }
    assert_eq!(session.on_close(Some(1006)), Effect::GiveUp);
}

#[test]
fn connect_is_idempotent_while_active() {
    let mut session = Session::new();
    assert!(session.connect_requested());
    assert!(!session.connect_requested());

    session.on_open();
    assert!(!session.connect_requested());

    session.on_close(Some(1000));
    assert!(session.connect_requested());
}

#[test]
fn local_disconnect_cancels_a_pending_retry() {
    let mut session = Session::new();
    session.connect_requested();
    session.on_open();

    assert!(matches!(session.on_close(Some(1006)), Effect::Retry(_)));
    session.disconnected();
    assert_eq!(session.status(), Status::Disconnected);
    assert_eq!(session.attempts(), 0);
}

#[test]
fn socket_url_swaps_scheme_and_strips_api_suffix() {
    let base = Url::parse("https://example.com/api").unwrap();
    let url = socket_url(&base, Some("abc")).unwrap();
    assert_eq!(url.as_str(), "wss://example.com/ws/chat/?token=abc");
}

#[test]
fn socket_url_does_not_double_prefix_the_routing_namespace() {
    let base = Url::parse("https://example.com/ws").unwrap();
    let url = socket_url(&base, Some("abc")).unwrap();
    assert_eq!(url.as_str(), "wss://example.com/ws/chat/?token=abc");
}

#[test]
fn socket_url_without_token_has_no_query() {
    let base = Url::parse("http://localhost:8000/api").unwrap();
    let url = socket_url(&base, None).unwrap();
    assert_eq!(url.as_str(), "ws://localhost:8000/ws/chat/");
}

#[test]
fn socket_url_keeps_an_explicit_port() {
    let base = Url::parse("http://localhost:8000/api/").unwrap();
    let url = socket_url(&base, Some("t")).unwrap();
    assert_eq!(url.as_str(), "ws://localhost:8000/ws/chat/?token=t");
}

#[test]
fn send_frame_has_no_type_field() {
    let frame = ClientFrame::Send {
        thread_id: 7.into(),
        content: "hello".into(),
    };
    let payload = frame.to_payload();

    assert!(payload.get("type").is_none());
    assert_eq!(payload["thread_id"], 7);
    assert_eq!(payload["content"], "hello");
}

#[test]
fn typing_and_read_frames_carry_their_type() {
    let typing = ClientFrame::Typing {
        receiver_id: 3.into(),
        is_typing: true,
    }
    .to_payload();
    assert_eq!(typing["type"], "typing");
    assert_eq!(typing["receiver_id"], 3);
    assert_eq!(typing["is_typing"], true);

    let read = ClientFrame::Read {
        message_ids: vec![1, 2, 3],
        sender_id: 9.into(),
    }
    .to_payload();
    assert_eq!(read["type"], "read");
    assert_eq!(read["message_ids"], serde_json::json!([1, 2, 3]));
    assert_eq!(read["sender_id"], 9);
}

#[test]
fn invalid_json_frames_are_dropped() {
    assert!(ServerEvent::parse("not json at all {").is_none());
}

#[test]
fn unknown_discriminators_pass_through_unexamined() {
    let event = ServerEvent::parse(r#"{"type":"workout_assigned","plan_id":12}"#).unwrap();
    match event {
        ServerEvent::Other(value) => assert_eq!(value["plan_id"], 12),
        other => panic!("expected passthrough, got {other:?}"),
    }
}

#[test]
fn error_frames_are_routed_separately_from_messages() {
    let event = ServerEvent::parse(r#"{"type":"error","message":"User not found"}"#).unwrap();
    match event {
        ServerEvent::Error { message } => assert_eq!(message, "User not found"),
        other => panic!("expected error event, got {other:?}"),
    }
}

#[test]
fn new_message_frames_accept_string_ids() {
    let raw = r#"{
        "type": "new_message",
        "message": {
            "id": 41,
            "thread_id": "7",
            "sender": "12",
            "receiver": 34,
            "content": "see you at 6",
            "created_at": "2025-03-02T10:15:00Z"
        }
    }"#;

    let event = ServerEvent::parse(raw).unwrap();
    match event {
        ServerEvent::NewMessage { message } => {
            assert_eq!(message.thread_id, 7.into());
            assert_eq!(message.sender_id, 12.into());
            assert_eq!(message.receiver_id, 34.into());
            assert!(!message.is_read);
        }
        other => panic!("expected new_message, got {other:?}"),
    }
}

#[test]
fn malformed_known_payloads_are_dropped_not_forwarded() {
    assert!(ServerEvent::parse(r#"{"type":"new_message","message":{"id":1}}"#).is_none());
}

#[tokio::test]
async fn send_without_an_open_socket_returns_false() {
    let store: HashMap<String, String> = HashMap::new();
    let connection = Connection::connect(
        Url::parse("http://127.0.0.1:9/api").unwrap(),
        CredentialProvider::new(Arc::new(store)),
    );

    let delivered = connection
        .send(ClientFrame::Typing {
            receiver_id: 1.into(),
            is_typing: true,
        })
        .await;

    assert!(!delivered, "callers must not assume delivery");
    connection.disconnect().await;
}
