use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use serde_json::json;

use messenger_client::event::model::{ClientFrame, ServerEvent};
use messenger_client::message::model::Message;
use messenger_client::message::Conversation;
use messenger_client::thread::model::Thread;

const ME: i64 = 10;
const CLIENT: i64 = 20;

fn thread() -> Thread {
    Thread {
        id: 1.into(),
        coach: ME.into(),
        client: CLIENT.into(),
        coach_name: "Sam".into(),
        client_name: "Riley".into(),
        coach_photo: None,
        client_photo: None,
        last_message: None,
        unread_count: 0,
        created_at: Some(Utc.timestamp_opt(1_900_000_000, 0).unwrap()),
        updated_at: None,
    }
}

fn message(id: i64, sender: i64, receiver: i64, content: &str) -> Message {
    Message {
        id: id.into(),
        thread_id: 1.into(),
        sender_id: sender.into(),
        receiver_id: receiver.into(),
        content: content.into(),
        created_at: Utc.timestamp_opt(1_900_000_000 + id, 0).unwrap(),
        is_read: false,
    }
}

fn conversation() -> Conversation {
    Conversation::new(thread(), ME.into())
}

fn now() -> Instant {
    Instant::now()
}

#[test]
fn replayed_events_never_duplicate_a_message() {
    let mut conv = conversation();
    let msg = message(1, CLIENT, ME, "hello");

    let events = [
        ServerEvent::NewMessage {
            message: msg.clone(),
        },
        ServerEvent::MessageSent {
            message: msg.clone(),
        },
        ServerEvent::NewMessage { message: msg },
    ];
    for event in &events {
        conv.apply(event, now());
    }

    assert_eq!(conv.messages().len(), 1);
}

#[test]
fn echo_replaces_the_matching_message_in_place() {
    let mut conv = conversation();
    conv.apply(
        &ServerEvent::NewMessage {
            message: message(1, ME, CLIENT, "draft body"),
        },
        now(),
    );

    let mut finalized = message(1, ME, CLIENT, "final body");
    finalized.is_read = true;
    conv.apply(
        &ServerEvent::MessageSent { message: finalized },
        now(),
    );

    assert_eq!(conv.messages().len(), 1);
    assert_eq!(conv.messages()[0].content, "final body");
    assert!(conv.messages()[0].is_read);
}

#[test]
fn events_for_other_threads_are_ignored() {
    let mut conv = conversation();
    let mut foreign = message(1, CLIENT, ME, "elsewhere");
    foreign.thread_id = 2.into();

    let patch = conv.apply(&ServerEvent::NewMessage { message: foreign }, now());

    assert!(patch.is_none());
    assert!(conv.messages().is_empty());
}

#[test]
fn inbound_message_produces_a_summary_patch_and_scroll() {
    let mut conv = conversation();

    let patch = conv
        .apply(
            &ServerEvent::NewMessage {
                message: message(1, CLIENT, ME, "hi"),
            },
            now(),
        )
        .expect("a patch for the thread list");

    assert_eq!(patch.last_message.unwrap().content, "hi");
    assert!(conv.take_scroll());
    assert!(!conv.take_scroll(), "scroll flag is consumed");
}

#[test]
fn history_pages_are_reversed_and_prepended() {
    let mut conv = conversation();

    // First page: newest-first from the server.
    let token = conv.begin_history_load();
    conv.apply_history(token, vec![message(5, CLIENT, ME, "e"), message(4, ME, CLIENT, "d")], 0);
    let order: Vec<String> = conv.messages().iter().map(|m| m.content.clone()).collect();
    assert_eq!(order, vec!["d", "e"]);

    // Older page prepends.
    let token = conv.begin_history_load();
    conv.apply_history(token, vec![message(3, CLIENT, ME, "c"), message(2, ME, CLIENT, "b")], 2);
    let order: Vec<String> = conv.messages().iter().map(|m| m.content.clone()).collect();
    assert_eq!(order, vec!["b", "c", "d", "e"]);
}

#[test]
fn has_more_requires_a_full_page() {
    let mut conv = conversation();

    let token = conv.begin_history_load();
    let full: Vec<Message> = (1..=50).map(|id| message(id, CLIENT, ME, "m")).collect();
    conv.apply_history(token, full, 0);
    assert!(conv.has_more());

    let token = conv.begin_history_load();
    conv.apply_history(token, vec![message(51, CLIENT, ME, "last")], 0);
    assert!(!conv.has_more());
}

#[test]
fn stale_history_responses_are_discarded() {
    let mut conv = conversation();

    let stale = conv.begin_history_load();
    let fresh = conv.begin_history_load();

    conv.apply_history(fresh, vec![message(2, CLIENT, ME, "fresh")], 0);
    let applied = conv.apply_history(stale, vec![message(1, CLIENT, ME, "stale")], 0);

    assert!(!applied);
    assert_eq!(conv.messages().len(), 1);
    assert_eq!(conv.messages()[0].content, "fresh");
}

#[test]
fn read_receipts_batch_once_and_do_not_loop() {
    let mut conv = conversation();
    for id in 1..=3 {
        conv.apply(
            &ServerEvent::NewMessage {
                message: message(id, CLIENT, ME, "unread"),
            },
            now(),
        );
    }

    let frame = conv.pending_read_receipts().expect("one read frame");
    match frame {
        ClientFrame::Read {
            message_ids,
            sender_id,
        } => {
            assert_eq!(message_ids, vec![1, 2, 3]);
            assert_eq!(sender_id, CLIENT.into());
        }
        other => panic!("expected read frame, got {other:?}"),
    }

    assert!(conv.messages().iter().all(|m| m.is_read));
    assert!(conv.pending_read_receipts().is_none(), "second pass is quiet");
}

#[test]
fn non_integer_ids_never_enter_a_read_batch() {
    let mut conv = conversation();
    conv.apply(
        &ServerEvent::NewMessage {
            message: message(1, CLIENT, ME, "normal"),
        },
        now(),
    );

    let mut odd = message(2, CLIENT, ME, "odd id");
    odd.id = messenger_client::message::Id::Other(json!("tmp-abc"));
    conv.apply(&ServerEvent::NewMessage { message: odd }, now());

    match conv.pending_read_receipts().expect("read frame") {
        ClientFrame::Read { message_ids, .. } => assert_eq!(message_ids, vec![1]),
        other => panic!("expected read frame, got {other:?}"),
    }
}

#[test]
fn own_unread_messages_are_not_receipted() {
    let mut conv = conversation();
    conv.apply(
        &ServerEvent::NewMessage {
            message: message(1, ME, CLIENT, "mine"),
        },
        now(),
    );

    assert!(conv.pending_read_receipts().is_none());
}

#[test]
fn messages_read_flips_local_flags() {
    let mut conv = conversation();
    conv.apply(
        &ServerEvent::NewMessage {
            message: message(1, ME, CLIENT, "sent"),
        },
        now(),
    );

    conv.apply(
        &ServerEvent::MessagesRead {
            message_ids: vec![1.into()],
        },
        now(),
    );

    assert!(conv.messages()[0].is_read);
}

#[test]
fn typing_from_the_counterpart_toggles_the_flag() {
    let mut conv = conversation();

    conv.apply(
        &ServerEvent::Typing {
            sender_id: CLIENT.into(),
            is_typing: true,
        },
        now(),
    );
    assert!(conv.peer_typing());

    // A stranger's typing signal is not ours to show.
    conv.apply(
        &ServerEvent::Typing {
            sender_id: 999.into(),
            is_typing: false,
        },
        now(),
    );
    assert!(conv.peer_typing());

    conv.apply(
        &ServerEvent::Typing {
            sender_id: CLIENT.into(),
            is_typing: false,
        },
        now(),
    );
    assert!(!conv.peer_typing());
}

#[test]
fn typing_broadcast_debounces_on_a_two_second_window() {
    let mut conv = conversation();
    let start = now();

    // First keystroke signals once.
    assert_eq!(
        conv.set_draft("h", start),
        Some(ClientFrame::Typing {
            receiver_id: CLIENT.into(),
            is_typing: true,
        })
    );
    // Further keystrokes restart the window silently.
    assert_eq!(conv.set_draft("he", start + Duration::from_millis(1500)), None);
    assert_eq!(conv.tick(start + Duration::from_millis(3000)), None);

    // 2s after the last keystroke the idle signal fires.
    assert_eq!(
        conv.tick(start + Duration::from_millis(3500)),
        Some(ClientFrame::Typing {
            receiver_id: CLIENT.into(),
            is_typing: false,
        })
    );
    assert_eq!(conv.tick(start + Duration::from_millis(6000)), None);
}

#[test]
fn emptying_the_input_signals_typing_stopped() {
    let mut conv = conversation();
    let start = now();

    conv.set_draft("hello", start);
    assert_eq!(
        conv.set_draft("", start + Duration::from_millis(100)),
        Some(ClientFrame::Typing {
            receiver_id: CLIENT.into(),
            is_typing: false,
        })
    );
}

#[test]
fn submit_trims_refuses_empty_and_clears_the_draft() {
    let mut conv = conversation();
    let start = now();

    assert!(conv.submit(start).is_empty());

    conv.set_draft("   ", start);
    assert!(conv.submit(start).is_empty());

    conv.set_draft("  see you at 6  ", start);
    let frames = conv.submit(start);
    assert_eq!(
        frames.last(),
        Some(&ClientFrame::Send {
            thread_id: 1.into(),
            content: "see you at 6".into(),
        })
    );
    // Typing stops as part of the send.
    assert_eq!(
        frames.first(),
        Some(&ClientFrame::Typing {
            receiver_id: CLIENT.into(),
            is_typing: false,
        })
    );
    assert_eq!(conv.draft(), "");
}

#[test]
fn a_second_submit_while_in_flight_is_refused() {
    let mut conv = conversation();
    let start = now();

    conv.set_draft("first", start);
    assert!(!conv.submit(start).is_empty());

    conv.set_draft("second", start);
    assert!(conv.submit(start).is_empty(), "send already in flight");

    conv.send_finished(true, start);
    assert!(!conv.submit(start).is_empty());
}

#[test]
fn no_message_is_inserted_until_the_server_echo() {
    let mut conv = conversation();
    let start = now();

    conv.set_draft("on my way", start);
    conv.submit(start);
    assert!(conv.messages().is_empty());

    conv.apply(
        &ServerEvent::MessageSent {
            message: message(1, ME, CLIENT, "on my way"),
        },
        start,
    );
    assert_eq!(conv.messages().len(), 1);
}

#[test]
fn failed_sends_surface_a_transient_error_that_expires() {
    let mut conv = conversation();
    let start = now();

    conv.set_draft("hello", start);
    conv.submit(start);
    conv.send_finished(false, start);

    assert!(conv.transient_error().is_some());
    assert_eq!(conv.draft(), "", "input stays cleared, the user retypes");

    conv.tick(start + Duration::from_millis(4999));
    assert!(conv.transient_error().is_some());

    conv.tick(start + Duration::from_millis(5000));
    assert!(conv.transient_error().is_none());
}

#[test]
fn server_error_frames_translate_to_canned_messages() {
    let mut conv = conversation();

    conv.apply(
        &ServerEvent::Error {
            message: "client is not assigned to this coach".into(),
        },
        now(),
    );

    assert_eq!(
        conv.transient_error(),
        Some("You can only message clients assigned to you.")
    );
}
