use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::message::model::Message;
use crate::{message, thread, user};

/// An inbound frame, discriminated by its `type` field.
///
/// Unknown discriminators are passed through as [`ServerEvent::Other`]
/// unexamined; frames that are not valid JSON are logged and dropped.
#[derive(Clone, Debug)]
pub enum ServerEvent {
    /// Handshake confirmation, payload kept verbatim.
    Connection(Value),
    Error { message: String },
    NewMessage { message: Message },
    MessageSent { message: Message },
    MessagesRead { message_ids: Vec<message::Id> },
    Typing { sender_id: user::Id, is_typing: bool },
    Other(Value),
}

#[derive(Deserialize)]
struct MessagePayload {
    message: Message,
}

#[derive(Deserialize)]
struct ReadPayload {
    message_ids: Vec<message::Id>,
}

#[derive(Deserialize)]
struct TypingPayload {
    sender_id: user::Id,
    #[serde(default)]
    is_typing: bool,
}

impl ServerEvent {
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("dropping frame that is not valid JSON: {e}");
                return None;
            }
        };

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned);
        match kind.as_deref() {
            Some("connection") => Some(Self::Connection(value)),
            Some("error") => {
                let message = value
                    .get("message")
                    .or_else(|| value.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown server error")
                    .to_owned();
                Some(Self::Error { message })
            }
            Some("new_message") => payload::<MessagePayload>(value)
                .map(|p| Self::NewMessage { message: p.message }),
            Some("message_sent") => payload::<MessagePayload>(value)
                .map(|p| Self::MessageSent { message: p.message }),
            Some("messages_read") => payload::<ReadPayload>(value).map(|p| Self::MessagesRead {
                message_ids: p.message_ids,
            }),
            Some("typing") => payload::<TypingPayload>(value).map(|p| Self::Typing {
                sender_id: p.sender_id,
                is_typing: p.is_typing,
            }),
            _ => Some(Self::Other(value)),
        }
    }
}

fn payload<T: DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value)
        .map_err(|e| warn!("dropping malformed frame payload: {e}"))
        .ok()
}

/// An outbound frame. A chat message carries no `type` field; its absence
/// is what the server reads as "send".
#[derive(Clone, Debug, PartialEq)]
pub enum ClientFrame {
    Send {
        thread_id: thread::Id,
        content: String,
    },
    Typing {
        receiver_id: user::Id,
        is_typing: bool,
    },
    Read {
        message_ids: Vec<i64>,
        sender_id: user::Id,
    },
}

impl ClientFrame {
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Send { thread_id, content } => json!({
                "thread_id": thread_id,
                "content": content,
            }),
            Self::Typing {
                receiver_id,
                is_typing,
            } => json!({
                "type": "typing",
                "receiver_id": receiver_id,
                "is_typing": is_typing,
            }),
            Self::Read {
                message_ids,
                sender_id,
            } => json!({
                "type": "read",
                "message_ids": message_ids,
                "sender_id": sender_id,
            }),
        }
    }

    pub fn to_text(&self) -> String {
        self.to_payload().to_string()
    }
}
