use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{thread, user};

use super::Id;

/// A single chat entry. The backend names sender/receiver inconsistently
/// across endpoints, so both variants are accepted on ingestion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: Id,
    pub thread_id: thread::Id,
    #[serde(alias = "sender")]
    pub sender_id: user::Id,
    #[serde(alias = "receiver")]
    pub receiver_id: user::Id,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

impl Message {
    pub fn addressed_to(&self, me: user::Id) -> bool {
        self.receiver_id == me
    }
}

/// Map a server error text to one of the canned messages shown inline in
/// the conversation view.
pub fn describe_send_error(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();

    if lower.contains("not assigned") {
        "You can only message clients assigned to you."
    } else if lower.contains("receiver") && (lower.contains("required") || lower.contains("missing"))
    {
        "Unable to send: no recipient for this conversation."
    } else if lower.contains("empty") {
        "Messages cannot be empty."
    } else if lower.contains("not found") {
        "The recipient could not be found."
    } else {
        "Something went wrong while sending your message."
    }
}
