use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::model::Message;
use crate::{message, user};

use super::Id;

/// Longest last-message preview kept on a thread summary.
pub const PREVIEW_LEN: usize = 100;

/// One coach/client conversation as served by the REST layer.
///
/// Participant display fields are denormalized by the server and never
/// derived locally. Summary fields (`last_message`, `unread_count`,
/// `updated_at`) are mutated in place as live events arrive.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Thread {
    pub id: Id,
    pub coach: user::Id,
    pub client: user::Id,
    pub coach_name: String,
    pub client_name: String,
    #[serde(default)]
    pub coach_photo: Option<String>,
    #[serde(default)]
    pub client_photo: Option<String>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Thread {
    /// List ordering key: `updated_at`, falling back to `created_at`.
    pub fn sort_key(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    /// The participant across the table from `me`, resolved by comparing
    /// normalized ids.
    pub fn counterpart(&self, me: user::Id) -> Counterpart<'_> {
        if self.coach == me {
            Counterpart {
                id: self.client,
                name: &self.client_name,
                photo: self.client_photo.as_deref(),
            }
        } else {
            Counterpart {
                id: self.coach,
                name: &self.coach_name,
                photo: self.coach_photo.as_deref(),
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Counterpart<'a> {
    pub id: user::Id,
    pub name: &'a str,
    pub photo: Option<&'a str>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LastMessage {
    pub id: message::Id,
    pub content: String,
    pub sender_id: user::Id,
    pub created_at: DateTime<Utc>,
}

impl LastMessage {
    pub fn preview(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            content: truncate_preview(&message.content),
            sender_id: message.sender_id,
            created_at: message.created_at,
        }
    }
}

fn truncate_preview(content: &str) -> String {
    content.chars().take(PREVIEW_LEN).collect()
}

/// Shallow patch the open conversation pushes up to the thread list so
/// summaries stay current without a refetch.
#[derive(Clone, Debug, Default)]
pub struct ThreadPatch {
    pub last_message: Option<LastMessage>,
    pub updated_at: Option<DateTime<Utc>>,
    pub unread_count: Option<u32>,
}

impl ThreadPatch {
    pub fn from_message(message: &Message) -> Self {
        Self {
            last_message: Some(LastMessage::preview(message)),
            updated_at: Some(message.created_at),
            unread_count: None,
        }
    }

    pub fn apply_to(&self, thread: &mut Thread) {
        if let Some(last_message) = &self.last_message {
            thread.last_message = Some(last_message.clone());
        }
        if let Some(updated_at) = self.updated_at {
            thread.updated_at = Some(updated_at);
        }
        if let Some(unread_count) = self.unread_count {
            thread.unread_count = unread_count;
        }
    }
}
