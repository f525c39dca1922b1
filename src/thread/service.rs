use log::debug;

use crate::event::model::ServerEvent;
use crate::message::model::Message;
use crate::user;

use super::api::ThreadApi;
use super::model::{LastMessage, Thread, ThreadPatch};
use super::Id;

/// The signed-in user's thread list, reconciled from three independent
/// pressures: the initial REST load, live socket events, and local user
/// actions (selection, optimistic read-reset).
///
/// Ordering is fixed at load time (`updated_at` descending, falling back
/// to `created_at`); later events touch fields in place without
/// reordering. Threads are born via REST only — a live event for an
/// unknown thread id is dropped, never synthesized into a list entry.
pub struct Inbox {
    me: user::Id,
    threads: Vec<Thread>,
    selected: Option<Id>,
    loaded_for: Option<user::Id>,
    load_error: Option<String>,
}

impl Inbox {
    pub fn new(me: user::Id) -> Self {
        Self {
            me,
            threads: Vec::new(),
            selected: None,
            loaded_for: None,
            load_error: None,
        }
    }
}

impl Inbox {
    /// Load the list once per identity. Subsequent calls are no-ops until
    /// [`Inbox::reload`] clears the gate, which keeps the load imperative
    /// instead of re-triggered by every state change.
    pub async fn ensure_loaded(&mut self, api: &ThreadApi) {
        if self.loaded_for == Some(self.me) {
            return;
        }

        match api.list().await {
            Ok(mut threads) => {
                threads.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
                self.threads = threads;
                self.load_error = None;
            }
            Err(e) => {
                self.threads = Vec::new();
                self.load_error = Some(e.user_message());
            }
        }
        self.loaded_for = Some(self.me);
    }

    /// Explicit user-triggered retry; nothing in this crate reloads
    /// automatically.
    pub async fn reload(&mut self, api: &ThreadApi) {
        self.loaded_for = None;
        self.ensure_loaded(api).await;
    }

    pub fn apply(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::NewMessage { message } => self.on_new_message(message),
            ServerEvent::MessageSent { message } => self.on_message_sent(message),
            ServerEvent::MessagesRead { message_ids } => {
                // Per-thread counts are not corrected here; they come back
                // accurate on the next full reload.
                debug!("{} messages acknowledged as read", message_ids.len());
            }
            _ => {}
        }
    }

    /// Select a thread and optimistically zero its unread count, without
    /// waiting for the server to confirm.
    pub fn select(&mut self, id: Id) {
        self.selected = Some(id);
        if let Some(thread) = self.thread_mut(id) {
            thread.unread_count = 0;
        }
    }

    /// Shallow merge pushed up by the open conversation.
    pub fn patch_thread(&mut self, id: Id, patch: &ThreadPatch) {
        if let Some(thread) = self.thread_mut(id) {
            patch.apply_to(thread);
        }
    }
}

impl Inbox {
    fn on_new_message(&mut self, message: &Message) {
        let me = self.me;
        let selected = self.selected;

        let Some(thread) = self.thread_mut(message.thread_id) else {
            debug!(
                "dropping new_message for unknown thread {}",
                message.thread_id
            );
            return;
        };

        thread.last_message = Some(LastMessage::preview(message));
        thread.updated_at = Some(message.created_at);

        if message.receiver_id == me && selected != Some(thread.id) {
            thread.unread_count += 1;
        }
    }

    fn on_message_sent(&mut self, message: &Message) {
        if let Some(thread) = self.thread_mut(message.thread_id) {
            thread.last_message = Some(LastMessage::preview(message));
            thread.updated_at = Some(message.created_at);
        }
    }

    fn thread_mut(&mut self, id: Id) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == id)
    }
}

impl Inbox {
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn selected(&self) -> Option<Id> {
        self.selected
    }

    pub fn selected_thread(&self) -> Option<&Thread> {
        self.selected
            .and_then(|id| self.threads.iter().find(|t| t.id == id))
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.load_error = None;
    }

    /// Test/bootstrap seam: adopt an already-fetched list.
    pub fn replace(&mut self, mut threads: Vec<Thread>) {
        threads.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        self.threads = threads;
        self.loaded_for = Some(self.me);
        self.load_error = None;
    }
}
