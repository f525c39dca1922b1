use std::time::{Duration, Instant};

use log::debug;

use crate::event::model::{ClientFrame, ServerEvent};
use crate::thread::api::{ThreadApi, DEFAULT_PAGE_SIZE};
use crate::thread::model::{Thread, ThreadPatch};
use crate::user;

use super::model::{describe_send_error, Message};

/// Idle window after the last keystroke before a `typing: false` goes out.
const TYPING_IDLE: Duration = Duration::from_millis(2000);

/// How long a transient send error stays on screen.
const ERROR_TTL: Duration = Duration::from_millis(5000);

/// One open conversation: history pagination, live merges, typing and
/// read-receipt traffic, and the draft being composed.
///
/// The controller is a plain state machine; its owner feeds it socket
/// events, clock ticks, and REST results, and forwards the frames it
/// returns over the shared connection.
pub struct Conversation {
    thread: Thread,
    me: user::Id,
    messages: Vec<Message>,
    has_more: bool,
    draft: String,
    sending: bool,
    peer_typing: bool,
    typing: TypingTracker,
    transient: Option<TransientError>,
    load_error: Option<String>,
    history_gen: u64,
    scroll_pending: bool,
}

impl Conversation {
    pub fn new(thread: Thread, me: user::Id) -> Self {
        Self {
            thread,
            me,
            messages: Vec::new(),
            has_more: false,
            draft: String::new(),
            sending: false,
            peer_typing: false,
            typing: TypingTracker::new(),
            transient: None,
            load_error: None,
            history_gen: 0,
            scroll_pending: false,
        }
    }

    fn counterpart_id(&self) -> user::Id {
        self.thread.counterpart(self.me).id
    }
}

// History pagination. Pages arrive newest-first and are reversed before
// use; `offset == 0` replaces the list, `offset > 0` prepends older
// messages to the front.
impl Conversation {
    /// Issue a generation token for a load about to start. A token that is
    /// no longer current when the response lands means the user has moved
    /// on; the stale page is discarded.
    pub fn begin_history_load(&mut self) -> u64 {
        self.history_gen += 1;
        self.history_gen
    }

    pub fn apply_history(&mut self, token: u64, mut page: Vec<Message>, offset: i64) -> bool {
        if token != self.history_gen {
            debug!("discarding stale history page for thread {}", self.thread.id);
            return false;
        }

        self.has_more = page.len() as i64 == DEFAULT_PAGE_SIZE;
        page.reverse();

        if offset == 0 {
            self.messages = page;
        } else {
            page.append(&mut self.messages);
            self.messages = page;
        }

        self.load_error = None;
        true
    }

    pub async fn load_history(&mut self, api: &ThreadApi, offset: i64) -> bool {
        let token = self.begin_history_load();

        match api.messages(self.thread.id, DEFAULT_PAGE_SIZE, offset).await {
            Ok(page) => self.apply_history(token, page.data, offset),
            Err(e) => {
                if offset == 0 {
                    self.messages = Vec::new();
                }
                self.load_error = Some(e.user_message());
                false
            }
        }
    }
}

// Live event merges. The returned patch, if any, is pushed up to the
// thread list so its summary stays current without a refetch.
impl Conversation {
    pub fn apply(&mut self, event: &ServerEvent, now: Instant) -> Option<ThreadPatch> {
        match event {
            ServerEvent::NewMessage { message } if message.thread_id == self.thread.id => {
                if !self.contains(message) {
                    self.messages.push(message.clone());
                    self.scroll_pending = true;
                }
                Some(ThreadPatch::from_message(message))
            }
            ServerEvent::MessageSent { message } if message.thread_id == self.thread.id => {
                match self.messages.iter().position(|m| m.id == message.id) {
                    Some(index) => self.messages[index] = message.clone(),
                    None => {
                        self.messages.push(message.clone());
                        self.scroll_pending = true;
                    }
                }
                Some(ThreadPatch::from_message(message))
            }
            ServerEvent::MessagesRead { message_ids } => {
                for message in &mut self.messages {
                    if message_ids.contains(&message.id) {
                        message.is_read = true;
                    }
                }
                None
            }
            ServerEvent::Typing {
                sender_id,
                is_typing,
            } if *sender_id == self.counterpart_id() => {
                self.peer_typing = *is_typing;
                None
            }
            ServerEvent::Error { message } => {
                self.transient = Some(TransientError {
                    message: describe_send_error(message).to_owned(),
                    expires_at: now + ERROR_TTL,
                });
                None
            }
            _ => None,
        }
    }

    fn contains(&self, message: &Message) -> bool {
        self.messages.iter().any(|m| m.id == message.id)
    }
}

// Composing and sending.
impl Conversation {
    /// Record the draft text. Emits at most one typing frame: `true` on
    /// the first keystroke of a burst, `false` when the input empties.
    /// Every keystroke restarts the idle window (debounce, not throttle).
    pub fn set_draft(&mut self, text: &str, now: Instant) -> Option<ClientFrame> {
        self.draft = text.to_owned();
        self.typing
            .on_input(!self.draft.is_empty(), now)
            .map(|is_typing| ClientFrame::Typing {
                receiver_id: self.counterpart_id(),
                is_typing,
            })
    }

    /// Advance the clock: fires the typing idle deadline and expires a
    /// stale transient error.
    pub fn tick(&mut self, now: Instant) -> Option<ClientFrame> {
        if let Some(transient) = &self.transient {
            if now >= transient.expires_at {
                self.transient = None;
            }
        }

        self.typing.on_tick(now).map(|is_typing| ClientFrame::Typing {
            receiver_id: self.counterpart_id(),
            is_typing,
        })
    }

    /// Take the frames for a send: refuses an empty draft and refuses to
    /// overlap an in-flight send. The draft clears immediately; no local
    /// message is inserted — the message shows up when the server echoes
    /// it back.
    pub fn submit(&mut self, now: Instant) -> Vec<ClientFrame> {
        let content = self.draft.trim().to_owned();
        if content.is_empty() || self.sending {
            return Vec::new();
        }

        self.sending = true;
        self.draft.clear();

        let mut frames = Vec::with_capacity(2);
        if let Some(is_typing) = self.typing.on_input(false, now) {
            frames.push(ClientFrame::Typing {
                receiver_id: self.counterpart_id(),
                is_typing,
            });
        }
        frames.push(ClientFrame::Send {
            thread_id: self.thread.id,
            content,
        });
        frames
    }

    /// Report the socket's verdict for the frame returned by
    /// [`Conversation::submit`]. A failed write surfaces a transient error;
    /// the draft stays cleared either way.
    pub fn send_finished(&mut self, delivered: bool, now: Instant) {
        self.sending = false;
        if !delivered {
            self.transient = Some(TransientError {
                message: "Your message was not sent. Please try again.".to_owned(),
                expires_at: now + ERROR_TTL,
            });
        }
    }

    /// Batch every unread inbound message with an integer id into one
    /// `read` frame and mark them read locally. The local flip is what
    /// keeps the next pass from emitting a second frame.
    pub fn pending_read_receipts(&mut self) -> Option<ClientFrame> {
        let message_ids: Vec<i64> = self
            .messages
            .iter()
            .filter(|m| m.addressed_to(self.me) && !m.is_read)
            .filter_map(|m| m.id.as_int())
            .collect();

        if message_ids.is_empty() {
            return None;
        }

        for message in &mut self.messages {
            if message.addressed_to(self.me)
                && !message.is_read
                && message.id.as_int().is_some()
            {
                message.is_read = true;
            }
        }

        Some(ClientFrame::Read {
            message_ids,
            sender_id: self.counterpart_id(),
        })
    }
}

impl Conversation {
    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn sending(&self) -> bool {
        self.sending
    }

    pub fn peer_typing(&self) -> bool {
        self.peer_typing
    }

    pub fn transient_error(&self) -> Option<&str> {
        self.transient.as_ref().map(|t| t.message.as_str())
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn dismiss_load_error(&mut self) {
        self.load_error = None;
    }

    /// Consume the auto-scroll flag set by an appended message.
    pub fn take_scroll(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }
}

struct TransientError {
    message: String,
    expires_at: Instant,
}

/// Local typing broadcast state: `true` once per burst of keystrokes,
/// `false` on emptiness or after the idle window runs out.
struct TypingTracker {
    active: bool,
    deadline: Option<Instant>,
}

impl TypingTracker {
    fn new() -> Self {
        Self {
            active: false,
            deadline: None,
        }
    }

    fn on_input(&mut self, non_empty: bool, now: Instant) -> Option<bool> {
        if non_empty {
            let was_active = self.active;
            self.active = true;
            self.deadline = Some(now + TYPING_IDLE);
            (!was_active).then_some(true)
        } else if self.active {
            self.active = false;
            self.deadline = None;
            Some(false)
        } else {
            None
        }
    }

    fn on_tick(&mut self, now: Instant) -> Option<bool> {
        match self.deadline {
            Some(deadline) if self.active && now >= deadline => {
                self.active = false;
                self.deadline = None;
                Some(false)
            }
            _ => None,
        }
    }
}
