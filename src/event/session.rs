use std::time::Duration;

use super::{MAX_RECONNECT_ATTEMPTS, NORMAL_CLOSURE, RECONNECT_DELAY};

/// Connection state as shown to the user in the chat header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

/// What the connection driver must do after a lifecycle event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Schedule one reconnect attempt after the delay.
    Retry(Duration),
    /// The retry budget is exhausted; only a full remount recovers.
    GiveUp,
}

/// Reconnect policy as an explicit state machine, kept free of timers and
/// sockets so the retry bound is directly testable.
///
/// An abnormal closure (code != 1000) is retried after a fixed delay, at
/// most [`MAX_RECONNECT_ATTEMPTS`] times; a successful open resets the
/// budget. Normal closure never retries.
pub struct Session {
    state: State,
    attempts: u8,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            attempts: 0,
        }
    }

    /// Idempotent: a session that is already connecting or connected stays
    /// untouched.
    pub fn connect_requested(&mut self) -> bool {
        match self.state {
            State::Idle | State::Failed => {
                self.state = State::Connecting;
                self.attempts = 0;
                true
            }
            State::Connecting | State::Connected | State::Reconnecting => false,
        }
    }

    pub fn on_open(&mut self) {
        self.state = State::Connected;
        self.attempts = 0;
    }

    /// Socket closed with the given code (`None` for transport errors and
    /// streams that ended without a close frame).
    pub fn on_close(&mut self, code: Option<u16>) -> Effect {
        if code == Some(NORMAL_CLOSURE) {
            self.state = State::Idle;
            return Effect::None;
        }

        if self.attempts < MAX_RECONNECT_ATTEMPTS {
            self.attempts += 1;
            self.state = State::Reconnecting;
            Effect::Retry(RECONNECT_DELAY)
        } else {
            self.state = State::Failed;
            Effect::GiveUp
        }
    }

    /// Local teardown; cancels any pending retry.
    pub fn disconnected(&mut self) {
        self.state = State::Idle;
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn status(&self) -> Status {
        match self.state {
            State::Idle => Status::Disconnected,
            State::Connecting | State::Reconnecting => Status::Connecting,
            State::Connected => Status::Connected,
            State::Failed => Status::Error,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
