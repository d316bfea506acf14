use crate::delivery::ChatId;
use std::collections::HashMap;
use std::sync::Mutex;

/// What a chat's next plain-text message means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingCity,
    AwaitingMorningTime,
    AwaitingEveningTime,
    AwaitingForecastCity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Any command arrived. Runs before the command itself.
    Command,
    /// The bot asked for input.
    Prompted(SessionState),
    InputAccepted,
    InputRejected,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

impl SessionState {
    pub fn on(self, event: SessionEvent) -> SessionState {
        match event {
            SessionEvent::Command | SessionEvent::InputAccepted => SessionState::Idle,
            SessionEvent::Prompted(next) => next,
            SessionEvent::InputRejected => self,
        }
    }
}

/// Per-chat session states. Idle chats are not stored.
#[derive(Default)]
pub struct SessionStore {
    states: Mutex<HashMap<ChatId, SessionState>>,
}

impl SessionStore {
    pub fn current(&self, chat_id: ChatId) -> SessionState {
        self.lock().get(&chat_id).copied().unwrap_or_default()
    }

    /// Applies `event` to the chat's state and returns the new state.
    pub fn apply(&self, chat_id: ChatId, event: SessionEvent) -> SessionState {
        let mut states = self.lock();
        let current = states.get(&chat_id).copied().unwrap_or_default();
        let next = current.on(event);
        if next == SessionState::Idle {
            states.remove(&chat_id);
        } else {
            states.insert(chat_id, next);
        }
        next
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ChatId, SessionState>> {
        // The map holds plain values, a panic elsewhere cannot leave it half-written.
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
