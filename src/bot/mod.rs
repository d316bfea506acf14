//! The interactive chat surface: commands, per-chat sessions and long polling.
mod commands;
mod handler;
pub mod messages;
mod poller;
mod session;

pub use commands::Command;
pub use handler::BotHandler;
pub use poller::UpdatePoller;
pub use session::{SessionEvent, SessionState, SessionStore};
