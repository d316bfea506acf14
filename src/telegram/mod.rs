//! A small Bot API client: long polling in, messages out.
mod client;
mod types;

pub use client::{TelegramClient, TelegramError};
pub use types::{ApiResponse, Chat, Message, Update, User};
