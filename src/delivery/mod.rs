use async_trait::async_trait;

/// Telegram chat identifier. Private chats share the user's id.
pub type ChatId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Plain,
    Markdown,
}

/// Outbound messaging to a subscriber's chat.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: RenderMode,
    ) -> Result<(), anyhow::Error>;

    /// Shows the "typing" indicator.
    async fn send_typing(&self, chat_id: ChatId) -> Result<(), anyhow::Error>;
}
