use crate::bot::BotHandler;
use crate::telegram::TelegramClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Long-polls `getUpdates` and hands each message to the [`BotHandler`].
pub struct UpdatePoller {
    client: Arc<TelegramClient>,
    handler: Arc<BotHandler>,
    startup_delay: Duration,
}

impl UpdatePoller {
    pub fn new(
        client: Arc<TelegramClient>,
        handler: Arc<BotHandler>,
        startup_delay: Duration,
    ) -> Self {
        Self {
            client,
            handler,
            startup_delay,
        }
    }

    /// Polls until `shutdown` changes or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        // Gives a previous deployment time to stop polling with the same token.
        if !self.startup_delay.is_zero() {
            tracing::info!(delay = ?self.startup_delay, "Waiting before polling for updates");
            tokio::select! {
                _ = tokio::time::sleep(self.startup_delay) => {}
                _ = shutdown.changed() => return,
            }
        }

        match self.client.get_me().await {
            Ok(me) => tracing::info!(username = ?me.username, "Connected to the Bot API"),
            Err(e) => tracing::warn!(
                error.cause_chain = ?e,
                "Bot identity check failed, polling anyway"
            ),
        }
        if let Err(e) = self.client.delete_webhook(false).await {
            tracing::warn!(error.cause_chain = ?e, "Failed to remove the webhook");
        }

        let mut offset = None;
        let mut backoff = INITIAL_BACKOFF;
        loop {
            let result = tokio::select! {
                result = self.client.get_updates(offset) => result,
                _ = shutdown.changed() => break,
            };
            match result {
                Ok(updates) => {
                    backoff = INITIAL_BACKOFF;
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        if let Some(message) = update.message {
                            let handler = Arc::clone(&self.handler);
                            tokio::spawn(async move { handler.handle_message(&message).await });
                        }
                    }
                }
                Err(e) => {
                    if e.is_conflict() {
                        tracing::error!(
                            error.cause_chain = ?e,
                            "Another instance is polling with this bot token"
                        );
                    } else {
                        tracing::warn!(error.cause_chain = ?e, "Polling for updates failed");
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = shutdown.changed() => break,
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
        tracing::info!("Update poller stopped");
    }
}
