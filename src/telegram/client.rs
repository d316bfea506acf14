use crate::configuration::TelegramSettings;
use crate::delivery::{ChatId, DeliveryChannel, RenderMode};
use crate::errors::error_chain_fmt;
use crate::telegram::{ApiResponse, Message, Update, User};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub struct TelegramClient {
    http_client: Client,
    /// `{base_url}/bot{token}/`. Never logged.
    api_url: Url,
    poll_timeout: Duration,
}

#[derive(thiserror::Error)]
pub enum TelegramError {
    // Urls are stripped from these, they embed the bot token.
    #[error("Failed to reach the Bot API.")]
    Request(#[source] reqwest::Error),
    #[error("The Bot API answered with status {0} and no usable body.")]
    UnexpectedStatus(StatusCode),
    #[error("The Bot API rejected {method}: [{code}] {description}")]
    Api {
        method: &'static str,
        code: u16,
        description: String,
    },
    #[error("The Bot API answered {0} without a result.")]
    MissingResult(&'static str),
}

impl std::fmt::Debug for TelegramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::Request(e.without_url())
    }
}

impl TelegramError {
    /// Another process is long-polling with the same token.
    pub fn is_conflict(&self) -> bool {
        matches!(self, TelegramError::Api { code: 409, .. })
    }

    fn is_unparseable_markup(&self) -> bool {
        match self {
            TelegramError::Api {
                code: 400,
                description,
                ..
            } => description.contains("can't parse entities"),
            _ => false,
        }
    }
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Serialize)]
struct SendChatAction<'a> {
    chat_id: ChatId,
    action: &'a str,
}

#[derive(Serialize)]
struct DeleteWebhook {
    drop_pending_updates: bool,
}

#[derive(Serialize)]
struct NoParams {}

impl TelegramClient {
    pub fn new(settings: &TelegramSettings) -> Result<Self, anyhow::Error> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid Telegram base url {}", settings.base_url))?;
        let api_url = base_url
            .join(&format!("./bot{}/", settings.bot_token.expose_secret()))
            .context("The bot token cannot be part of a url")?;
        let http_client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build the Telegram HTTP client")?;
        Ok(Self {
            http_client,
            api_url,
            poll_timeout: settings.poll_timeout(),
        })
    }

    async fn call<P, R>(
        &self,
        method: &'static str,
        params: &P,
        timeout: Option<Duration>,
    ) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.api_url, method);
        let mut request = self.http_client.post(url).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        let envelope: ApiResponse<R> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) => return Err(TelegramError::UnexpectedStatus(status)),
        };
        if !envelope.ok {
            return Err(TelegramError::Api {
                method,
                code: envelope.error_code.unwrap_or_else(|| status.as_u16()),
                description: envelope.description.unwrap_or_default(),
            });
        }
        envelope.result.ok_or(TelegramError::MissingResult(method))
    }

    #[tracing::instrument(name = "Checking the bot identity", skip(self))]
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &NoParams {}, None).await
    }

    /// Long polling is refused while a webhook is registered.
    #[tracing::instrument(name = "Removing the webhook", skip(self))]
    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<bool, TelegramError> {
        let params = DeleteWebhook {
            drop_pending_updates,
        };
        self.call("deleteWebhook", &params, None).await
    }

    /// Long-polls for new messages. Blocks up to the configured poll timeout.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdates {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: &["message"],
        };
        // The HTTP timeout has to outlive the server-side wait.
        let timeout = self.poll_timeout + Duration::from_secs(10);
        self.call("getUpdates", &params, Some(timeout)).await
    }

    #[tracing::instrument(name = "Sending a Telegram message", skip(self, text))]
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<Message, TelegramError> {
        let params = SendMessage {
            chat_id,
            text,
            parse_mode,
        };
        self.call("sendMessage", &params, None).await
    }

    pub async fn send_chat_action(
        &self,
        chat_id: ChatId,
        action: &str,
    ) -> Result<bool, TelegramError> {
        self.call("sendChatAction", &SendChatAction { chat_id, action }, None).await
    }
}

#[async_trait]
impl DeliveryChannel for TelegramClient {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: RenderMode,
    ) -> Result<(), anyhow::Error> {
        let parse_mode = match mode {
            RenderMode::Plain => None,
            RenderMode::Markdown => Some("Markdown"),
        };
        match TelegramClient::send_message(self, chat_id, text, parse_mode).await {
            Ok(_) => Ok(()),
            Err(e) if parse_mode.is_some() && e.is_unparseable_markup() => {
                tracing::warn!(
                    error.cause_chain = ?e,
                    "Markdown rejected, resending as plain text"
                );
                TelegramClient::send_message(self, chat_id, text, None).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn send_typing(&self, chat_id: ChatId) -> Result<(), anyhow::Error> {
        self.send_chat_action(chat_id, "typing").await?;
        Ok(())
    }
}
