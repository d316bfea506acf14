use crate::advisory::{advice_message, Advisor};
use crate::delivery::{ChatId, DeliveryChannel, RenderMode};
use crate::domain::{SubscriberRecord, WeatherType};
use crate::weather::{unavailable_message, WeatherGateway};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// What started a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Test,
    OnDemand,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Test => "test",
            Trigger::OnDemand => "on-demand",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The weather went out. Carries the detached advisory task, if one was started.
    Delivered { advisory: Option<JoinHandle<()>> },
    /// The gateway failed and the subscriber got the apology instead.
    WeatherUnavailable,
    SendFailed,
    NoCity,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Fetch, render and send one weather message, then maybe advise.
///
/// Shared by scheduled ticks, test notifications and chat commands.
#[derive(Clone)]
pub struct Notifier {
    gateway: Arc<dyn WeatherGateway>,
    channel: Arc<dyn DeliveryChannel>,
    advisor: Advisor,
}

impl Notifier {
    pub fn new(
        gateway: Arc<dyn WeatherGateway>,
        channel: Arc<dyn DeliveryChannel>,
        advisor: Advisor,
    ) -> Self {
        Self {
            gateway,
            channel,
            advisor,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn WeatherGateway> {
        &self.gateway
    }

    pub fn channel(&self) -> &Arc<dyn DeliveryChannel> {
        &self.channel
    }

    /// Sends the subscriber's report to their private chat.
    pub async fn deliver(
        &self,
        subscriber: &SubscriberRecord,
        trigger: Trigger,
    ) -> DeliveryOutcome {
        self.deliver_to(subscriber.user_id, subscriber, trigger).await
    }

    /// Sends the subscriber's report to `chat_id`, which differs from the
    /// user id when the request came from a group.
    #[tracing::instrument(
        name = "Delivering weather",
        skip(self, subscriber, trigger),
        fields(user_id = %subscriber.user_id, trigger = %trigger)
    )]
    pub async fn deliver_to(
        &self,
        chat_id: ChatId,
        subscriber: &SubscriberRecord,
        trigger: Trigger,
    ) -> DeliveryOutcome {
        let city = match subscriber.city.as_deref() {
            Some(city) if !city.trim().is_empty() => city,
            _ => return DeliveryOutcome::NoCity,
        };
        self.send_weather(chat_id, city, subscriber.weather_type()).await
    }

    pub async fn send_weather(
        &self,
        chat_id: ChatId,
        city: &str,
        weather_type: WeatherType,
    ) -> DeliveryOutcome {
        if let Err(e) = self.channel.send_typing(chat_id).await {
            tracing::debug!(error.cause_chain = ?e, "Typing indicator failed");
        }

        let text = match self.gateway.fetch_rendered(city, weather_type).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Weather unavailable for {}", city);
                let apology = unavailable_message(city);
                if let Err(e) = self
                    .channel
                    .send_message(chat_id, &apology, RenderMode::Plain)
                    .await
                {
                    tracing::error!(error.cause_chain = ?e, "Failed to send the apology");
                    return DeliveryOutcome::SendFailed;
                }
                return DeliveryOutcome::WeatherUnavailable;
            }
        };

        if let Err(e) = self
            .channel
            .send_message(chat_id, &text, RenderMode::Markdown)
            .await
        {
            tracing::error!(error.cause_chain = ?e, "Failed to send the weather message");
            return DeliveryOutcome::SendFailed;
        }
        DeliveryOutcome::Delivered {
            advisory: self.spawn_advisory(chat_id, city),
        }
    }

    /// Follows a weather message with clothing advice, off the caller's path.
    /// Every failure in there is swallowed.
    pub fn spawn_advisory(&self, chat_id: ChatId, city: &str) -> Option<JoinHandle<()>> {
        if !self.advisor.is_configured() {
            return None;
        }
        let notifier = self.clone();
        let city = city.to_string();
        let span = tracing::info_span!("Sending clothing advice", %chat_id, %city);
        let task = async move {
            let snapshot = match notifier.gateway.fetch_structured(&city).await {
                Some(snapshot) => snapshot,
                None => return,
            };
            let advice = match notifier.advisor.generate(&snapshot).await {
                Some(advice) => advice,
                None => return,
            };
            if let Err(e) = notifier
                .channel
                .send_message(chat_id, &advice_message(&advice), RenderMode::Markdown)
                .await
            {
                tracing::warn!(error.cause_chain = ?e, "Failed to send the advice");
            }
        };
        Some(tokio::spawn(task.instrument(span)))
    }
}
