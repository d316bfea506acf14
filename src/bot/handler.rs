use crate::bot::messages;
use crate::bot::{Command, SessionEvent, SessionState, SessionStore};
use crate::delivery::{ChatId, RenderMode};
use crate::domain::{
    City, NotificationTime, PreferenceUpdate, SubscriberProfile, SubscriberRecord, UserId,
    WeatherType,
};
use crate::registry::SubscriberRegistry;
use crate::scheduler::{NotificationScheduler, Notifier, Trigger};
use crate::telegram::Message;
use std::sync::Arc;
use uuid::Uuid;

/// Turns incoming chat messages into registry writes and weather deliveries.
pub struct BotHandler {
    registry: Arc<dyn SubscriberRegistry>,
    scheduler: Arc<NotificationScheduler>,
    sessions: SessionStore,
}

/// Who sent a message and where to answer.
struct Sender {
    chat_id: ChatId,
    profile: SubscriberProfile,
}

impl Sender {
    fn user_id(&self) -> UserId {
        self.profile.user_id
    }
}

impl BotHandler {
    pub fn new(
        registry: Arc<dyn SubscriberRegistry>,
        scheduler: Arc<NotificationScheduler>,
    ) -> Self {
        Self {
            registry,
            scheduler,
            sessions: SessionStore::default(),
        }
    }

    pub fn session(&self, chat_id: ChatId) -> SessionState {
        self.sessions.current(chat_id)
    }

    fn notifier(&self) -> &Notifier {
        self.scheduler.notifier()
    }

    #[tracing::instrument(
        name = "Handling a chat message",
        skip(self, message),
        fields(
            request_id = %Uuid::new_v4(),
            chat_id = %message.chat.id,
            message_id = %message.message_id
        )
    )]
    pub async fn handle_message(&self, message: &Message) {
        let text = match message.text.as_deref() {
            Some(text) => text,
            None => return,
        };
        let profile = match &message.from {
            Some(user) => SubscriberProfile {
                user_id: user.id,
                username: user.username.clone(),
                first_name: Some(user.first_name.clone()),
                last_name: user.last_name.clone(),
            },
            None => SubscriberProfile {
                user_id: message.chat.id,
                username: None,
                first_name: None,
                last_name: None,
            },
        };
        let sender = Sender {
            chat_id: message.chat.id,
            profile,
        };

        match Command::parse(text) {
            Some(command) => {
                self.sessions.apply(sender.chat_id, SessionEvent::Command);
                self.run_command(&sender, command).await
            }
            None => self.handle_text(&sender, text.trim()).await,
        }
    }

    async fn run_command(&self, sender: &Sender, command: Command) {
        tracing::info!(command = ?command, "Running command");
        match command {
            Command::Start => {
                let has_city = self
                    .registry
                    .get_subscriber(sender.user_id())
                    .await
                    .map_or(false, |record| record.city.is_some());
                self.reply(sender, &messages::welcome(has_city)).await
            }
            Command::Help => self.reply(sender, messages::HELP).await,
            Command::Weather(Some(city)) => self.lookup(sender, &city, WeatherType::Brief).await,
            Command::Weather(None) => self.reply(sender, messages::WEATHER_USAGE).await,
            Command::Forecast(Some(city)) => {
                self.lookup(sender, &city, WeatherType::Detailed).await
            }
            Command::Forecast(None) => {
                self.prompt(sender, SessionState::AwaitingForecastCity, messages::ASK_FORECAST_CITY)
                    .await
            }
            Command::Subscribe => self.subscribe(sender).await,
            Command::Unsubscribe => {
                if self.registry.deactivate(sender.user_id()).await {
                    self.reply(sender, messages::UNSUBSCRIBED).await
                } else {
                    self.reply(sender, messages::OPERATION_FAILED).await
                }
            }
            Command::Settings => match self.registry.get_subscriber(sender.user_id()).await {
                Some(record) => self.reply_markdown(sender, &messages::settings(&record)).await,
                None => self.reply(sender, messages::NOT_SUBSCRIBED).await,
            },
            Command::MyWeather => match self.subscriber_with_city(sender).await {
                Some(record) => {
                    self.notifier()
                        .deliver_to(sender.chat_id, &record, Trigger::OnDemand)
                        .await;
                }
                None => self.reply(sender, messages::NO_CITY).await,
            },
            Command::SetCity(Some(city)) => self.set_city(sender, &city).await,
            Command::SetCity(None) => {
                self.prompt(sender, SessionState::AwaitingCity, messages::ASK_CITY).await
            }
            Command::SetMorning(Some(time)) => self.set_morning(sender, &time).await,
            Command::SetMorning(None) => {
                self.prompt(sender, SessionState::AwaitingMorningTime, messages::ASK_MORNING_TIME)
                    .await
            }
            Command::SetEvening(Some(time)) => self.set_evening(sender, &time).await,
            Command::SetEvening(None) => {
                self.prompt(sender, SessionState::AwaitingEveningTime, messages::ASK_EVENING_TIME)
                    .await
            }
            Command::SetType(argument) => {
                match argument.as_deref().map(WeatherType::parse) {
                    Some(Ok(weather_type)) => {
                        self.save(sender, &PreferenceUpdate::weather_type(weather_type)).await
                    }
                    _ => self.reply(sender, messages::TYPE_USAGE).await,
                }
            }
            Command::ToggleMorning => self.toggle(sender, Slot::Morning).await,
            Command::ToggleEvening => self.toggle(sender, Slot::Evening).await,
            Command::TestNotification => self.test_notification(sender).await,
            Command::Cancel => self.reply(sender, messages::CANCELLED).await,
            Command::Unknown(_) => self.reply(sender, messages::UNKNOWN_COMMAND).await,
        }
    }

    async fn handle_text(&self, sender: &Sender, text: &str) {
        match self.sessions.current(sender.chat_id) {
            SessionState::Idle => match City::parse(text) {
                Ok(city) => {
                    self.notifier()
                        .send_weather(sender.chat_id, city.as_ref(), WeatherType::Brief)
                        .await;
                }
                Err(_) => self.reply(sender, messages::INVALID_CITY).await,
            },
            SessionState::AwaitingCity => {
                if City::parse(text).is_err() {
                    return self.reject(sender, messages::INVALID_CITY).await;
                }
                self.sessions.apply(sender.chat_id, SessionEvent::InputAccepted);
                self.set_city(sender, text).await
            }
            SessionState::AwaitingForecastCity => match City::parse(text) {
                Ok(city) => {
                    self.sessions.apply(sender.chat_id, SessionEvent::InputAccepted);
                    self.notifier()
                        .send_weather(sender.chat_id, city.as_ref(), WeatherType::Detailed)
                        .await;
                }
                Err(_) => self.reject(sender, messages::INVALID_CITY).await,
            },
            SessionState::AwaitingMorningTime => {
                if NotificationTime::parse(text).is_err() {
                    return self.reject(sender, messages::INVALID_TIME).await;
                }
                self.sessions.apply(sender.chat_id, SessionEvent::InputAccepted);
                self.set_morning(sender, text).await
            }
            SessionState::AwaitingEveningTime => {
                if NotificationTime::parse(text).is_err() {
                    return self.reject(sender, messages::INVALID_TIME).await;
                }
                self.sessions.apply(sender.chat_id, SessionEvent::InputAccepted);
                self.set_evening(sender, text).await
            }
        }
    }

    async fn lookup(&self, sender: &Sender, city: &str, weather_type: WeatherType) {
        match City::parse(city) {
            Ok(city) => {
                self.notifier()
                    .send_weather(sender.chat_id, city.as_ref(), weather_type)
                    .await;
            }
            Err(_) => self.reply(sender, messages::WEATHER_USAGE).await,
        }
    }

    async fn subscribe(&self, sender: &Sender) {
        if !self.registry.upsert_subscriber(&sender.profile).await {
            return self.reply(sender, messages::OPERATION_FAILED).await;
        }
        match self.registry.get_subscriber(sender.user_id()).await {
            Some(record) if record.city.is_some() => {
                self.reply_markdown(sender, &messages::settings(&record)).await
            }
            _ => {
                self.prompt(sender, SessionState::AwaitingCity, messages::ASK_CITY).await
            }
        }
    }

    async fn set_city(&self, sender: &Sender, city: &str) {
        match City::parse(city) {
            Ok(city) => self.save(sender, &PreferenceUpdate::city(city)).await,
            Err(_) => self.reply(sender, messages::INVALID_CITY).await,
        }
    }

    async fn set_morning(&self, sender: &Sender, time: &str) {
        match NotificationTime::parse(time) {
            Ok(time) => self.save(sender, &PreferenceUpdate::morning(time)).await,
            Err(_) => self.reply(sender, messages::INVALID_TIME).await,
        }
    }

    async fn set_evening(&self, sender: &Sender, time: &str) {
        match NotificationTime::parse(time) {
            Ok(time) => self.save(sender, &PreferenceUpdate::evening(time)).await,
            Err(_) => self.reply(sender, messages::INVALID_TIME).await,
        }
    }

    async fn toggle(&self, sender: &Sender, slot: Slot) {
        let record = match self.registry.get_subscriber(sender.user_id()).await {
            Some(record) => record,
            None => return self.reply(sender, messages::NOT_SUBSCRIBED).await,
        };
        let preferences = record.preferences.unwrap_or_default();
        let update = match slot {
            Slot::Morning => PreferenceUpdate {
                send_morning: Some(!preferences.send_morning),
                ..PreferenceUpdate::default()
            },
            Slot::Evening => PreferenceUpdate {
                send_evening: Some(!preferences.send_evening),
                ..PreferenceUpdate::default()
            },
        };
        self.save(sender, &update).await
    }

    async fn test_notification(&self, sender: &Sender) {
        if self.subscriber_with_city(sender).await.is_none() {
            return self.reply(sender, messages::NO_CITY).await;
        }
        self.reply(sender, messages::SENDING_TEST).await;
        match self.scheduler.send_test_notification(sender.user_id()).await {
            Ok(outcome) => {
                tracing::info!(delivered = outcome.is_delivered(), "Test notification sent")
            }
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Test notification skipped");
                self.reply(sender, messages::NO_CITY).await
            }
        }
    }

    /// Writes a settings change and answers with the updated summary.
    /// Users who never subscribed are registered on their first change.
    async fn save(&self, sender: &Sender, update: &PreferenceUpdate) {
        let user_id = sender.user_id();
        let mut saved = self.registry.update_preferences(user_id, update).await;
        if !saved && self.registry.get_subscriber(user_id).await.is_none() {
            saved = self.registry.upsert_subscriber(&sender.profile).await
                && self.registry.update_preferences(user_id, update).await;
        }
        if !saved {
            return self.reply(sender, messages::OPERATION_FAILED).await;
        }
        match self.registry.get_subscriber(user_id).await {
            Some(record) => self.reply_markdown(sender, &messages::saved(&record)).await,
            None => self.reply(sender, messages::OPERATION_FAILED).await,
        }
    }

    async fn subscriber_with_city(&self, sender: &Sender) -> Option<SubscriberRecord> {
        self.registry
            .get_subscriber(sender.user_id())
            .await
            .filter(|record| record.city.is_some())
    }

    async fn prompt(&self, sender: &Sender, state: SessionState, text: &str) {
        self.sessions.apply(sender.chat_id, SessionEvent::Prompted(state));
        self.reply(sender, text).await
    }

    async fn reject(&self, sender: &Sender, text: &str) {
        self.sessions.apply(sender.chat_id, SessionEvent::InputRejected);
        self.reply(sender, text).await
    }

    async fn reply(&self, sender: &Sender, text: &str) {
        self.send(sender, text, RenderMode::Plain).await
    }

    async fn reply_markdown(&self, sender: &Sender, text: &str) {
        self.send(sender, text, RenderMode::Markdown).await
    }

    async fn send(&self, sender: &Sender, text: &str, mode: RenderMode) {
        if let Err(e) = self
            .notifier()
            .channel()
            .send_message(sender.chat_id, text, mode)
            .await
        {
            tracing::error!(error.cause_chain = ?e, "Failed to answer chat {}", sender.chat_id);
        }
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Morning,
    Evening,
}
