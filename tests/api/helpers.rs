use async_trait::async_trait;
use chrono::Utc;
use diesel::{Connection, PgConnection, RunQueryDsl};
use once_cell::sync::Lazy;
use secrecy::ExposeSecret;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use weather_notifier::advisory::{AdviceSource, Advisor};
use weather_notifier::bot::BotHandler;
use weather_notifier::configuration::{get_configuration, Settings};
use weather_notifier::delivery::{ChatId, DeliveryChannel, RenderMode};
use weather_notifier::domain::{
    NotificationPreferences, NotificationTime, PreferenceUpdate, SubscriberProfile,
    SubscriberRecord, UserId,
};
use weather_notifier::registry::{PgRegistry, SubscriberRegistry};
use weather_notifier::scheduler::{NotificationScheduler, Notifier, SchedulerClock};
use weather_notifier::telegram::{Chat, Message, User};
use weather_notifier::telemetry::{get_subscriber, init_subscriber};
use weather_notifier::weather::{WeatherError, WeatherGateway, WeatherReport};

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".into();
    let subscriber_name = "test".into();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber).expect("Failed to install the test subscriber");
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber).expect("Failed to install the test subscriber");
    }
});

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

pub fn london_report() -> WeatherReport {
    serde_json::from_str(include_str!("../fixtures/wttr_london.json"))
        .expect("The fixture should parse")
}

pub fn subscriber(
    user_id: UserId,
    city: Option<&str>,
    preferences: NotificationPreferences,
) -> SubscriberRecord {
    SubscriberRecord {
        user_id,
        username: None,
        first_name: Some(format!("user-{}", user_id)),
        last_name: None,
        city: city.map(str::to_string),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        preferences: Some(preferences),
    }
}

pub fn evening_at(time: &str) -> NotificationPreferences {
    NotificationPreferences {
        evening_time: time.into(),
        send_evening: true,
        send_morning: false,
        ..NotificationPreferences::default()
    }
}

/// Keeps subscribers in memory with the same observable rules as Postgres.
#[derive(Default)]
pub struct InMemoryRegistry {
    subscribers: Mutex<BTreeMap<UserId, SubscriberRecord>>,
    failing: AtomicBool,
    duplicate_due_rows: AtomicBool,
}

impl InMemoryRegistry {
    pub fn with(records: Vec<SubscriberRecord>) -> Self {
        let registry = Self::default();
        for record in records {
            registry.insert(record);
        }
        registry
    }

    pub fn insert(&self, record: SubscriberRecord) {
        self.subscribers
            .lock()
            .unwrap()
            .insert(record.user_id, record);
    }

    pub fn record(&self, user_id: UserId) -> Option<SubscriberRecord> {
        self.subscribers.lock().unwrap().get(&user_id).cloned()
    }

    /// Every call fails from now on.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Due subscribers are listed twice.
    pub fn duplicate_due_rows(&self) {
        self.duplicate_due_rows.store(true, Ordering::SeqCst);
    }

    fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriberRegistry for InMemoryRegistry {
    async fn upsert_subscriber(&self, profile: &SubscriberProfile) -> bool {
        if self.is_failing() {
            return false;
        }
        let mut subscribers = self.subscribers.lock().unwrap();
        let record = subscribers
            .entry(profile.user_id)
            .or_insert_with(|| subscriber(profile.user_id, None, Default::default()));
        record.username = profile.username.clone();
        record.first_name = profile.first_name.clone();
        record.last_name = profile.last_name.clone();
        record.is_active = true;
        record.updated_at = Utc::now();
        true
    }

    async fn set_city(&self, user_id: UserId, city: &weather_notifier::domain::City) -> bool {
        if self.is_failing() {
            return false;
        }
        match self.subscribers.lock().unwrap().get_mut(&user_id) {
            Some(record) => {
                record.city = Some(city.as_ref().to_string());
                true
            }
            None => false,
        }
    }

    async fn get_subscriber(&self, user_id: UserId) -> Option<SubscriberRecord> {
        if self.is_failing() {
            return None;
        }
        self.record(user_id)
    }

    async fn update_preferences(&self, user_id: UserId, update: &PreferenceUpdate) -> bool {
        if self.is_failing() {
            return false;
        }
        let mut subscribers = self.subscribers.lock().unwrap();
        let record = match subscribers.get_mut(&user_id) {
            Some(record) => record,
            None => return false,
        };
        if let Some(city) = &update.city {
            record.city = Some(city.as_ref().to_string());
        }
        let preferences = record.preferences.get_or_insert_with(Default::default);
        if let Some(time) = &update.morning_time {
            preferences.morning_time = time.as_ref().to_string();
        }
        if let Some(time) = &update.evening_time {
            preferences.evening_time = time.as_ref().to_string();
        }
        if let Some(send) = update.send_morning {
            preferences.send_morning = send;
        }
        if let Some(send) = update.send_evening {
            preferences.send_evening = send;
        }
        if let Some(weather_type) = update.weather_type {
            preferences.weather_type = weather_type;
        }
        true
    }

    async fn list_due_subscribers(&self, now: &NotificationTime) -> Vec<SubscriberRecord> {
        if self.is_failing() {
            return vec![];
        }
        let due: Vec<_> = self
            .subscribers
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.is_active && record.city.is_some())
            .filter(|record| record.is_due_at(now.as_ref()))
            .cloned()
            .collect();
        if self.duplicate_due_rows.load(Ordering::SeqCst) {
            due.iter().chain(due.iter()).cloned().collect()
        } else {
            due
        }
    }

    async fn list_active_with_city(&self) -> Vec<SubscriberRecord> {
        if self.is_failing() {
            return vec![];
        }
        self.subscribers
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.is_active && record.city.is_some())
            .cloned()
            .collect()
    }

    async fn deactivate(&self, user_id: UserId) -> bool {
        if self.is_failing() {
            return false;
        }
        match self.subscribers.lock().unwrap().get_mut(&user_id) {
            Some(record) => {
                record.is_active = false;
                true
            }
            None => false,
        }
    }
}

/// Knows the weather for a fixed set of cities, fails for every other one.
#[derive(Default)]
pub struct FakeGateway {
    known: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl FakeGateway {
    pub fn knowing(cities: &[&str]) -> Self {
        Self {
            known: cities.iter().map(|c| c.to_lowercase()).collect(),
            ..Self::default()
        }
    }

    pub fn slow_for(mut self, city: &str, delay: Duration) -> Self {
        self.delays.insert(city.to_lowercase(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherGateway for FakeGateway {
    async fn fetch_report(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let city = city.to_lowercase();
        if let Some(delay) = self.delays.get(&city) {
            tokio::time::sleep(*delay).await;
        }
        if self.known.contains(&city) {
            Ok(london_report())
        } else {
            Err(WeatherError::UnexpectedStatus(reqwest::StatusCode::NOT_FOUND))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub mode: RenderMode,
}

/// Records every outgoing message. Sends to chats marked as failing error out.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<SentMessage>>,
    typing: Mutex<Vec<ChatId>>,
    failing_chats: Mutex<HashSet<ChatId>>,
}

impl RecordingChannel {
    pub fn fail_for(&self, chat_id: ChatId) {
        self.failing_chats.lock().unwrap().insert(chat_id);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.text)
            .collect()
    }

    pub fn last_text_to(&self, chat_id: ChatId) -> String {
        self.texts_to(chat_id)
            .pop()
            .unwrap_or_else(|| panic!("Nothing was sent to chat {}", chat_id))
    }

    pub fn typing(&self) -> Vec<ChatId> {
        self.typing.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: RenderMode,
    ) -> Result<(), anyhow::Error> {
        if self.failing_chats.lock().unwrap().contains(&chat_id) {
            anyhow::bail!("Forbidden: bot was blocked by the user");
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: text.to_string(),
            mode,
        });
        Ok(())
    }

    async fn send_typing(&self, chat_id: ChatId) -> Result<(), anyhow::Error> {
        self.typing.lock().unwrap().push(chat_id);
        Ok(())
    }
}

pub struct FakeAdvice {
    calls: AtomicUsize,
}

impl FakeAdvice {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdviceSource for FakeAdvice {
    async fn complete(&self, _prompt: &str) -> Result<String, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Wear a light jacket.".into())
    }
}

/// A scheduler and chat handler over in-memory collaborators.
pub struct TestBot {
    pub registry: Arc<InMemoryRegistry>,
    pub gateway: Arc<FakeGateway>,
    pub channel: Arc<RecordingChannel>,
    pub scheduler: Arc<NotificationScheduler>,
    pub handler: BotHandler,
}

impl TestBot {
    pub fn new(registry: InMemoryRegistry, gateway: FakeGateway) -> Self {
        Self::with_advisor(registry, gateway, Advisor::Unconfigured)
    }

    pub fn with_advisor(
        registry: InMemoryRegistry,
        gateway: FakeGateway,
        advisor: Advisor,
    ) -> Self {
        init_tracing();
        let registry = Arc::new(registry);
        let gateway = Arc::new(gateway);
        let channel = Arc::new(RecordingChannel::default());
        let notifier = Notifier::new(gateway.clone(), channel.clone(), advisor);
        let scheduler = Arc::new(NotificationScheduler::new(
            registry.clone(),
            notifier,
            SchedulerClock::Local,
        ));
        let handler = BotHandler::new(registry.clone(), scheduler.clone());
        Self {
            registry,
            gateway,
            channel,
            scheduler,
            handler,
        }
    }

    /// Delivers `text` as if user `user_id` typed it in their private chat.
    pub async fn say(&self, user_id: UserId, text: &str) {
        self.handler.handle_message(&message(user_id, text)).await
    }

    /// Sends `text` from `user_id` inside the group `chat_id`.
    pub async fn say_in_group(&self, chat_id: ChatId, user_id: UserId, text: &str) {
        let mut message = message(user_id, text);
        message.chat = Chat {
            id: chat_id,
            kind: "group".into(),
        };
        self.handler.handle_message(&message).await
    }
}

pub fn message(user_id: UserId, text: &str) -> Message {
    Message {
        message_id: 1,
        from: Some(User {
            id: user_id,
            is_bot: false,
            first_name: "Ada".into(),
            last_name: Some("Lovelace".into()),
            username: Some("ada".into()),
        }),
        chat: Chat {
            id: user_id,
            kind: "private".into(),
        },
        text: Some(text.into()),
    }
}

/// A migrated registry on a fresh, randomly named database.
pub async fn spawn_registry() -> (PgRegistry, PgConnection) {
    init_tracing();
    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.database.url = None;
        c.database.database_name = Uuid::new_v4().to_string();
        c
    };
    create_database(&configuration);

    let registry = PgRegistry::connect(&configuration.database).expect("Failed to build the pool.");
    registry
        .run_migrations()
        .await
        .expect("Failed to run migrations.");
    let connection = PgConnection::establish(
        configuration.database.connection_string().expose_secret(),
    )
    .expect("Failed to connect to Postgres.");
    (registry, connection)
}

fn create_database(configuration: &Settings) {
    let connection = PgConnection::establish(
        configuration
            .database
            .connection_string_without_database()
            .expose_secret(),
    )
    .expect("Failed to connect to Postgres.");
    diesel::sql_query(format!(
        "CREATE DATABASE \"{}\"",
        configuration.database.database_name
    ))
    .execute(&connection)
    .expect("Failed to create the test database.");
}
