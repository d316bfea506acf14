use chrono::FixedOffset;
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use serde_aux::field_attributes::deserialize_option_number_from_string;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

#[derive(serde::Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub telegram: TelegramSettings,
    pub weather: WeatherSettings,
    pub advisory: AdvisorySettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

#[derive(serde::Deserialize)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_option_number_from_string")]
    pub port: Option<u16>,
    pub host: IpAddr,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub startup_delay_seconds: u64,
}

#[derive(serde::Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
    /// Full connection string, takes precedence over the individual fields.
    pub url: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_connections: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub connection_timeout_seconds: u64,
}

#[derive(serde::Deserialize)]
pub struct TelegramSettings {
    pub base_url: String,
    pub bot_token: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_timeout_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize)]
pub struct WeatherSettings {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize)]
pub struct AdvisorySettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone, Default)]
pub struct SchedulerSettings {
    /// Offset of the reference clock from UTC. The process local time is used when unset.
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to determine the current directory")]
    CurrentDirectory(#[source] std::io::Error),
    #[error("{0}")]
    UnknownEnvironment(String),
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("No Telegram bot token configured. Set BOT_TOKEN or APP_TELEGRAM__BOT_TOKEN.")]
    MissingBotToken,
    #[error("utc_offset_minutes = {0} is not a valid UTC offset")]
    InvalidUtcOffset(i32),
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either 'local' or 'production'.",
                other
            )),
        }
    }
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> Secret<String> {
        if let Some(url) = &self.url {
            return Secret::new(url.expose_secret().clone());
        }
        Secret::new(format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.database_name,
            ssl_mode(self.require_ssl)
        ))
    }

    pub fn connection_string_without_database(&self) -> Secret<String> {
        Secret::new(format!(
            "postgres://{}:{}@{}:{}?sslmode={}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port,
            ssl_mode(self.require_ssl)
        ))
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }
}

impl TelegramSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds)
    }
}

impl WeatherSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl AdvisorySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl SchedulerSettings {
    pub fn utc_offset(&self) -> Result<Option<FixedOffset>, ConfigurationError> {
        match self.utc_offset_minutes {
            None => Ok(None),
            Some(minutes) => FixedOffset::east_opt(minutes * 60)
                .map(Some)
                .ok_or(ConfigurationError::InvalidUtcOffset(minutes)),
        }
    }
}

impl Settings {
    /// Checks the settings the process cannot run without.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.telegram.bot_token.expose_secret().trim().is_empty() {
            return Err(ConfigurationError::MissingBotToken);
        }
        self.scheduler.utc_offset()?;
        Ok(())
    }
}

fn ssl_mode(require_ssl: bool) -> &'static str {
    match require_ssl {
        true => "require",
        false => "prefer",
    }
}

/// Bare variables understood by hosting platforms, mapped onto settings keys.
const PLATFORM_VARIABLES: [(&str, &str); 4] = [
    ("DATABASE_URL", "database.url"),
    ("BOT_TOKEN", "telegram.bot_token"),
    ("GEMINI_API_KEY", "advisory.api_key"),
    ("PORT", "application.port"),
];

pub fn get_configuration() -> Result<Settings, ConfigurationError> {
    let base_path = std::env::current_dir().map_err(ConfigurationError::CurrentDirectory)?;
    let configuration_directory = base_path.join("configuration");
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigurationError::UnknownEnvironment)?;

    let mut settings = config::Config::default();
    settings.merge(config::File::from(configuration_directory.join("base")).required(true))?;
    settings.merge(
        config::File::from(configuration_directory.join(environment.as_str())).required(true),
    )?;
    for (variable, key) in PLATFORM_VARIABLES {
        if let Ok(value) = std::env::var(variable) {
            if !value.is_empty() {
                settings.set(key, value)?;
            }
        }
    }
    settings.merge(config::Environment::with_prefix("app").separator("__"))?;
    Ok(settings.try_into()?)
}
