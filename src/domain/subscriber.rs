use crate::domain::{UserId, WeatherType};
use crate::models::{NotificationSettings, User};
use chrono::{DateTime, Utc};

/// Display fields captured when a user subscribes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberProfile {
    pub user_id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPreferences {
    /// Raw stored value. Anything that is not `HH:MM` never matches the clock.
    pub morning_time: String,
    pub evening_time: String,
    pub send_morning: bool,
    pub send_evening: bool,
    pub weather_type: WeatherType,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            morning_time: "08:00".into(),
            evening_time: "20:00".into(),
            send_morning: true,
            send_evening: false,
            weather_type: WeatherType::Brief,
        }
    }
}

impl NotificationPreferences {
    /// Whether any enabled slot is set to `now`. Same rule as the
    /// `due_subscribers` query in `registry::postgres`.
    pub fn is_due_at(&self, now: &str) -> bool {
        (self.send_morning && self.morning_time == now)
            || (self.send_evening && self.evening_time == now)
    }
}

/// A subscriber row joined with its preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberRecord {
    pub user_id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` when the preference row is missing.
    pub preferences: Option<NotificationPreferences>,
}

impl SubscriberRecord {
    pub fn weather_type(&self) -> WeatherType {
        self.preferences
            .as_ref()
            .map(|p| p.weather_type)
            .unwrap_or_default()
    }

    /// Active, has a city, and one of its enabled slots matches `now`.
    /// Registries that cannot filter in SQL select due subscribers with this.
    pub fn is_due_at(&self, now: &str) -> bool {
        self.is_active
            && self.city.is_some()
            && self
                .preferences
                .as_ref()
                .map(|p| p.is_due_at(now))
                .unwrap_or(false)
    }
}

impl From<NotificationSettings> for NotificationPreferences {
    fn from(row: NotificationSettings) -> Self {
        Self {
            morning_time: row.morning_time,
            evening_time: row.evening_time,
            send_morning: row.send_morning,
            send_evening: row.send_evening,
            weather_type: WeatherType::from_stored(&row.weather_type),
        }
    }
}

impl From<(User, Option<NotificationSettings>)> for SubscriberRecord {
    fn from((user, settings): (User, Option<NotificationSettings>)) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            city: user.city,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
            preferences: settings.map(NotificationPreferences::from),
        }
    }
}
