mod city;
mod notification_time;
mod preference_update;
mod subscriber;
mod weather_type;

pub use city::City;
pub use notification_time::NotificationTime;
pub use preference_update::PreferenceUpdate;
pub use subscriber::{NotificationPreferences, SubscriberProfile, SubscriberRecord};
pub use weather_type::WeatherType;

/// Telegram user id. Deliveries go to the private chat with the same id.
pub type UserId = i64;
