use crate::domain::{City, NotificationTime, WeatherType};

/// A sparse change to a subscriber's city and notification preferences.
///
/// Values are validated on construction, so anything that reaches the
/// registry is already well formed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceUpdate {
    pub city: Option<City>,
    pub morning_time: Option<NotificationTime>,
    pub evening_time: Option<NotificationTime>,
    pub send_morning: Option<bool>,
    pub send_evening: Option<bool>,
    pub weather_type: Option<WeatherType>,
}

impl PreferenceUpdate {
    /// Builds an update from loosely typed key/value pairs.
    ///
    /// Unrecognised keys are ignored; a recognised key with a malformed value
    /// rejects the whole update.
    pub fn from_fields<'a, I>(fields: I) -> Result<PreferenceUpdate, String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut update = PreferenceUpdate::default();
        for (key, value) in fields {
            match key {
                "city" => update.city = Some(City::parse(value)?),
                "morning_time" => update.morning_time = Some(NotificationTime::parse(value)?),
                "evening_time" => update.evening_time = Some(NotificationTime::parse(value)?),
                "send_morning" => update.send_morning = Some(parse_flag(value)?),
                "send_evening" => update.send_evening = Some(parse_flag(value)?),
                "weather_type" => update.weather_type = Some(WeatherType::parse(value)?),
                other => tracing::debug!("Ignoring unrecognised preference field {}", other),
            }
        }
        Ok(update)
    }

    pub fn city(city: City) -> Self {
        Self {
            city: Some(city),
            ..Default::default()
        }
    }

    /// Sets the morning slot and switches it on.
    pub fn morning(time: NotificationTime) -> Self {
        Self {
            morning_time: Some(time),
            send_morning: Some(true),
            ..Default::default()
        }
    }

    /// Sets the evening slot and switches it on.
    pub fn evening(time: NotificationTime) -> Self {
        Self {
            evening_time: Some(time),
            send_evening: Some(true),
            ..Default::default()
        }
    }

    pub fn weather_type(weather_type: WeatherType) -> Self {
        Self {
            weather_type: Some(weather_type),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &PreferenceUpdate::default()
    }
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "true" | "on" | "1" => Ok(true),
        "false" | "off" | "0" => Ok(false),
        other => Err(format!("{} is not a valid on/off value.", other)),
    }
}
