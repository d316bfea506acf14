use chrono::{NaiveTime, Timelike};

/// A local time of day in canonical `HH:MM` form.
///
/// Stored and compared as text, so parsing normalises single-digit hours
/// (`8:05` becomes `08:05`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationTime(String);

impl NotificationTime {
    /// Accepts `^([01]?[0-9]|2[0-3]):[0-5][0-9]$`.
    pub fn parse(s: &str) -> Result<NotificationTime, String> {
        let invalid = || format!("{} is not a valid HH:MM time of day.", s);
        let (hours, minutes) = s.split_once(':').ok_or_else(invalid)?;

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if hours.is_empty() || hours.len() > 2 || !all_digits(hours) {
            return Err(invalid());
        }
        if minutes.len() != 2 || !all_digits(minutes) {
            return Err(invalid());
        }

        let hour: u32 = hours.parse().map_err(|_| invalid())?;
        let minute: u32 = minutes.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(Self::from_hm(hour, minute))
    }

    pub fn from_naive(time: NaiveTime) -> NotificationTime {
        Self::from_hm(time.hour(), time.minute())
    }

    fn from_hm(hour: u32, minute: u32) -> NotificationTime {
        Self(format!("{:02}:{:02}", hour, minute))
    }

    pub fn default_morning() -> NotificationTime {
        Self::from_hm(8, 0)
    }

    pub fn default_evening() -> NotificationTime {
        Self::from_hm(20, 0)
    }
}

impl AsRef<str> for NotificationTime {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NotificationTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
