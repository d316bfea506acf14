use crate::configuration::{ConfigurationError, SchedulerSettings};
use crate::domain::NotificationTime;
use chrono::{FixedOffset, Local, NaiveDateTime, NaiveTime, Timelike, Utc};
use std::time::Duration;

/// The single wall clock every subscriber's `HH:MM` is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerClock {
    Local,
    Fixed(FixedOffset),
}

impl SchedulerClock {
    pub fn from_settings(settings: &SchedulerSettings) -> Result<Self, ConfigurationError> {
        Ok(match settings.utc_offset()? {
            Some(offset) => SchedulerClock::Fixed(offset),
            None => SchedulerClock::Local,
        })
    }

    pub fn now(&self) -> NaiveDateTime {
        match self {
            SchedulerClock::Local => Local::now().naive_local(),
            SchedulerClock::Fixed(offset) => Utc::now().with_timezone(offset).naive_local(),
        }
    }

    pub fn now_hhmm(&self) -> NotificationTime {
        NotificationTime::from_naive(self.now().time())
    }

    pub fn until_next_minute(&self) -> Duration {
        until_next_minute(self.now().time())
    }
}

/// Time left until the seconds hand reaches zero again. Never zero.
pub fn until_next_minute(now: NaiveTime) -> Duration {
    // Leap seconds report nanoseconds past 1e9.
    let millis = (now.nanosecond() / 1_000_000).min(999);
    let into_minute = u64::from(now.second()) * 1000 + u64::from(millis);
    Duration::from_millis(60_000 - into_minute)
}
