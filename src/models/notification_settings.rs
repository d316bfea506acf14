use crate::schema::notification_settings;

#[derive(Queryable, Debug)]
pub struct NotificationSettings {
    pub user_id: i64,
    pub morning_time: String,
    pub evening_time: String,
    pub send_morning: bool,
    pub send_evening: bool,
    pub weather_type: String,
}

/// Only the key is inserted; every other column takes its database default.
#[derive(Insertable)]
#[table_name = "notification_settings"]
pub struct NewNotificationSettings {
    pub user_id: i64,
}

/// `None` fields are left untouched by the update.
#[derive(AsChangeset, Default)]
#[table_name = "notification_settings"]
pub struct NotificationSettingsChangeset<'a> {
    pub morning_time: Option<&'a str>,
    pub evening_time: Option<&'a str>,
    pub send_morning: Option<bool>,
    pub send_evening: Option<bool>,
    pub weather_type: Option<&'a str>,
}

impl NotificationSettingsChangeset<'_> {
    pub fn is_empty(&self) -> bool {
        self.morning_time.is_none()
            && self.evening_time.is_none()
            && self.send_morning.is_none()
            && self.send_evening.is_none()
            && self.weather_type.is_none()
    }
}
