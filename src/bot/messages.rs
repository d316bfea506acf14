use crate::domain::{NotificationPreferences, SubscriberRecord};
use crate::weather::escape_markdown;

pub const OPERATION_FAILED: &str = "❌ Operation failed, please try again later.";
pub const NOT_SUBSCRIBED: &str = "❌ You are not subscribed. Use /subscribe to set things up.";
pub const NO_CITY: &str = "❌ No city set. Use /set_city or /subscribe to choose one.";
pub const ASK_CITY: &str = "🏙 Send me the name of your city:";
pub const ASK_FORECAST_CITY: &str = "🔍 Which city should I forecast?";
pub const ASK_MORNING_TIME: &str =
    "🌅 Send the morning notification time as HH:MM (for example 08:00):";
pub const ASK_EVENING_TIME: &str =
    "🌙 Send the evening notification time as HH:MM (for example 20:00):";
pub const INVALID_CITY: &str = "❌ That does not look like a city name. Please try again:";
pub const INVALID_TIME: &str = "❌ Invalid time format. Use HH:MM (for example 08:00).";
pub const WEATHER_USAGE: &str = "❌ Please give a city name.\nExample: /weather London";
pub const TYPE_USAGE: &str = "📊 Use /set_type brief or /set_type detailed.";
pub const UNSUBSCRIBED: &str =
    "🔕 Automatic weather notifications are off. Use /subscribe to turn them back on.";
pub const SENDING_TEST: &str = "📤 Sending a test notification...";
pub const CANCELLED: &str = "👌 Cancelled.";
pub const UNKNOWN_COMMAND: &str = "🤔 I don't know that command. Use /help to see what I can do.";

pub fn welcome(has_city: bool) -> String {
    let mut text = String::from(
        "🌤 Welcome to the weather bot!\n\n\
         Send me a city name for a quick report, or use /help to see every command.",
    );
    if !has_city {
        text.push_str("\n\n💡 Tip: set your city with /subscribe for daily notifications.");
    }
    text
}

pub const HELP: &str = "🌤 How to use this bot

Weather:
/weather <city> - brief report
/forecast [city] - detailed three day forecast
/my_weather - report for your saved city

Notifications:
/subscribe - set up automatic notifications
/unsubscribe - turn notifications off
/settings - show your settings
/set_city [city] - change your city
/set_morning [HH:MM] - morning notification time
/set_evening [HH:MM] - evening notification time
/set_type brief|detailed - report format
/toggle_morning - morning notification on/off
/toggle_evening - evening notification on/off
/test_notification - send a notification now

/cancel - abort the current question
/help - show this message

Examples:
/weather London
/set_morning 7:30";

fn switch(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// The settings summary, Markdown.
pub fn settings(record: &SubscriberRecord) -> String {
    let preferences = record.preferences.clone().unwrap_or_default();
    let city = record
        .city
        .as_deref()
        .map(escape_markdown)
        .unwrap_or_else(|| "not set".to_string());
    format!(
        "⚙️ *Your weather settings*\n\n\
         🏙 City: {}\n\
         {}\n\
         📊 Report: {}\n\
         📅 Status: {}\n\n\
         Change them with /set\\_city, /set\\_morning, /set\\_evening, /set\\_type, \
         /toggle\\_morning and /toggle\\_evening.",
        city,
        slots(&preferences),
        preferences.weather_type.label(),
        if record.is_active { "Active" } else { "Inactive" }
    )
}

fn slots(preferences: &NotificationPreferences) -> String {
    format!(
        "🌅 Morning: {} ({})\n🌙 Evening: {} ({})",
        preferences.morning_time,
        switch(preferences.send_morning),
        preferences.evening_time,
        switch(preferences.send_evening)
    )
}

pub fn saved(record: &SubscriberRecord) -> String {
    format!("✅ Saved.\n\n{}", settings(record))
}
