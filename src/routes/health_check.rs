use crate::scheduler::NotificationScheduler;
use rocket::serde::json::Json;
use rocket::State;
use std::sync::Arc;

pub const ALIVE: &str = "Bot is running! 🌤️";

#[get("/")]
pub fn index() -> &'static str {
    ALIVE
}

#[get("/health")]
pub fn health() -> &'static str {
    ALIVE
}

#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
pub struct StatusReport {
    pub status: String,
    pub bot: String,
    pub message: String,
    pub scheduler: String,
}

#[get("/status")]
pub async fn status(scheduler: &State<Arc<NotificationScheduler>>) -> Json<StatusReport> {
    let scheduler_state = if scheduler.is_running().await {
        "running"
    } else {
        "stopped"
    };
    Json(StatusReport {
        status: "online".into(),
        bot: "weather-bot".into(),
        message: "The bot is running and accepting commands".into(),
        scheduler: scheduler_state.into(),
    })
}
