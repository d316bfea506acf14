//! Weather lookups against wttr.in and the two message renders.

mod render;
mod report;
mod wttr_client;

use crate::domain::WeatherType;
use crate::errors::error_chain_fmt;
use async_trait::async_trait;
pub use render::{escape_markdown, render_brief, render_detailed, unavailable_message};
pub use report::{
    Astronomy, CurrentCondition, DailyForecast, HourlyForecast, NearestArea, TextValue,
    WeatherReport, WeatherSnapshot,
};
pub use wttr_client::WttrClient;

#[derive(thiserror::Error)]
pub enum WeatherError {
    #[error("Failed to reach the weather service.")]
    Request(#[from] reqwest::Error),
    #[error("The weather service answered with status {0}.")]
    UnexpectedStatus(reqwest::StatusCode),
    #[error("The weather payload could not be parsed.")]
    MalformedPayload(#[source] serde_json::Error),
    #[error("The weather payload is missing {0}.")]
    MissingData(&'static str),
    #[error("{0:?} cannot be used as a weather location.")]
    InvalidLocation(String),
}

impl std::fmt::Debug for WeatherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Source of weather data for a free-text city.
///
/// Implementors only provide [`WeatherGateway::fetch_report`]; the renders
/// are derived from it.
#[async_trait]
pub trait WeatherGateway: Send + Sync {
    async fn fetch_report(&self, city: &str) -> Result<WeatherReport, WeatherError>;

    async fn fetch_brief(&self, city: &str) -> Result<String, WeatherError> {
        let report = self.fetch_report(city).await?;
        render_brief(&report, city)
    }

    async fn fetch_detailed(&self, city: &str) -> Result<String, WeatherError> {
        let report = self.fetch_report(city).await?;
        render_detailed(&report, city)
    }

    async fn fetch_rendered(
        &self,
        city: &str,
        weather_type: WeatherType,
    ) -> Result<String, WeatherError> {
        match weather_type {
            WeatherType::Brief => self.fetch_brief(city).await,
            WeatherType::Detailed => self.fetch_detailed(city).await,
        }
    }

    /// The attributes the advisory generator works from. `None` on any failure.
    async fn fetch_structured(&self, city: &str) -> Option<WeatherSnapshot> {
        match self.fetch_report(city).await {
            Ok(report) => report.snapshot(),
            Err(e) => {
                tracing::debug!(error.cause_chain = ?e, "No structured weather for {}", city);
                None
            }
        }
    }
}
