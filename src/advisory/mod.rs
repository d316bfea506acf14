//! Clothing advice generated from current conditions.
//!
//! The advisor is optional: without an API key the process runs with
//! [`Advisor::Unconfigured`] and weather messages go out on their own.
mod gemini_client;

use crate::configuration::AdvisorySettings;
use crate::weather::WeatherSnapshot;
use async_trait::async_trait;
pub use gemini_client::GeminiClient;
use secrecy::ExposeSecret;
use std::sync::Arc;

/// A text-generation backend.
#[async_trait]
pub trait AdviceSource: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, anyhow::Error>;
}

#[derive(Clone)]
pub enum Advisor {
    Unconfigured,
    Configured(Arc<dyn AdviceSource>),
}

impl Advisor {
    pub fn from_settings(settings: &AdvisorySettings) -> Result<Advisor, anyhow::Error> {
        let api_key = match &settings.api_key {
            Some(key) if !key.expose_secret().trim().is_empty() => key,
            _ => return Ok(Advisor::Unconfigured),
        };
        let client = GeminiClient::new(settings, api_key)?;
        Ok(Advisor::Configured(Arc::new(client)))
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Advisor::Configured(_))
    }

    /// Advice for the given conditions. `None` when unconfigured, on any
    /// upstream failure, or when the answer is blank.
    #[tracing::instrument(name = "Generating clothing advice", skip(self, snapshot))]
    pub async fn generate(&self, snapshot: &WeatherSnapshot) -> Option<String> {
        let source = match self {
            Advisor::Unconfigured => return None,
            Advisor::Configured(source) => source,
        };
        match source.complete(&advice_prompt(snapshot)).await {
            Ok(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Advice generation failed");
                None
            }
        }
    }
}

pub fn advice_prompt(snapshot: &WeatherSnapshot) -> String {
    format!(
        "You help people decide what to wear. Based on the weather below, give short, \
practical advice in 2-3 sentences.

Weather:
- Temperature: {}°C
- Feels like: {}°C
- Conditions: {}
- Humidity: {}%
- Wind: {} km/h {}
- Precipitation: {:.1} mm

Cover:
1. What clothes to wear
2. Whether accessories are needed (umbrella, hat, gloves and so on)
3. Any general tips

Answer briefly and in a friendly tone. Do not start with an emoji.",
        snapshot.temp_c,
        snapshot.feels_like_c,
        snapshot.description,
        snapshot.humidity_pct,
        snapshot.windspeed_kmh,
        snapshot.wind_dir,
        snapshot.precip_mm
    )
}

/// The chat message wrapping a piece of advice.
pub fn advice_message(advice: &str) -> String {
    format!("💡 *Recommendations:*\n\n{}", advice)
}
