use crate::configuration::WeatherSettings;
use crate::weather::{WeatherError, WeatherGateway, WeatherReport};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

/// [`WeatherGateway`] over wttr.in's JSON format.
pub struct WttrClient {
    http_client: Client,
    base_url: Url,
}

impl WttrClient {
    pub fn new(settings: &WeatherSettings) -> Result<Self, anyhow::Error> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid weather base url {}", settings.base_url))?;
        let http_client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build the weather HTTP client")?;
        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn report_url(&self, city: &str) -> Result<Url, WeatherError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| WeatherError::InvalidLocation(city.to_string()))?
            .pop_if_empty()
            .push(city);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }
}

#[async_trait]
impl WeatherGateway for WttrClient {
    #[tracing::instrument(name = "Fetching weather from wttr.in", skip(self))]
    async fn fetch_report(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let url = self.report_url(city)?;
        let response = self.http_client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(WeatherError::UnexpectedStatus(response.status()));
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(WeatherError::MalformedPayload)
    }
}
