use crate::advisory::AdviceSource;
use crate::configuration::AdvisorySettings;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, Secret};

pub struct GeminiClient {
    http_client: Client,
    endpoint: Url,
    api_key: Secret<String>,
}

#[derive(serde::Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(serde::Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(serde::Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(serde::Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(serde::Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(
        settings: &AdvisorySettings,
        api_key: &Secret<String>,
    ) -> Result<Self, anyhow::Error> {
        let endpoint = Url::parse(&settings.base_url)
            .and_then(|base| {
                base.join(&format!(
                    "v1beta/models/{}:generateContent",
                    settings.model
                ))
            })
            .with_context(|| format!("Invalid advisory base url {}", settings.base_url))?;
        let http_client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build the advisory HTTP client")?;
        Ok(Self {
            http_client,
            endpoint,
            api_key: Secret::new(api_key.expose_secret().clone()),
        })
    }
}

#[async_trait]
impl AdviceSource for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, anyhow::Error> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };
        let response: GenerateResponse = self
            .http_client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .context("Failed to call the generation endpoint")?
            .error_for_status()?
            .json()
            .await
            .context("Unexpected generation response")?;

        let text = response
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }
}
