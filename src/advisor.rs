use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::weather::WeatherSnapshot;

// Sampling parameters for every completion call.
const COMPLETION_TEMPERATURE: f64 = 0.7;
const COMPLETION_MAX_TOKENS: u32 = 150;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("completion API returned no choices")]
    EmptyCompletion,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    n: u8,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Client for the external text-generation service. The two calls per
/// diagnosis are sequential by construction: the remedy prompt embeds the
/// cause text.
#[derive(Clone)]
pub struct AdvisorService {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    model: String,
}

impl AdvisorService {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            base_url,
            model,
        }
    }

    pub async fn probable_cause(
        &self,
        pest: &str,
        weather: &WeatherSnapshot,
    ) -> Result<String, AdvisorError> {
        self.complete(&cause_prompt(pest, weather)).await
    }

    pub async fn home_remedy(&self, pest: &str, cause: &str) -> Result<String, AdvisorError> {
        self.complete(&remedy_prompt(pest, cause)).await
    }

    async fn complete(&self, prompt: &str) -> Result<String, AdvisorError> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: COMPLETION_MAX_TOKENS,
            n: 1,
            temperature: COMPLETION_TEMPERATURE,
        };

        let response = self
            .http_client
            .post(format!("{}/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        extract_text(parsed)
    }
}

fn extract_text(response: CompletionResponse) -> Result<String, AdvisorError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(AdvisorError::EmptyCompletion)?;
    Ok(choice.text.trim().to_string())
}

fn cause_prompt(pest: &str, weather: &WeatherSnapshot) -> String {
    format!(
        "The pest causing the plant disease is: {pest}. The current weather data is: {weather}. \
         What could be the probable cause of the issue (e.g., nutrient deficiency, climate change)?"
    )
}

fn remedy_prompt(pest: &str, cause: &str) -> String {
    format!(
        "Plant disease caused by {pest} and the probable cause is: {cause}. \
         Can you suggest a simple home remedy to fix this?"
    )
}
