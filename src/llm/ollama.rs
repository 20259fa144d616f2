use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::CompletionService;
use crate::core::config::AnalyzerConfig;
use crate::core::error::{AnalyzerError, Result};

/// Client for Ollama's non-streaming generate endpoint.
pub struct OllamaClient {
    http: Client,
    endpoint: Url,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AnalyzerError::Config(format!("failed to build HTTP client: {}", e)))?;
        let endpoint = config
            .ollama_url
            .join("api/generate")
            .map_err(|e| AnalyzerError::Config(format!("invalid OLLAMA_URL: {}", e)))?;

        Ok(OllamaClient {
            http,
            endpoint,
            model: config.model_name.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionService for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting completion from {} ({} chars of prompt)",
            self.endpoint,
            prompt.chars().count()
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .http
            .post(self.endpoint.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalyzerError::CompletionService("completion request timed out".to_string())
                } else if e.is_connect() {
                    AnalyzerError::CompletionService(format!(
                        "cannot reach completion service at {}: {}",
                        self.endpoint, e
                    ))
                } else {
                    AnalyzerError::CompletionService(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::CompletionService(format!(
                "completion service returned status {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            AnalyzerError::CompletionService(format!("malformed completion response: {}", e))
        })?;

        if parsed.response.trim().is_empty() {
            return Err(AnalyzerError::CompletionService(
                "completion service returned an empty response".to_string(),
            ));
        }

        debug!("Received {} chars of completion", parsed.response.chars().count());
        Ok(parsed.response)
    }
}
