use log::debug;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::core::config::AnalyzerConfig;
use crate::core::error::{AnalyzerError, Result};
use crate::edgar::rate_limit::RateGate;

/// Shared HTTP client for all EDGAR endpoints. Every request carries the
/// configured contact User-Agent and goes through the rate gate.
pub struct EdgarClient {
    http: Client,
    user_agent: String,
    gate: RateGate,
}

impl EdgarClient {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .gzip(true)
            .build()
            .map_err(|e| AnalyzerError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(EdgarClient {
            http,
            user_agent: config.user_agent.clone(),
            gate: RateGate::new(config.request_delay),
        })
    }

    async fn get(&self, url: &Url) -> std::result::Result<reqwest::Response, reqwest::Error> {
        debug!("GET {}", url);
        self.gate
            .throttle(
                self.http
                    .get(url.as_str())
                    .header(header::USER_AGENT, self.user_agent.as_str())
                    .header(header::ACCEPT_ENCODING, "gzip, deflate")
                    .send(),
            )
            .await
    }

    /// GET a JSON index endpoint. Any failure here is an upstream error:
    /// without the index there is nothing to retrieve.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let response = self
            .get(url)
            .await
            .map_err(|e| AnalyzerError::Upstream(describe(url, &e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzerError::Upstream(format!(
                "{} returned status {}",
                url, status
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| AnalyzerError::Upstream(describe(url, &e)))?;
        serde_json::from_str(&body)
            .map_err(|e| AnalyzerError::Upstream(format!("malformed JSON from {}: {}", url, e)))
    }

    /// GET a document body. Throttling statuses surface as `RateLimited` so
    /// the caller's retry policy can back off; other failures are downloads
    /// gone wrong.
    pub async fn get_document(&self, url: &Url) -> Result<String> {
        let response = self
            .get(url)
            .await
            .map_err(|e| AnalyzerError::Download(describe(url, &e)))?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(AnalyzerError::RateLimited(status.as_u16()));
        }
        if !status.is_success() {
            return Err(AnalyzerError::Download(format!(
                "{} returned status {}",
                url, status
            )));
        }
        response
            .text()
            .await
            .map_err(|e| AnalyzerError::Download(describe(url, &e)))
    }
}

fn describe(url: &Url, err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request to {} timed out", url)
    } else {
        format!("request to {} failed: {}", url, err)
    }
}
