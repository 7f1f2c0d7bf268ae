//! HTTP transport to the reply service

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::blocking::Client;

use super::reply::{ChatRequest, ReplyError, ReplyOutcome, parse_reply};

/// Sends one chat request and waits for the reply.
///
/// Implementations are called from worker threads.
pub trait ReplyTransport: Send + Sync {
    fn send(&self, request: &ChatRequest) -> ReplyOutcome;
}

pub struct HttpReplyClient {
    endpoint: String,
    client: Client,
}

impl HttpReplyClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, error: reqwest::Error) -> ReplyError {
        if error.is_timeout() {
            ReplyError::Timeout
        } else if error.is_connect() {
            ReplyError::Connect {
                endpoint: self.endpoint.clone(),
                detail: error.to_string(),
            }
        } else {
            ReplyError::Other(error.to_string())
        }
    }
}

impl ReplyTransport for HttpReplyClient {
    fn send(&self, request: &ChatRequest) -> ReplyOutcome {
        debug!(
            "POST {} (selection: {})",
            self.endpoint,
            request.selected_text.is_some()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Reply service answered HTTP {status}");
            return Err(ReplyError::from_status(status.as_u16(), &self.endpoint));
        }

        let body = response.text().map_err(|e| self.classify(e))?;
        parse_reply(&body)
    }
}

/// URL of the service's `/health` route, derived from the chat endpoint
pub fn health_url(endpoint: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(endpoint)
        .with_context(|| format!("Invalid endpoint URL: {endpoint}"))?;
    url.set_path("/health");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Probe the reply service's health route and return its JSON status
pub fn check_health(endpoint: &str, timeout: Duration) -> Result<serde_json::Value> {
    let url = health_url(endpoint)?;
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let response = client
        .get(url.clone())
        .send()
        .with_context(|| format!("Cannot reach {url}"))?
        .error_for_status()
        .with_context(|| format!("Health check failed for {url}"))?;
    response
        .json::<serde_json::Value>()
        .with_context(|| format!("Health route at {url} did not return JSON"))
}
