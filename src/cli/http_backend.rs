use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::models::{ChannelPage, ChannelQuery, HealthResponse};

/// HTTP client backend that delegates queries to a running `chanlist`
/// server.
pub struct HttpChannelBackend {
    client: Client,
    base_url: String,
}

impl HttpChannelBackend {
    /// Create a new HTTP backend targeting the given base URL
    /// (e.g. "http://127.0.0.1:9999").
    pub fn new<S: Into<String>>(base_url: S) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Execute a query via `POST /api/channels`.
    pub fn query(&self, query: &ChannelQuery) -> Result<ChannelPage> {
        self.post_json("/api/channels", &query.to_request_body())
    }

    /// Fetch `GET /api/health`.
    pub fn health(&self) -> Result<HealthResponse> {
        let url = self.url_for("/api/health");
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("failed to send request to {}", url))?;
        let response = ensure_success(response, &url)?;

        response
            .json::<HealthResponse>()
            .context("failed to decode JSON response from server")
    }

    fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = self.url_for(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .with_context(|| format!("failed to send request to {}", url))?;
        let response = ensure_success(response, &url)?;

        let value = response
            .json::<R>()
            .context("failed to decode JSON response from server")?;

        Ok(value)
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Pass successful responses through; turn anything else into an error
/// carrying the server's own message.
fn ensure_success(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    bail!(
        "server returned {} for {}: {}",
        status,
        url,
        server_error_message(status, &body)
    )
}

/// Extract the `error` field of a JSON error body, falling back to the
/// raw body or the status reason.
fn server_error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string));
    if let Some(message) = from_json {
        return message;
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.to_string()
    }
}
