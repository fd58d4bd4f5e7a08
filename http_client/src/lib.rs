use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;

pub const USER_AGENT: &str = concat!("callship/", env!("CARGO_PKG_VERSION"));

/// A response that arrived, whatever its status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_success_or_redirect(&self) -> bool {
        (200..400).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).context("Failed to parse response body as JSON")
    }
}

/// Thin reqwest wrapper with one bounded timeout for every request.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            // Redirects are reported, not followed: 3xx is a valid answer for some checks.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpClient { client, timeout })
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.send(url, self.client.get(url)).await
    }

    pub async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<HttpResponse> {
        self.send(url, self.client.post(url).form(form)).await
    }

    /// Sends a prepared request; transport failures become descriptive errors.
    pub async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> Result<HttpResponse> {
        log::debug!("HTTP request to {}", url);
        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("{}", describe_error(&e, self.timeout)))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            anyhow!(
                "HTTP {} from {} but reading the body failed: {}",
                status,
                url,
                describe_error(&e, self.timeout)
            )
        })?;
        log::debug!("HTTP {} from {}", status, url);
        Ok(HttpResponse { status, body })
    }
}

pub fn describe_error(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        format!("timed out after {}s", timeout.as_secs())
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}
