//! Detection service HTTP client.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::types::{DetectionRequest, RawResponse};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the detection client.
#[derive(Clone)]
pub struct DetectionClientConfig {
    /// Full endpoint URL (the request is POSTed here as-is)
    pub api_url: String,
    /// Bearer credential sent in `Authorization`
    pub bearer_token: String,
    /// Request timeout
    pub timeout: Duration,
}

impl fmt::Debug for DetectionClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionClientConfig")
            .field("api_url", &self.api_url)
            .field("bearer_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DetectionClientConfig {
    pub fn new(api_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            bearer_token: bearer_token.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the detection service. One attempt per call, no retries.
pub struct DetectionClient {
    http: Client,
    url: Url,
    config: DetectionClientConfig,
}

impl DetectionClient {
    /// Create a new client. Certificate verification stays on.
    pub fn new(config: DetectionClientConfig) -> ClientResult<Self> {
        let url = Url::parse(&config.api_url)
            .map_err(|e| ClientError::InvalidConfig(format!("API_URL {:?}: {e}", config.api_url)))?;
        if config.bearer_token.trim().is_empty() {
            return Err(ClientError::InvalidConfig("bearer token is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self { http, url, config })
    }

    /// Upload an image and return the raw response.
    ///
    /// Non-2xx statuses are errors; a 2xx body is returned undecoded.
    pub async fn detect(&self, request: DetectionRequest) -> ClientResult<RawResponse> {
        let part = Part::bytes(request.image)
            .file_name(request.file_name)
            .mime_str(&request.mime)?;
        let form = Form::new()
            .part("image", part)
            .text("isEar", bool_field(request.regions.ear))
            .text("isNeck", bool_field(request.regions.neck));

        debug!(url = %self.url, "sending detection request");
        let start = Instant::now();

        let response = self
            .http
            .post(self.url.clone())
            .bearer_auth(&self.config.bearer_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;
        let elapsed = start.elapsed();

        if !status.is_success() {
            warn!(status = status.as_u16(), ?elapsed, "detection request failed");
            return Err(ClientError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        info!(status = status.as_u16(), ?elapsed, bytes = body.len(), "detection response received");
        debug!(body = %body, "raw detection response");

        Ok(RawResponse {
            status: status.as_u16(),
            body,
            elapsed,
        })
    }

    fn classify(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(self.config.timeout)
        } else {
            ClientError::Network(e)
        }
    }
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
