//! Recce Cloud HTTP client
//!
//! Implements [`SessionApi`] over `reqwest`. Every call goes through a
//! bounded retry loop for transient failures (connect/timeout, 5xx, 429).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::json;
use tracing::{debug, warn};

use crate::api::{touch_session_path, upload_completed_path, ApiError, SessionApi};
use crate::config::RunConfig;
use crate::context::RepoId;
use crate::session::{SessionRequest, SessionResponse};

const USER_AGENT: &str = concat!("recce-cloud-action/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 512;

/// Transport retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

/// Client configuration
#[derive(Clone)]
pub struct ClientConfig {
    /// API base URL without trailing slash
    pub api_host: String,
    /// Bearer token for API calls (never sent to pre-signed URLs)
    pub token: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(api_host: &str, token: &str) -> Self {
        ClientConfig {
            api_host: api_host.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_run_config(config: &RunConfig) -> Self {
        Self::new(&config.api_host, &config.auth_token)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_host", &self.api_host)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// HTTP client for the Recce Cloud session API
#[derive(Debug, Clone)]
pub struct RecceCloudClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl RecceCloudClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        Ok(RecceCloudClient {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a request, retrying transient failures.
    ///
    /// `build` is called once per attempt. A non-success status that is not
    /// transient is returned immediately as [`ApiError::Status`].
    async fn send<F>(&self, operation: &str, build: F) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder + Sync,
    {
        let build = &build;
        let attempt = move || send_once(build());

        attempt
            .retry(self.config.retry.backoff())
            .when(ApiError::is_transient)
            .notify(|err: &ApiError, delay: Duration| {
                warn!(
                    operation,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, retrying"
                );
            })
            .await
    }
}

async fn send_once(request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SessionApi for RecceCloudClient {
    async fn touch_session(
        &self,
        repo: &RepoId,
        request: &SessionRequest,
    ) -> Result<SessionResponse, ApiError> {
        let url = self.touch_session_url(repo);
        debug!(url = %url, "POST touch-recce-session");

        let response = self
            .send("touch-recce-session", || {
                self.http_client
                    .post(&url)
                    .bearer_auth(&self.config.token)
                    .header(ACCEPT, "application/json")
                    .json(request)
            })
            .await?;

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(ApiError::Decode("empty response body".to_string()));
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn upload_artifact(&self, url: &str, body: Vec<u8>) -> Result<(), ApiError> {
        debug!(bytes = body.len(), "PUT pre-signed artifact URL");

        self.send("upload-artifact", || {
            self.http_client
                .put(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
        })
        .await?;
        Ok(())
    }

    async fn upload_completed(&self, repo: &RepoId, session_id: &str) -> Result<(), ApiError> {
        let url = self.upload_completed_url(repo);
        debug!(url = %url, session_id, "POST upload-completed");

        let payload = json!({ "session_id": session_id });
        self.send("upload-completed", || {
            self.http_client
                .post(&url)
                .bearer_auth(&self.config.token)
                .header(ACCEPT, "application/json")
                .json(&payload)
        })
        .await?;
        Ok(())
    }

    fn touch_session_url(&self, repo: &RepoId) -> String {
        format!("{}{}", self.config.api_host, touch_session_path(repo))
    }

    fn upload_completed_url(&self, repo: &RepoId) -> String {
        format!("{}{}", self.config.api_host, upload_completed_path(repo))
    }
}
