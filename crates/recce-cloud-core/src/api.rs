//! Session API abstraction.
//!
//! The workflow talks to Recce Cloud only through [`SessionApi`]. The
//! production implementation is [`crate::client::RecceCloudClient`]; an
//! in-memory fake lives in [`crate::fakes`].

use async_trait::async_trait;
use thiserror::Error;

use crate::context::RepoId;
use crate::session::{SessionRequest, SessionResponse};

/// Transport-level failure of a single API call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }

    /// Connect/timeout errors, 5xx and 429 are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_connect() || e.is_timeout(),
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::Decode(_) => false,
        }
    }
}

/// Path of the touch-session endpoint under the API host.
pub fn touch_session_path(repo: &RepoId) -> String {
    format!(
        "/api/v2/github/{}/{}/touch-recce-session",
        repo.owner, repo.name
    )
}

/// Path of the upload-completed endpoint under the API host.
pub fn upload_completed_path(repo: &RepoId) -> String {
    format!("/api/v2/github/{}/{}/upload-completed", repo.owner, repo.name)
}

/// Remote operations used by the session upload workflow.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Create or refresh the session for a repository/branch.
    async fn touch_session(
        &self,
        repo: &RepoId,
        request: &SessionRequest,
    ) -> Result<SessionResponse, ApiError>;

    /// `PUT` raw artifact bytes to a pre-signed URL.
    async fn upload_artifact(&self, url: &str, body: Vec<u8>) -> Result<(), ApiError>;

    /// Mark the session's uploads as complete.
    async fn upload_completed(&self, repo: &RepoId, session_id: &str) -> Result<(), ApiError>;

    /// Full URL of the touch-session endpoint, for diagnostics.
    fn touch_session_url(&self, repo: &RepoId) -> String;

    /// Full URL of the upload-completed endpoint, for diagnostics.
    fn upload_completed_url(&self, repo: &RepoId) -> String;
}
