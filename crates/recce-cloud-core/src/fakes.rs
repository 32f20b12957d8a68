//! In-memory fakes for [`SessionApi`] and [`ActionSink`] (testing only)
//!
//! `MemorySessionApi` answers from canned responses and records every call;
//! `MemorySink` captures summaries, outputs, and annotations.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{touch_session_path, upload_completed_path, ApiError, SessionApi};
use crate::context::RepoId;
use crate::error::Result;
use crate::session::{SessionRequest, SessionResponse};
use crate::sink::ActionSink;

const FAKE_HOST: &str = "https://fake.recce.test";

// ---------------------------------------------------------------------------
// MemorySessionApi
// ---------------------------------------------------------------------------

/// A call received by [`MemorySessionApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    TouchSession {
        repo: RepoId,
        request: SessionRequest,
    },
    UploadArtifact {
        url: String,
        body: Vec<u8>,
    },
    UploadCompleted {
        repo: RepoId,
        session_id: String,
    },
}

/// Canned-response [`SessionApi`].
#[derive(Debug)]
pub struct MemorySessionApi {
    touch_response: std::result::Result<SessionResponse, u16>,
    failing_uploads: HashMap<String, u16>,
    completed_status: Option<u16>,
    calls: Mutex<Vec<ApiCall>>,
}

impl MemorySessionApi {
    /// Fake returning a complete session with predictable upload URLs.
    pub fn new(session_id: &str) -> Self {
        Self::with_response(SessionResponse {
            session_id: Some(session_id.to_string()),
            manifest_upload_url: Some(format!("{FAKE_HOST}/upload/{session_id}/manifest.json")),
            catalog_upload_url: Some(format!("{FAKE_HOST}/upload/{session_id}/catalog.json")),
        })
    }

    pub fn with_response(response: SessionResponse) -> Self {
        MemorySessionApi {
            touch_response: Ok(response),
            failing_uploads: HashMap::new(),
            completed_status: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make touch-session answer with an error status.
    pub fn failing_touch(mut self, status: u16) -> Self {
        self.touch_response = Err(status);
        self
    }

    /// Make uploads to URLs ending in `suffix` answer with `status`.
    pub fn failing_upload(mut self, suffix: &str, status: u16) -> Self {
        self.failing_uploads.insert(suffix.to_string(), status);
        self
    }

    /// Make upload-completed answer with an error status.
    pub fn failing_completion(mut self, status: u16) -> Self {
        self.completed_status = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ApiCall::UploadArtifact { .. }))
            .count()
    }

    pub fn completion_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ApiCall::UploadCompleted { .. }))
            .count()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn status_error(status: u16) -> ApiError {
    ApiError::Status {
        status,
        body: "fake failure".to_string(),
    }
}

#[async_trait]
impl SessionApi for MemorySessionApi {
    async fn touch_session(
        &self,
        repo: &RepoId,
        request: &SessionRequest,
    ) -> std::result::Result<SessionResponse, ApiError> {
        self.record(ApiCall::TouchSession {
            repo: repo.clone(),
            request: request.clone(),
        });
        self.touch_response.clone().map_err(status_error)
    }

    async fn upload_artifact(&self, url: &str, body: Vec<u8>) -> std::result::Result<(), ApiError> {
        self.record(ApiCall::UploadArtifact {
            url: url.to_string(),
            body,
        });
        match self
            .failing_uploads
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
        {
            Some((_, status)) => Err(status_error(*status)),
            None => Ok(()),
        }
    }

    async fn upload_completed(
        &self,
        repo: &RepoId,
        session_id: &str,
    ) -> std::result::Result<(), ApiError> {
        self.record(ApiCall::UploadCompleted {
            repo: repo.clone(),
            session_id: session_id.to_string(),
        });
        match self.completed_status {
            Some(status) => Err(status_error(status)),
            None => Ok(()),
        }
    }

    fn touch_session_url(&self, repo: &RepoId) -> String {
        format!("{FAKE_HOST}{}", touch_session_path(repo))
    }

    fn upload_completed_url(&self, repo: &RepoId) -> String {
        format!("{FAKE_HOST}{}", upload_completed_path(repo))
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Recording [`ActionSink`].
#[derive(Debug, Default)]
pub struct MemorySink {
    summary: Mutex<String>,
    outputs: Mutex<BTreeMap<String, String>>,
    errors: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> String {
        self.summary.lock().unwrap().clone()
    }

    pub fn outputs(&self) -> BTreeMap<String, String> {
        self.outputs.lock().unwrap().clone()
    }

    pub fn output(&self, name: &str) -> Option<String> {
        self.outputs.lock().unwrap().get(name).cloned()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl ActionSink for MemorySink {
    fn append_summary(&self, markdown: &str) -> Result<()> {
        let mut summary = self.summary.lock().unwrap();
        summary.push_str(markdown);
        summary.push('\n');
        Ok(())
    }

    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        self.outputs
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn annotate_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}
