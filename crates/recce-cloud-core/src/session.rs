//! Session request/response shapes and the touch-session step.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::SessionApi;
use crate::context::{GithubContext, TriggerContext};
use crate::error::{ActionError, Result};

/// Body of `touch-recce-session`.
///
/// Serialized untagged: the pull-request variant carries `pr_number`,
/// the base variant has no such key at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionRequest {
    PullRequest {
        branch: String,
        adapter_type: String,
        pr_number: u64,
    },
    Base {
        branch: String,
        adapter_type: String,
    },
}

impl SessionRequest {
    /// Build the request variant matching the trigger.
    pub fn for_trigger(trigger: &TriggerContext, adapter_type: &str) -> Self {
        match trigger {
            TriggerContext::PullRequest { branch, pr_number } => SessionRequest::PullRequest {
                branch: branch.clone(),
                adapter_type: adapter_type.to_string(),
                pr_number: *pr_number,
            },
            TriggerContext::Push { branch } => SessionRequest::Base {
                branch: branch.clone(),
                adapter_type: adapter_type.to_string(),
            },
        }
    }

    pub fn branch(&self) -> &str {
        match self {
            SessionRequest::PullRequest { branch, .. } | SessionRequest::Base { branch, .. } => {
                branch
            }
        }
    }
}

/// Raw body returned by `touch-recce-session`. Fields are validated by
/// [`SessionResponse::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub manifest_upload_url: Option<String>,
    #[serde(default)]
    pub catalog_upload_url: Option<String>,
}

/// A session with all fields present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub manifest_upload_url: String,
    pub catalog_upload_url: String,
}

impl SessionResponse {
    /// Convert to a [`Session`], or return the names of the missing or
    /// empty fields.
    pub fn validate(self) -> std::result::Result<Session, Vec<&'static str>> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        let session_id = present(self.session_id);
        let manifest_upload_url = present(self.manifest_upload_url);
        let catalog_upload_url = present(self.catalog_upload_url);

        match (session_id, manifest_upload_url, catalog_upload_url) {
            (Some(session_id), Some(manifest_upload_url), Some(catalog_upload_url)) => {
                Ok(Session {
                    session_id,
                    manifest_upload_url,
                    catalog_upload_url,
                })
            }
            (session_id, manifest, catalog) => {
                let mut missing = Vec::new();
                if session_id.is_none() {
                    missing.push("session_id");
                }
                if manifest.is_none() {
                    missing.push("manifest_upload_url");
                }
                if catalog.is_none() {
                    missing.push("catalog_upload_url");
                }
                Err(missing)
            }
        }
    }
}

/// Create or refresh the session for this repository and branch.
pub async fn touch_session(
    api: &dyn SessionApi,
    ctx: &GithubContext,
    adapter_type: &str,
) -> Result<Session> {
    let request = SessionRequest::for_trigger(&ctx.trigger, adapter_type);
    let endpoint = api.touch_session_url(&ctx.repository);
    let trigger = ctx.trigger.kind();

    info!(
        repository = %ctx.repository,
        branch = request.branch(),
        event = %trigger,
        "Touching Recce session"
    );

    let response = api
        .touch_session(&ctx.repository, &request)
        .await
        .map_err(|e| ActionError::SessionCreationFailed {
            repository: ctx.repository.to_string(),
            branch: request.branch().to_string(),
            trigger,
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

    let session = response
        .validate()
        .map_err(|missing| ActionError::IncompleteSessionResponse {
            repository: ctx.repository.to_string(),
            branch: request.branch().to_string(),
            trigger,
            endpoint,
            missing,
        })?;

    info!(session_id = %session.session_id, "Recce session ready");
    Ok(session)
}
