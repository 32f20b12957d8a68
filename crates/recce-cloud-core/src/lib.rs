//! Recce Cloud session upload
//!
//! Uploads a dbt project's `manifest.json` and `catalog.json` to a Recce
//! Cloud review session from a CI run.
//!
//! ## Workflow
//!
//! 1. Resolve [`RunConfig`] from action inputs and [`GithubContext`] from
//!    the CI environment
//! 2. Verify both artifacts exist ([`ArtifactSet::verify`])
//! 3. Read `metadata.adapter_type` from the manifest
//! 4. Touch the session (pull-request or base-branch shape)
//! 5. Upload both artifacts to their pre-signed URLs, concurrently
//! 6. Notify upload completion
//! 7. Write the job summary and, for pull requests, the `session_id` output
//!
//! [`workflow::execute`] runs all of it and reports failures through an
//! [`ActionSink`].

pub mod api;
pub mod artifacts;
pub mod client;
pub mod config;
pub mod context;
mod error;
pub mod fakes;
pub mod manifest;
pub mod report;
pub mod session;
pub mod sink;
pub mod telemetry;
pub mod upload;
pub mod workflow;

pub use api::{ApiError, SessionApi};
pub use artifacts::{ArtifactDigest, ArtifactFile, ArtifactSet, CATALOG_FILE, MANIFEST_FILE};
pub use client::{ClientConfig, RecceCloudClient, RetryPolicy};
pub use config::{ActionInputs, EnvSnapshot, RunConfig};
pub use context::{GithubContext, RepoId, TriggerContext, TriggerKind};
pub use error::{ActionError, Result};
pub use manifest::{read_manifest_metadata, ManifestMetadata};
pub use report::{report_failure, report_success, SESSION_ID_OUTPUT};
pub use session::{Session, SessionRequest, SessionResponse};
pub use sink::{ActionSink, GithubActionsSink};
pub use telemetry::{init_tracing, LogFormat};
pub use workflow::{execute, run, RunOutcome, WorkflowStage};
