//! The session upload workflow.
//!
//! Steps run strictly in order:
//! verify artifacts -> read adapter type -> touch session -> upload both
//! artifacts -> notify completion -> report. The first failure ends the
//! run; nothing already sent is undone.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::api::SessionApi;
use crate::artifacts::ArtifactSet;
use crate::config::RunConfig;
use crate::context::{GithubContext, TriggerContext, TriggerKind};
use crate::error::{ActionError, Result};
use crate::manifest::read_manifest_metadata;
use crate::report::{report_failure, report_success};
use crate::session::touch_session;
use crate::sink::ActionSink;
use crate::upload::{notify_completion, upload_artifacts};

/// Workflow states. The success path visits them in declaration order;
/// any failure goes straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Start,
    Verified,
    AdapterExtracted,
    SessionObtained,
    Uploaded,
    Notified,
    Reported,
    Failed,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStage::Start => "start",
            WorkflowStage::Verified => "verified",
            WorkflowStage::AdapterExtracted => "adapter_extracted",
            WorkflowStage::SessionObtained => "session_obtained",
            WorkflowStage::Uploaded => "uploaded",
            WorkflowStage::Notified => "notified",
            WorkflowStage::Reported => "reported",
            WorkflowStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub session_id: String,
    pub trigger: TriggerKind,
    /// Set for pull-request runs only
    pub launch_url: Option<String>,
    pub stage: WorkflowStage,
}

struct StageTracker {
    stage: WorkflowStage,
}

impl StageTracker {
    fn new() -> Self {
        StageTracker {
            stage: WorkflowStage::Start,
        }
    }

    fn advance(&mut self, next: WorkflowStage) {
        info!(from = %self.stage, to = %next, "Workflow stage");
        self.stage = next;
    }

    fn fail(&mut self, err: ActionError) -> ActionError {
        warn!(stage = %self.stage, "Workflow failed");
        self.stage = WorkflowStage::Failed;
        err
    }
}

/// Run the workflow without failure reporting.
pub async fn run(
    config: &RunConfig,
    ctx: &GithubContext,
    api: &dyn SessionApi,
    sink: &dyn ActionSink,
) -> Result<RunOutcome> {
    let mut tracker = StageTracker::new();
    run_stages(&mut tracker, config, ctx, api, sink)
        .await
        .map_err(|e| tracker.fail(e))
}

async fn run_stages(
    tracker: &mut StageTracker,
    config: &RunConfig,
    ctx: &GithubContext,
    api: &dyn SessionApi,
    sink: &dyn ActionSink,
) -> Result<RunOutcome> {
    let artifacts = ArtifactSet::verify(&config.target_path)?;
    tracker.advance(WorkflowStage::Verified);

    let metadata = read_manifest_metadata(&artifacts.manifest.path)?;
    tracker.advance(WorkflowStage::AdapterExtracted);

    let session = touch_session(api, ctx, &metadata.adapter_type).await?;
    tracker.advance(WorkflowStage::SessionObtained);

    upload_artifacts(api, &artifacts, &session).await?;
    tracker.advance(WorkflowStage::Uploaded);

    notify_completion(api, ctx, &session.session_id).await?;
    tracker.advance(WorkflowStage::Notified);

    report_success(sink, config, ctx, &session.session_id)?;
    tracker.advance(WorkflowStage::Reported);

    let launch_url = match ctx.trigger {
        TriggerContext::PullRequest { .. } => Some(config.launch_url(&session.session_id)),
        TriggerContext::Push { .. } => None,
    };

    Ok(RunOutcome {
        session_id: session.session_id,
        trigger: ctx.trigger.kind(),
        launch_url,
        stage: tracker.stage,
    })
}

/// Run the workflow and report any failure to the sink.
pub async fn execute(
    config: &RunConfig,
    ctx: &GithubContext,
    api: &dyn SessionApi,
    sink: &dyn ActionSink,
) -> Result<RunOutcome> {
    match run(config, ctx, api, sink).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            report_failure(sink, &err);
            Err(err)
        }
    }
}
