//! Job summary rendering for success and failure.

use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::context::{GithubContext, TriggerContext};
use crate::error::{ActionError, Result};
use crate::sink::ActionSink;

/// Name of the step output carrying the session id.
pub const SESSION_ID_OUTPUT: &str = "session_id";

/// Render the success summary for a run.
pub fn render_success_summary(
    config: &RunConfig,
    ctx: &GithubContext,
    session_id: &str,
) -> String {
    let mut out = String::new();
    match &ctx.trigger {
        TriggerContext::PullRequest { branch, pr_number } => {
            let url = config.launch_url(session_id);
            out.push_str("## Recce Cloud session is ready\n\n");
            out.push_str(&format!(
                "Artifacts for pull request #{} (`{}`) were uploaded to Recce Cloud.\n\n",
                pr_number, branch
            ));
            out.push_str(&format!("[Launch Recce]({url})\n\n"));
            out.push_str(&format!("- Session ID: `{}`\n", session_id));
        }
        TriggerContext::Push { branch } => {
            out.push_str("## Recce Cloud base session updated\n\n");
            out.push_str(&format!(
                "Artifacts for branch `{}` of `{}` were uploaded to Recce Cloud.\n",
                branch, ctx.repository
            ));
        }
    }
    out
}

/// Publish the success summary and, for pull requests, the session id
/// output.
pub fn report_success(
    sink: &dyn ActionSink,
    config: &RunConfig,
    ctx: &GithubContext,
    session_id: &str,
) -> Result<()> {
    sink.append_summary(&render_success_summary(config, ctx, session_id))?;

    match &ctx.trigger {
        TriggerContext::PullRequest { .. } => {
            sink.set_output(SESSION_ID_OUTPUT, session_id)?;
            info!(
                session_id,
                url = %config.launch_url(session_id),
                "Recce session is ready"
            );
        }
        TriggerContext::Push { branch } => {
            info!(branch = %branch, "Base session updated");
        }
    }
    Ok(())
}

/// Render the failure block: title, message, and a table of the error's
/// diagnostic context.
pub fn render_failure_summary(err: &ActionError) -> String {
    let mut out = String::new();
    out.push_str(&format!("## :x: {}\n\n", err.title()));
    out.push_str(&format!("{}\n", err));

    let context = err.context();
    if !context.is_empty() {
        out.push_str("\n| | |\n|---|---|\n");
        for (key, value) in context {
            out.push_str(&format!("| {} | `{}` |\n", key, value.replace('|', "\\|")));
        }
    }
    out
}

/// Log a terminal error and render it to the sink.
///
/// Sink failures are logged and otherwise ignored so they never mask the
/// original error.
pub fn report_failure(sink: &dyn ActionSink, err: &ActionError) {
    let context = err.context();
    error!(error = %err, context = ?context, "Recce Cloud upload failed");

    sink.annotate_error(&err.to_string());
    if let Err(sink_err) = sink.append_summary(&render_failure_summary(err)) {
        warn!(error = %sink_err, "Failed to write failure summary");
    }
}
