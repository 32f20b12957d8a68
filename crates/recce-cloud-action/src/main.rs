//! Recce Cloud Action - upload dbt artifacts to a Recce Cloud session
//!
//! Intended to run as a CI step. Inputs arrive as `INPUT_*` environment
//! variables (the GitHub Actions convention) or as command-line flags.

use anyhow::Result;
use clap::Parser;
use recce_cloud_core::{
    execute, init_tracing, report_failure, ActionError, ActionInputs, ActionSink, ClientConfig,
    EnvSnapshot, GithubActionsSink, GithubContext, LogFormat, RecceCloudClient, RunConfig,
};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "recce-cloud-action")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Upload dbt artifacts to a Recce Cloud review session", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Directory containing manifest.json and catalog.json
    #[arg(long, env = "INPUT_DBT_TARGET_PATH")]
    dbt_target_path: Option<String>,

    /// Base branch of the repository (default: main)
    #[arg(long, env = "INPUT_BASE_BRANCH")]
    base_branch: Option<String>,

    /// Recce Cloud API host
    #[arg(long, env = "INPUT_API_HOST")]
    api_host: Option<String>,

    /// Recce Cloud web host used for launch links
    #[arg(long, env = "INPUT_WEB_HOST")]
    web_host: Option<String>,

    /// API token; GITHUB_TOKEN in the environment takes precedence
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,
}

impl Cli {
    fn inputs(&self) -> ActionInputs {
        ActionInputs {
            dbt_target_path: self.dbt_target_path.clone(),
            base_branch: self.base_branch.clone(),
            api_host: self.api_host.clone(),
            web_host: self.web_host.clone(),
            github_token: self.github_token.clone(),
        }
    }
}

/// Resolve configuration and context from the captured environment.
fn prepare(cli: &Cli, env: &EnvSnapshot) -> recce_cloud_core::Result<(RunConfig, GithubContext)> {
    let config = RunConfig::resolve(&cli.inputs(), env)?;
    let ctx = GithubContext::from_env(env, &config.base_branch)?;
    Ok((config, ctx))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(format, level);

    let env = EnvSnapshot::capture();
    let sink = GithubActionsSink::from_env(&env);

    let (config, ctx) = match prepare(&cli, &env) {
        Ok(prepared) => prepared,
        Err(err) => fail(&sink, err),
    };
    info!(
        repository = %ctx.repository,
        event = %ctx.event_name,
        target_path = %config.target_path.display(),
        "Starting Recce Cloud upload"
    );

    let client = match RecceCloudClient::new(ClientConfig::from_run_config(&config)) {
        Ok(client) => client,
        Err(err) => anyhow::bail!("failed to build HTTP client: {err}"),
    };

    match execute(&config, &ctx, &client, &sink).await {
        Ok(outcome) => {
            info!(session_id = %outcome.session_id, stage = %outcome.stage, "Done");
            Ok(())
        }
        // Already reported by `execute`.
        Err(_) => std::process::exit(1),
    }
}

fn fail(sink: &dyn ActionSink, err: ActionError) -> ! {
    report_failure(sink, &err);
    std::process::exit(1)
}
