mod agent;
mod error;
mod flock;
mod router;
mod workflow;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde_json::{Map, Value};
use tracing_subscriber::{prelude::*, EnvFilter};

use agent::{AgentFactory, TemplateEvaluator};
use flock::{Flock, FlockConfig};
use router::DefaultRouterConfig;
use workflow::{ActivityConfig, RetryPolicyConfig, WorkflowConfig};

const START_AGENT: &str = "my_presentation_agent";
const DEFAULT_TOPIC: &str =
    "A presentation about how good of an idea it is to combine ai agents with temporal.io";

/// Two agents linked by a hand-off, run under durable execution policies
#[derive(Debug, Parser)]
#[command(name = "flock", version, about)]
struct Cli {
    /// Flock config file (JSON). Replaces the built-in demo config.
    /// Defaults to `flock/config.json` in the user config dir, when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Presentation topic
    #[arg(long, default_value = DEFAULT_TOPIC)]
    topic: String,

    /// Run agents directly, without activity timeouts or retries
    #[arg(long)]
    local: bool,
}

/// Task queue, workflow timeout and default retry policy for the demo
fn demo_config() -> FlockConfig {
    FlockConfig {
        enable_temporal: true,
        temporal_config: WorkflowConfig::default()
            .with_task_queue("flock-test-queue")
            .with_workflow_execution_timeout(Duration::from_secs(10 * 60))
            .with_default_activity_retry_policy(
                RetryPolicyConfig::default().with_maximum_attempts(2),
            ),
        ..FlockConfig::default()
    }
}

fn build_flock(config: FlockConfig) -> anyhow::Result<Flock> {
    let mut flock = Flock::new(config);

    let agent = AgentFactory::create_default_agent(
        START_AGENT,
        "topic",
        "funny_title, funny_slide_headers",
    )
    .description("Comes up with a funny title and slide headers for a presentation")
    .evaluator(
        TemplateEvaluator::new()
            .with_template("funny_title", "{topic}: What Could Possibly Go Wrong?")
            .with_template(
                "funny_slide_headers",
                "1. Why? | 2. Why Not? | 3. Retrying Until It Works | 4. Questions Nobody Can Answer",
            ),
    )
    .build()?;
    flock.add_agent(agent)?;

    let content_agent = AgentFactory::create_default_agent(
        "content_agent",
        "funny_title, funny_slide_headers",
        "funny_slide_content",
    )
    .description("Writes the content for each slide")
    .evaluator(TemplateEvaluator::new().with_template(
        "funny_slide_content",
        "Slides for \"{funny_title}\": {funny_slide_headers}",
    ))
    .activity_config(
        ActivityConfig::default()
            .with_start_to_close_timeout(Duration::from_secs(60))
            .with_retry_policy(
                RetryPolicyConfig::default()
                    .with_maximum_attempts(4)
                    .with_initial_interval(Duration::from_secs(2))
                    .with_non_retryable_error_types(["ValueError"]),
            ),
    )
    .build()?;
    flock.add_agent(content_agent)?;

    flock
        .agent_mut(START_AGENT)?
        .add_component(DefaultRouterConfig::hand_off("content_agent"));

    Ok(flock)
}

/// Explicit file, else the default file if it exists, else the demo config
fn resolve_config(explicit: Option<&Path>, fallback: Option<PathBuf>) -> anyhow::Result<FlockConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => fallback.filter(|path| path.exists()),
    };
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading flock config");
            FlockConfig::load(&path)
        }
        None => Ok(demo_config()),
    }
}

/// `durable` applies activity timeouts and retry policies, `local` runs each agent once
fn execution_mode(config: &FlockConfig) -> &'static str {
    if config.enable_temporal {
        "durable"
    } else {
        "local"
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = resolve_config(cli.config.as_deref(), FlockConfig::default_path())?;
    if cli.local {
        config.enable_temporal = false;
    }
    tracing::info!(
        mode = execution_mode(&config),
        task_queue = %config.temporal_config.task_queue,
        "execution mode selected"
    );

    let flock = build_flock(config)?;
    tracing::debug!(agents = ?flock.agent_names(), "flock ready");

    println!(
        "Starting Flock run on Temporal task queue: {}",
        flock.config().temporal_config.task_queue
    );

    let mut input = Map::new();
    input.insert("topic".into(), Value::String(cli.topic));
    let result = flock
        .run_async(START_AGENT, input)
        .await
        .context("Flock run failed")?;

    println!("\n--- Result ---");
    println!("{}", result);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .init();

    let cli = Cli::parse();
    println!("Ensure a Temporal worker is running and listening on the specified task queue(s).");
    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["flock"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.local);
        assert_eq!(cli.topic, DEFAULT_TOPIC);
    }

    #[test]
    fn test_demo_config() {
        let config = demo_config();
        assert!(config.enable_temporal);
        assert_eq!(config.temporal_config.task_queue, "flock-test-queue");
        assert_eq!(
            config.temporal_config.workflow_execution_timeout,
            Some(Duration::from_secs(600))
        );
        assert_eq!(
            config.temporal_config.default_activity_retry_policy.maximum_attempts,
            2
        );
    }

    #[test]
    fn test_resolve_config_prefers_explicit_then_default_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let explicit = temp_dir.path().join("explicit.json");
        let fallback = temp_dir.path().join("config.json");
        std::fs::write(&explicit, r#"{ "flock": { "name": "explicit" } }"#).unwrap();
        std::fs::write(&fallback, r#"{ "flock": { "name": "from_default_dir" } }"#).unwrap();

        let config = resolve_config(Some(explicit.as_path()), Some(fallback.clone())).unwrap();
        assert_eq!(config.name, "explicit");

        let config = resolve_config(None, Some(fallback)).unwrap();
        assert_eq!(config.name, "from_default_dir");
    }

    #[test]
    fn test_resolve_config_falls_back_to_demo() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("config.json");

        assert_eq!(resolve_config(None, Some(missing)).unwrap(), demo_config());
        assert_eq!(resolve_config(None, None).unwrap(), demo_config());
    }

    #[test]
    fn test_execution_mode_follows_local_flag() {
        let mut config = demo_config();
        assert_eq!(execution_mode(&config), "durable");

        let cli = Cli::try_parse_from(["flock", "--local"]).unwrap();
        assert!(cli.local);
        config.enable_temporal = !cli.local;
        assert_eq!(execution_mode(&config), "local");
    }

    #[test]
    fn test_demo_agents_linked() {
        let flock = build_flock(demo_config()).unwrap();
        assert_eq!(flock.agent_names(), vec!["content_agent", START_AGENT]);
        assert!(flock.agent(START_AGENT).unwrap().router.is_some());

        let content = flock.agent("content_agent").unwrap();
        let activity = content.activity_config.as_ref().unwrap();
        assert_eq!(activity.start_to_close_timeout, Duration::from_secs(60));
        let policy = activity.retry_policy.as_ref().unwrap();
        assert_eq!(policy.maximum_attempts, 4);
        assert_eq!(policy.initial_interval, Duration::from_secs(2));
        assert!(!policy.is_retryable("ValueError"));
    }

    #[tokio::test]
    async fn test_demo_run_reaches_content_agent() {
        let flock = build_flock(demo_config()).unwrap();
        let mut input = Map::new();
        input.insert("topic".into(), Value::from("Ducks"));

        let result = flock.run_async(START_AGENT, input).await.unwrap();
        assert_eq!(result.last_agent, "content_agent");
        assert_eq!(
            result.outputs["funny_slide_content"],
            "Slides for \"Ducks: What Could Possibly Go Wrong?\": 1. Why? | 2. Why Not? | 3. Retrying Until It Works | 4. Questions Nobody Can Answer"
        );
    }
}
