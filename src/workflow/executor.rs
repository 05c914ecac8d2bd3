use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{ActivityConfig, RetryPolicyConfig, WorkflowConfig};
use crate::agent::Agent;
use crate::error::{FlockError, Result};

/// Result of one activity, after any retries
#[derive(Debug, Clone)]
pub struct ActivityOutcome {
    pub outputs: Map<String, Value>,
    pub attempts: u32,
}

/// Runs an agent's evaluation as a single activity
#[async_trait]
pub trait ActivityExecutor: Send + Sync {
    async fn execute(&self, agent: &Agent, inputs: &Map<String, Value>) -> Result<ActivityOutcome>;
}

/// One attempt, no timeout, no retries
#[derive(Debug, Clone, Default)]
pub struct DirectExecutor;

#[async_trait]
impl ActivityExecutor for DirectExecutor {
    async fn execute(&self, agent: &Agent, inputs: &Map<String, Value>) -> Result<ActivityOutcome> {
        let outputs = agent
            .evaluator
            .evaluate(agent, inputs)
            .await
            .map_err(|source| FlockError::Evaluation {
                agent: agent.name.clone(),
                source,
            })?;
        Ok(ActivityOutcome {
            outputs,
            attempts: 1,
        })
    }
}

/// Applies activity timeouts and retry policies
#[derive(Debug, Clone)]
pub struct PolicyExecutor {
    default_activity: ActivityConfig,
    default_retry: RetryPolicyConfig,
}

impl PolicyExecutor {
    pub fn new(config: &WorkflowConfig) -> Self {
        Self {
            default_activity: config.default_activity_config.clone(),
            default_retry: config.default_activity_retry_policy.clone(),
        }
    }

    async fn run_attempts(
        &self,
        agent: &Agent,
        inputs: &Map<String, Value>,
        activity: &ActivityConfig,
        policy: &RetryPolicyConfig,
    ) -> Result<ActivityOutcome> {
        let mut attempt = 1;
        loop {
            debug!(agent = %agent.name, attempt, "activity attempt started");

            let result = tokio::time::timeout(
                activity.start_to_close_timeout,
                agent.evaluator.evaluate(agent, inputs),
            )
            .await;

            let failure = match result {
                Ok(Ok(outputs)) => {
                    return Ok(ActivityOutcome {
                        outputs,
                        attempts: attempt,
                    })
                }
                Ok(Err(source)) if !policy.is_retryable(&source.error_type) => {
                    return Err(FlockError::NonRetryable {
                        agent: agent.name.clone(),
                        source,
                    });
                }
                Ok(Err(source)) => source.to_string(),
                Err(_) => format!(
                    "start-to-close timeout after {:?}",
                    activity.start_to_close_timeout
                ),
            };

            if !policy.allows_attempt(attempt + 1) {
                return Err(FlockError::RetriesExhausted {
                    agent: agent.name.clone(),
                    attempts: attempt,
                    last: failure,
                });
            }

            let delay = policy.delay_for_attempt(attempt);
            warn!(
                agent = %agent.name,
                attempt,
                error = %failure,
                retry_in = ?delay,
                "activity attempt failed"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl ActivityExecutor for PolicyExecutor {
    async fn execute(&self, agent: &Agent, inputs: &Map<String, Value>) -> Result<ActivityOutcome> {
        let activity = agent
            .activity_config
            .as_ref()
            .unwrap_or(&self.default_activity);
        let policy = activity.effective_retry_policy(&self.default_retry);

        let attempts = self.run_attempts(agent, inputs, activity, policy);
        match activity.schedule_to_close_timeout {
            Some(limit) => tokio::time::timeout(limit, attempts)
                .await
                .map_err(|_| FlockError::ActivityTimeout {
                    agent: agent.name.clone(),
                    timeout: limit,
                })?,
            None => attempts.await,
        }
    }
}
