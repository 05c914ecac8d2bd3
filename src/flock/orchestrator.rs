use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{AgentRunRecord, FlockConfig, FlockContext};
use crate::agent::Agent;
use crate::error::{FlockError, Result};
use crate::router::MergeStrategy;
use crate::workflow::{ActivityExecutor, DirectExecutor, PolicyExecutor};

/// Final result of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: String,
    /// Agent whose outputs are `outputs`
    pub last_agent: String,
    pub outputs: Map<String, Value>,
    pub history: Vec<AgentRunRecord>,
}

impl RunResult {
    #[allow(dead_code)]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.outputs.get(field)
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = serde_json::to_string_pretty(&self.outputs).map_err(|_| fmt::Error)?;
        f.write_str(&body)
    }
}

/// Registry of agents plus the loop that runs them
pub struct Flock {
    config: FlockConfig,
    agents: HashMap<String, Agent>,
}

impl Flock {
    pub fn new(config: FlockConfig) -> Self {
        Self {
            config,
            agents: HashMap::new(),
        }
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    /// Register an agent. Agents without a model inherit the Flock's
    pub fn add_agent(&mut self, mut agent: Agent) -> Result<()> {
        if self.agents.contains_key(&agent.name) {
            return Err(FlockError::DuplicateAgent(agent.name));
        }
        if agent.model.is_none() {
            agent.model = self.config.model.clone();
        }
        debug!(agent = %agent.name, "agent registered");
        self.agents.insert(agent.name.clone(), agent);
        Ok(())
    }

    #[allow(dead_code)]
    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.get(name)
    }

    /// For attaching components after registration
    pub fn agent_mut(&mut self, name: &str) -> Result<&mut Agent> {
        self.agents
            .get_mut(name)
            .ok_or_else(|| FlockError::AgentNotFound(name.to_string()))
    }

    /// Registered agent names, sorted
    pub fn agent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Run from `start_agent` until a router stops handing off
    ///
    /// With `enable_temporal`, each agent runs under its activity timeout and
    /// retry policy and the whole run under the workflow execution timeout.
    pub async fn run_async(&self, start_agent: &str, input: Map<String, Value>) -> Result<RunResult> {
        if !self.agents.contains_key(start_agent) {
            return Err(FlockError::AgentNotFound(start_agent.to_string()));
        }

        self.config.validate()?;

        if !self.config.enable_temporal {
            info!(flock = %self.config.name, "starting local run");
            return self.run_agents(&DirectExecutor, start_agent, input).await;
        }

        let workflow = &self.config.temporal_config;
        info!(
            flock = %self.config.name,
            task_queue = %workflow.task_queue,
            "starting durable run"
        );

        let executor = PolicyExecutor::new(workflow);
        let run = self.run_agents(&executor, start_agent, input);
        match workflow.workflow_execution_timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| FlockError::WorkflowTimeout(limit))?,
            None => run.await,
        }
    }

    async fn run_agents(
        &self,
        executor: &dyn ActivityExecutor,
        start_agent: &str,
        input: Map<String, Value>,
    ) -> Result<RunResult> {
        let mut context = FlockContext::new(input);
        let mut current = start_agent.to_string();
        let mut carried = Map::new();

        for step in 0..self.config.max_agent_iterations {
            let agent = self
                .agents
                .get(&current)
                .ok_or_else(|| FlockError::AgentNotFound(current.clone()))?;

            let mut inputs = resolve_inputs(agent, &context, std::mem::take(&mut carried))?;

            info!(run_id = %context.run_id(), agent = %agent.name, step, "agent started");
            let started_at = Utc::now();
            for module in &agent.modules {
                module.on_initialize(agent, &inputs, &context).await?;
            }
            for module in &agent.modules {
                module.on_pre_evaluate(agent, &mut inputs, &context).await?;
            }

            let mut outcome = match executor.execute(agent, &inputs).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    for module in &agent.modules {
                        module.on_error(agent, &inputs, &context, &err).await;
                    }
                    return Err(err);
                }
            };

            for module in &agent.modules {
                module
                    .on_post_evaluate(agent, &inputs, &context, &mut outcome.outputs)
                    .await?;
            }

            if let Some(missing) = agent
                .output_names()
                .find(|name| !outcome.outputs.contains_key(*name))
            {
                return Err(FlockError::MissingOutput {
                    agent: agent.name.clone(),
                    field: missing.to_string(),
                });
            }

            context.set_outputs(&agent.name, &outcome.outputs);
            for module in &agent.modules {
                module
                    .on_terminate(agent, &inputs, &context, &outcome.outputs)
                    .await?;
            }
            context.record(AgentRunRecord {
                agent: agent.name.clone(),
                inputs,
                outputs: outcome.outputs.clone(),
                attempts: outcome.attempts,
                started_at,
                completed_at: Utc::now(),
            });
            info!(
                run_id = %context.run_id(),
                agent = %agent.name,
                attempts = outcome.attempts,
                "agent completed"
            );

            let next = match &agent.router {
                Some(router) => router.route(agent, &outcome.outputs, &context)?,
                None => None,
            };

            let Some(hand_off) = next else {
                return Ok(RunResult {
                    run_id: context.run_id().to_string(),
                    last_agent: agent.name.clone(),
                    outputs: outcome.outputs,
                    history: context.into_history(),
                });
            };

            if !self.agents.contains_key(&hand_off.next_agent) {
                return Err(FlockError::Routing(format!(
                    "`{}` handed off to unknown agent `{}`",
                    agent.name, hand_off.next_agent
                )));
            }
            if hand_off.merge_strategy == MergeStrategy::Add {
                carried = outcome.outputs;
            }
            current = hand_off.next_agent;
        }

        Err(FlockError::MaxIterationsExceeded(
            self.config.max_agent_iterations,
        ))
    }
}

/// Declared inputs from the context, on top of anything carried by the hand-off
fn resolve_inputs(
    agent: &Agent,
    context: &FlockContext,
    mut inputs: Map<String, Value>,
) -> Result<Map<String, Value>> {
    for name in agent.input_names() {
        let value = context.get(name).ok_or_else(|| FlockError::MissingInput {
            agent: agent.name.clone(),
            field: name.to_string(),
        })?;
        inputs.insert(name.to_string(), value.clone());
    }
    Ok(inputs)
}
