mod default;

pub use default::DefaultRouterConfig;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::Agent;
use crate::error::Result;
use crate::flock::FlockContext;

/// How the next agent receives the previous agent's outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Next agent draws its declared inputs by name from the context
    #[default]
    Match,
    /// Every output of the previous agent is also passed along, declared or not
    Add,
}

/// Request to continue the run with another agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandOffRequest {
    pub next_agent: String,
    pub merge_strategy: MergeStrategy,
}

impl HandOffRequest {
    #[allow(dead_code)]
    pub fn to(next_agent: impl Into<String>) -> Self {
        Self {
            next_agent: next_agent.into(),
            merge_strategy: MergeStrategy::default(),
        }
    }

    #[allow(dead_code)]
    pub fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }
}

/// Decides which agent, if any, runs after `agent`
pub trait Router: Send + Sync {
    /// `Ok(None)` ends the run
    fn route(
        &self,
        agent: &Agent,
        outputs: &Map<String, Value>,
        context: &FlockContext,
    ) -> Result<Option<HandOffRequest>>;
}
