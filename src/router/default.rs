use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{HandOffRequest, MergeStrategy, Router};
use crate::agent::Agent;
use crate::error::Result;
use crate::flock::FlockContext;

type HandOffFn = dyn Fn(&FlockContext, &Map<String, Value>) -> Option<HandOffRequest> + Send + Sync;

/// Where the default router sends the run next
#[derive(Clone)]
pub enum HandOff {
    /// Fixed agent name. Empty means stop
    Static(String),
    /// Computed from the context and the finished agent's outputs
    Dynamic(Arc<HandOffFn>),
}

impl fmt::Debug for HandOff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(name) => f.debug_tuple("Static").field(name).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Router that hands off to a configured agent
#[derive(Debug, Clone)]
pub struct DefaultRouterConfig {
    pub hand_off: HandOff,
    pub merge_strategy: MergeStrategy,
}

impl DefaultRouterConfig {
    pub fn hand_off(next_agent: impl Into<String>) -> Self {
        Self {
            hand_off: HandOff::Static(next_agent.into()),
            merge_strategy: MergeStrategy::default(),
        }
    }

    #[allow(dead_code)]
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&FlockContext, &Map<String, Value>) -> Option<HandOffRequest> + Send + Sync + 'static,
    {
        Self {
            hand_off: HandOff::Dynamic(Arc::new(f)),
            merge_strategy: MergeStrategy::default(),
        }
    }

    #[allow(dead_code)]
    pub fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }
}

impl Router for DefaultRouterConfig {
    fn route(
        &self,
        agent: &Agent,
        outputs: &Map<String, Value>,
        context: &FlockContext,
    ) -> Result<Option<HandOffRequest>> {
        let request = match &self.hand_off {
            HandOff::Static(name) if name.trim().is_empty() => None,
            HandOff::Static(name) => Some(HandOffRequest {
                next_agent: name.clone(),
                merge_strategy: self.merge_strategy,
            }),
            HandOff::Dynamic(f) => f(context, outputs),
        };

        if let Some(req) = &request {
            tracing::debug!(from = %agent.name, to = %req.next_agent, "hand-off");
        }
        Ok(request)
    }
}
