use async_trait::async_trait;
use serde_json::{Map, Value};

use super::Agent;
use crate::error::{FlockError, Result};
use crate::flock::FlockContext;

/// Lifecycle hooks attached to an agent
///
/// Hooks run in the order the modules were added. An error from any hook
/// other than `on_error` fails the run.
#[async_trait]
pub trait Module: Send + Sync {
    /// Unique per agent; adding a module with the same name replaces it
    fn name(&self) -> &str;

    /// Agent step is starting, inputs resolved
    async fn on_initialize(
        &self,
        _agent: &Agent,
        _inputs: &Map<String, Value>,
        _context: &FlockContext,
    ) -> Result<()> {
        Ok(())
    }

    /// May rewrite the inputs handed to the evaluator
    async fn on_pre_evaluate(
        &self,
        _agent: &Agent,
        _inputs: &mut Map<String, Value>,
        _context: &FlockContext,
    ) -> Result<()> {
        Ok(())
    }

    /// May rewrite the evaluator's outputs
    async fn on_post_evaluate(
        &self,
        _agent: &Agent,
        _inputs: &Map<String, Value>,
        _context: &FlockContext,
        _outputs: &mut Map<String, Value>,
    ) -> Result<()> {
        Ok(())
    }

    /// Agent step finished successfully
    async fn on_terminate(
        &self,
        _agent: &Agent,
        _inputs: &Map<String, Value>,
        _context: &FlockContext,
        _outputs: &Map<String, Value>,
    ) -> Result<()> {
        Ok(())
    }

    /// Evaluation failed; the error is still returned to the caller
    async fn on_error(
        &self,
        _agent: &Agent,
        _inputs: &Map<String, Value>,
        _context: &FlockContext,
        _error: &FlockError,
    ) {
    }
}
