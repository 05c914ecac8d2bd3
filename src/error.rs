use std::time::Duration;

use thiserror::Error;

use crate::agent::EvaluationError;

pub type Result<T> = std::result::Result<T, FlockError>;

#[derive(Error, Debug)]
pub enum FlockError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent already registered: {0}")]
    DuplicateAgent(String),

    #[error("Invalid signature `{signature}`: {reason}")]
    InvalidSignature { signature: String, reason: String },

    #[error("Agent `{agent}` is missing input `{field}`")]
    MissingInput { agent: String, field: String },

    #[error("Agent `{agent}` did not produce output `{field}`")]
    MissingOutput { agent: String, field: String },

    #[error("Agent `{agent}` failed: {source}")]
    Evaluation {
        agent: String,
        #[source]
        source: EvaluationError,
    },

    #[error("Activity `{agent}` timed out after {timeout:?}")]
    ActivityTimeout { agent: String, timeout: Duration },

    #[error("Activity `{agent}` failed with non-retryable {source}")]
    NonRetryable {
        agent: String,
        #[source]
        source: EvaluationError,
    },

    #[error("Activity `{agent}` gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        agent: String,
        attempts: u32,
        last: String,
    },

    #[error("Workflow timed out after {0:?}")]
    WorkflowTimeout(Duration),

    #[error("Max agent iterations ({0}) exceeded")]
    MaxIterationsExceeded(usize),

    #[error("Routing error: {0}")]
    Routing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = FlockError::AgentNotFound("content_agent".into());
        assert_eq!(err.to_string(), "Agent not found: content_agent");

        let err = FlockError::MissingInput {
            agent: "content_agent".into(),
            field: "funny_title".into(),
        };
        assert_eq!(
            err.to_string(),
            "Agent `content_agent` is missing input `funny_title`"
        );

        let err = FlockError::MaxIterationsExceeded(20);
        assert_eq!(err.to_string(), "Max agent iterations (20) exceeded");
    }

    #[test]
    fn evaluation_error_keeps_source() {
        let err = FlockError::Evaluation {
            agent: "a".into(),
            source: EvaluationError::new("ValueError", "bad topic"),
        };
        assert_eq!(err.to_string(), "Agent `a` failed: ValueError: bad topic");
        assert!(std::error::Error::source(&err).is_some());
    }
}
