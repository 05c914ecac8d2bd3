use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::Agent;

/// Error raised by an evaluator
///
/// `error_type` is the name matched against a retry policy's non-retryable types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationError {
    pub error_type: String,
    pub message: String,
}

impl EvaluationError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

impl std::error::Error for EvaluationError {}

/// Turns an agent's resolved inputs into its outputs
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        agent: &Agent,
        inputs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, EvaluationError>;
}

/// Deterministic evaluator rendering each output from a template
///
/// Templates use `{field}` placeholders filled from the inputs. Outputs
/// without a template render as `<output> for <inputs>`.
#[derive(Debug, Clone, Default)]
pub struct TemplateEvaluator {
    templates: HashMap<String, String>,
}

impl TemplateEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, output: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(output.into(), template.into());
        self
    }

    fn render(template: &str, inputs: &Map<String, Value>) -> Result<String, EvaluationError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                EvaluationError::new("ValueError", format!("unclosed placeholder in `{}`", template))
            })?;
            let key = after[..close].trim();
            let value = inputs.get(key).ok_or_else(|| {
                EvaluationError::new("ValueError", format!("unknown placeholder `{}`", key))
            })?;
            out.push_str(&value_text(value));
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn fallback(output: &str, inputs: &Map<String, Value>) -> String {
        let joined = inputs.values().map(value_text).collect::<Vec<_>>().join("; ");
        format!("{} for {}", output, joined)
    }
}

#[async_trait]
impl Evaluator for TemplateEvaluator {
    async fn evaluate(
        &self,
        agent: &Agent,
        inputs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, EvaluationError> {
        let mut outputs = Map::new();
        for field in &agent.outputs {
            let text = match self.templates.get(&field.name) {
                Some(template) => Self::render(template, inputs)?,
                None => Self::fallback(&field.name, inputs),
            };
            outputs.insert(field.name.clone(), Value::String(text));
        }
        Ok(outputs)
    }
}

/// Strings render bare, everything else as JSON
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentFactory;
    use serde_json::json;

    fn inputs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_template_renders_placeholders() {
        let agent = AgentFactory::create_default_agent("a", "topic", "title")
            .build()
            .unwrap();
        let evaluator = TemplateEvaluator::new().with_template("title", "All about {topic}!");

        let out = evaluator
            .evaluate(&agent, &inputs(json!({"topic": "ducks"})))
            .await
            .unwrap();
        assert_eq!(out["title"], "All about ducks!");
    }

    #[tokio::test]
    async fn test_fallback_covers_every_output() {
        let agent = AgentFactory::create_default_agent("a", "topic", "title, headers")
            .build()
            .unwrap();
        let out = TemplateEvaluator::new()
            .evaluate(&agent, &inputs(json!({"topic": "ducks"})))
            .await
            .unwrap();
        assert_eq!(out["title"], "title for ducks");
        assert_eq!(out["headers"], "headers for ducks");
    }

    #[tokio::test]
    async fn test_unknown_placeholder_is_value_error() {
        let agent = AgentFactory::create_default_agent("a", "topic", "title")
            .build()
            .unwrap();
        let evaluator = TemplateEvaluator::new().with_template("title", "{missing}");

        let err = evaluator
            .evaluate(&agent, &inputs(json!({"topic": "ducks"})))
            .await
            .unwrap_err();
        assert_eq!(err.error_type, "ValueError");
        assert!(err.message.contains("missing"));
    }

    #[test]
    fn test_non_string_values_render_as_json() {
        let rendered =
            TemplateEvaluator::render("{n} items", &inputs(json!({"n": 3}))).unwrap();
        assert_eq!(rendered, "3 items");
    }
}
