use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One finished agent step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunRecord {
    pub agent: String,
    pub inputs: Map<String, Value>,
    pub outputs: Map<String, Value>,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Shared state of a single run
#[derive(Debug, Clone)]
pub struct FlockContext {
    run_id: String,
    /// Run input plus every output so far, both as `field` and `agent.field`
    state: Map<String, Value>,
    history: Vec<AgentRunRecord>,
}

impl FlockContext {
    pub fn new(input: Map<String, Value>) -> Self {
        Self {
            run_id: format!("flock-{}", Uuid::new_v4()),
            state: input,
            history: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    #[allow(dead_code)]
    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    /// Later outputs overwrite earlier ones under the plain key
    pub fn set_outputs(&mut self, agent: &str, outputs: &Map<String, Value>) {
        for (key, value) in outputs {
            self.state
                .insert(format!("{}.{}", agent, key), value.clone());
            self.state.insert(key.clone(), value.clone());
        }
    }

    pub fn record(&mut self, record: AgentRunRecord) {
        self.history.push(record);
    }

    #[allow(dead_code)]
    pub fn history(&self) -> &[AgentRunRecord] {
        &self.history
    }

    #[allow(dead_code)]
    pub fn last_agent(&self) -> Option<&str> {
        self.history.last().map(|r| r.agent.as_str())
    }

    pub fn into_history(self) -> Vec<AgentRunRecord> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_context_seeded_with_input() {
        let ctx = FlockContext::new(map(json!({"topic": "ducks"})));
        assert!(ctx.run_id().starts_with("flock-"));
        assert_eq!(ctx.get("topic").unwrap(), "ducks");
        assert!(ctx.history().is_empty());
        assert!(ctx.last_agent().is_none());
    }

    #[test]
    fn test_outputs_stored_plain_and_qualified() {
        let mut ctx = FlockContext::new(Map::new());
        ctx.set_outputs("idea_agent", &map(json!({"idea": "duck racing"})));

        assert_eq!(ctx.get("idea").unwrap(), "duck racing");
        assert_eq!(ctx.get("idea_agent.idea").unwrap(), "duck racing");
    }

    #[test]
    fn test_later_outputs_shadow_plain_key() {
        let mut ctx = FlockContext::new(Map::new());
        ctx.set_outputs("a", &map(json!({"x": 1})));
        ctx.set_outputs("b", &map(json!({"x": 2})));

        assert_eq!(ctx.get("x").unwrap(), 2);
        assert_eq!(ctx.get("a.x").unwrap(), 1);
        assert_eq!(ctx.state().len(), 3);
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = FlockContext::new(Map::new());
        let b = FlockContext::new(Map::new());
        assert_ne!(a.run_id(), b.run_id());
    }
}
