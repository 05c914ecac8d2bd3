use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::router::{DefaultRouterConfig, Router};
use crate::workflow::ActivityConfig;

use super::{Evaluator, FieldSpec, Module, TemplateEvaluator};

/// Anything that can be plugged into an agent slot
pub enum Component {
    Router(Arc<dyn Router>),
    Module(Arc<dyn Module>),
    #[allow(dead_code)]
    Evaluator(Arc<dyn Evaluator>),
}

impl Component {
    pub fn module<M: Module + 'static>(module: M) -> Self {
        Self::Module(Arc::new(module))
    }

    #[allow(dead_code)]
    pub fn evaluator<E: Evaluator + 'static>(evaluator: E) -> Self {
        Self::Evaluator(Arc::new(evaluator))
    }
}

impl From<DefaultRouterConfig> for Component {
    fn from(router: DefaultRouterConfig) -> Self {
        Self::Router(Arc::new(router))
    }
}

/// A declarative agent: named inputs in, named outputs out
pub struct Agent {
    pub name: String,
    pub description: String,
    /// Inherited from the Flock when unset
    pub model: Option<String>,
    pub inputs: Vec<FieldSpec>,
    pub outputs: Vec<FieldSpec>,
    pub evaluator: Arc<dyn Evaluator>,
    pub router: Option<Arc<dyn Router>>,
    pub modules: Vec<Arc<dyn Module>>,
    /// Overrides the workflow's default activity config under durable execution
    pub activity_config: Option<ActivityConfig>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("model", &self.model)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("has_router", &self.router.is_some())
            .field(
                "modules",
                &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("activity_config", &self.activity_config)
            .finish()
    }
}

impl Agent {
    /// Attach a component. Routers and evaluators replace the current one,
    /// modules replace a module of the same name or are appended
    pub fn add_component(&mut self, component: impl Into<Component>) {
        match component.into() {
            Component::Router(router) => self.router = Some(router),
            Component::Evaluator(evaluator) => self.evaluator = evaluator,
            Component::Module(module) => {
                match self.modules.iter_mut().find(|m| m.name() == module.name()) {
                    Some(existing) => *existing = module,
                    None => self.modules.push(module),
                }
            }
        }
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|f| f.name.as_str())
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|f| f.name.as_str())
    }
}

/// Entry point for building agents with sensible defaults
pub struct AgentFactory;

impl AgentFactory {
    /// Agent with a template evaluator and no router
    pub fn create_default_agent(
        name: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> AgentBuilder {
        AgentBuilder {
            name: name.into(),
            description: String::new(),
            model: None,
            input: input.into(),
            output: output.into(),
            evaluator: None,
            router: None,
            activity_config: None,
        }
    }
}

pub struct AgentBuilder {
    name: String,
    description: String,
    model: Option<String>,
    input: String,
    output: String,
    evaluator: Option<Arc<dyn Evaluator>>,
    router: Option<Arc<dyn Router>>,
    activity_config: Option<ActivityConfig>,
}

impl AgentBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[allow(dead_code)]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn evaluator<E: Evaluator + 'static>(mut self, evaluator: E) -> Self {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    #[allow(dead_code)]
    pub fn router<R: Router + 'static>(mut self, router: R) -> Self {
        self.router = Some(Arc::new(router));
        self
    }

    pub fn activity_config(mut self, config: ActivityConfig) -> Self {
        self.activity_config = Some(config);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let inputs = FieldSpec::parse_list(&self.input)?;
        let outputs = FieldSpec::parse_list(&self.output)?;
        if let Some(config) = &self.activity_config {
            config.validate()?;
        }

        Ok(Agent {
            name: self.name,
            description: self.description,
            model: self.model,
            inputs,
            outputs,
            evaluator: self
                .evaluator
                .unwrap_or_else(|| Arc::new(TemplateEvaluator::new())),
            router: self.router,
            modules: Vec::new(),
            activity_config: self.activity_config,
        })
    }
}
