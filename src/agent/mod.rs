mod definition;
mod evaluator;
mod module;
mod signature;

pub use definition::{Agent, AgentFactory, Component};
pub use evaluator::{EvaluationError, Evaluator, TemplateEvaluator};
pub use module::Module;
pub use signature::FieldSpec;
