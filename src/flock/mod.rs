mod config;
mod context;
mod orchestrator;

pub use config::FlockConfig;
pub use context::{AgentRunRecord, FlockContext};
pub use orchestrator::Flock;
