mod config;
mod executor;

pub use config::{ActivityConfig, RetryPolicyConfig, WorkflowConfig};
pub use executor::{ActivityExecutor, DirectExecutor, PolicyExecutor};
