use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FlockError, Result};

/// Retry policy applied to an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    /// Delay before the first retry
    #[serde(with = "duration_secs")]
    pub initial_interval: Duration,
    /// Multiplier applied to the delay after each failed attempt
    pub backoff_coefficient: f64,
    /// Upper bound on the delay. `None` means 100x the initial interval
    #[serde(with = "option_duration_secs")]
    pub maximum_interval: Option<Duration>,
    /// Total attempts including the first. 0 = unlimited
    pub maximum_attempts: u32,
    /// Error type names that fail the activity without retrying
    pub non_retryable_error_types: Vec<String>,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: None,
            maximum_attempts: 3,
            non_retryable_error_types: Vec::new(),
        }
    }
}

impl RetryPolicyConfig {
    pub fn with_maximum_attempts(mut self, attempts: u32) -> Self {
        self.maximum_attempts = attempts;
        self
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    #[allow(dead_code)]
    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    #[allow(dead_code)]
    pub fn with_maximum_interval(mut self, interval: Duration) -> Self {
        self.maximum_interval = Some(interval);
        self
    }

    pub fn with_non_retryable_error_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_retryable_error_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Effective cap on the retry delay
    pub fn effective_maximum_interval(&self) -> Duration {
        self.maximum_interval
            .unwrap_or_else(|| self.initial_interval.saturating_mul(100))
    }

    /// Delay to wait after failed attempt `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let cap = self.effective_maximum_interval();
        if !secs.is_finite() || secs >= cap.as_secs_f64() {
            return cap;
        }
        Duration::from_secs_f64(secs)
    }

    /// Whether attempt number `attempt` (1-based) may be started
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.maximum_attempts == 0 || attempt <= self.maximum_attempts
    }

    pub fn is_retryable(&self, error_type: &str) -> bool {
        !self
            .non_retryable_error_types
            .iter()
            .any(|t| t == error_type)
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_interval.is_zero() {
            return Err(FlockError::Config(
                "retry initial_interval must be greater than zero".into(),
            ));
        }
        if self.backoff_coefficient.is_nan() || self.backoff_coefficient < 1.0 {
            return Err(FlockError::Config(format!(
                "retry backoff_coefficient must be >= 1.0, got {}",
                self.backoff_coefficient
            )));
        }
        if let Some(max) = self.maximum_interval {
            if max < self.initial_interval {
                return Err(FlockError::Config(
                    "retry maximum_interval must not be less than initial_interval".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Per-agent activity settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Limit for a single attempt
    #[serde(with = "duration_secs")]
    pub start_to_close_timeout: Duration,
    /// Limit across all attempts, retry delays included
    #[serde(with = "option_duration_secs")]
    pub schedule_to_close_timeout: Option<Duration>,
    /// Falls back to the workflow default when unset
    pub retry_policy: Option<RetryPolicyConfig>,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            start_to_close_timeout: Duration::from_secs(5 * 60),
            schedule_to_close_timeout: None,
            retry_policy: None,
        }
    }
}

impl ActivityConfig {
    pub fn with_start_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = timeout;
        self
    }

    #[allow(dead_code)]
    pub fn with_schedule_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.schedule_to_close_timeout = Some(timeout);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicyConfig) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn effective_retry_policy<'a>(
        &'a self,
        default: &'a RetryPolicyConfig,
    ) -> &'a RetryPolicyConfig {
        self.retry_policy.as_ref().unwrap_or(default)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_to_close_timeout.is_zero() {
            return Err(FlockError::Config(
                "start_to_close_timeout must be greater than zero".into(),
            ));
        }
        if let Some(policy) = &self.retry_policy {
            policy.validate()?;
        }
        Ok(())
    }
}

/// Workflow-wide durable execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub task_queue: String,
    /// Limit for the whole run. `None` = unlimited
    #[serde(with = "option_duration_secs")]
    pub workflow_execution_timeout: Option<Duration>,
    /// Used by agents without their own activity config
    pub default_activity_config: ActivityConfig,
    /// Used by activities without their own retry policy
    pub default_activity_retry_policy: RetryPolicyConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            task_queue: "flock-queue".into(),
            workflow_execution_timeout: None,
            default_activity_config: ActivityConfig::default(),
            default_activity_retry_policy: RetryPolicyConfig::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn with_task_queue(mut self, task_queue: impl Into<String>) -> Self {
        self.task_queue = task_queue.into();
        self
    }

    pub fn with_workflow_execution_timeout(mut self, timeout: Duration) -> Self {
        self.workflow_execution_timeout = Some(timeout);
        self
    }

    pub fn with_default_activity_retry_policy(mut self, policy: RetryPolicyConfig) -> Self {
        self.default_activity_retry_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.task_queue.trim().is_empty() {
            return Err(FlockError::Config("task_queue must not be empty".into()));
        }
        self.default_activity_config.validate()?;
        self.default_activity_retry_policy.validate()
    }
}

/// Durations as fractional seconds
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod option_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults() {
        let policy = RetryPolicyConfig::default();
        assert_eq!(policy.initial_interval, Duration::from_secs(1));
        assert_eq!(policy.backoff_coefficient, 2.0);
        assert_eq!(policy.maximum_attempts, 3);
        assert_eq!(policy.effective_maximum_interval(), Duration::from_secs(100));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicyConfig::default()
            .with_initial_interval(Duration::from_secs(2))
            .with_maximum_interval(Duration::from_secs(10));

        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for_attempt(60), Duration::from_secs(10));
    }

    #[test]
    fn test_allows_attempt() {
        let policy = RetryPolicyConfig::default().with_maximum_attempts(2);
        assert!(policy.allows_attempt(1));
        assert!(policy.allows_attempt(2));
        assert!(!policy.allows_attempt(3));

        let unlimited = RetryPolicyConfig::default().with_maximum_attempts(0);
        assert!(unlimited.allows_attempt(1_000));
    }

    #[test]
    fn test_non_retryable_types() {
        let policy = RetryPolicyConfig::default().with_non_retryable_error_types(["ValueError"]);
        assert!(!policy.is_retryable("ValueError"));
        assert!(policy.is_retryable("TimeoutError"));
    }

    #[test]
    fn test_validate_rejects_bad_policies() {
        let policy = RetryPolicyConfig::default().with_backoff_coefficient(0.5);
        assert!(policy.validate().is_err());

        let policy = RetryPolicyConfig::default().with_initial_interval(Duration::ZERO);
        assert!(policy.validate().is_err());

        let policy = RetryPolicyConfig::default()
            .with_initial_interval(Duration::from_secs(5))
            .with_maximum_interval(Duration::from_secs(1));
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_activity_falls_back_to_workflow_policy() {
        let workflow_default = RetryPolicyConfig::default().with_maximum_attempts(2);
        let activity = ActivityConfig::default();
        assert_eq!(
            activity.effective_retry_policy(&workflow_default).maximum_attempts,
            2
        );

        let activity = activity.with_retry_policy(RetryPolicyConfig::default().with_maximum_attempts(4));
        assert_eq!(
            activity.effective_retry_policy(&workflow_default).maximum_attempts,
            4
        );
    }

    #[test]
    fn test_workflow_config_from_json() {
        let json = r#"{
            "task_queue": "flock-test-queue",
            "workflow_execution_timeout": 600,
            "default_activity_retry_policy": { "maximum_attempts": 2 }
        }"#;
        let config: WorkflowConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.task_queue, "flock-test-queue");
        assert_eq!(config.workflow_execution_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.default_activity_retry_policy.maximum_attempts, 2);
        // Unspecified fields keep their defaults
        assert_eq!(
            config.default_activity_retry_policy.initial_interval,
            Duration::from_secs(1)
        );
        assert_eq!(
            config.default_activity_config.start_to_close_timeout,
            Duration::from_secs(300)
        );
    }

    #[test]
    fn test_workflow_config_serializes_seconds() {
        let config = WorkflowConfig::default()
            .with_workflow_execution_timeout(Duration::from_millis(1500));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["workflow_execution_timeout"], 1.5);
        assert!(value["default_activity_retry_policy"]["maximum_interval"].is_null());
    }

    #[test]
    fn test_empty_task_queue_rejected() {
        let config = WorkflowConfig::default().with_task_queue("  ");
        assert!(config.validate().is_err());
    }
}
