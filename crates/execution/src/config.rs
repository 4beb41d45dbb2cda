//! Engine configuration: ranking weights, retry policy and scheduling.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Weights for the candidate score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    /// Weight of the skill/topic grade
    pub skill_weight: f64,
    /// Weight of the KPI
    pub kpi_weight: f64,
    /// Weight of the free capacity (open slots left)
    pub workload_weight: f64,
    /// Share of each resource's capacity held back for high-priority projects (0..=1)
    pub priority_boost: f64,
    /// Weight of the design platform tier
    pub platform_weight: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            skill_weight: 1.0,
            kpi_weight: 1.0,
            workload_weight: 1.0,
            priority_boost: 0.0,
            platform_weight: 0.0,
        }
    }
}

impl RankingWeights {
    /// Set KPI and workload weights together.
    pub fn with_kpi_and_workload(mut self, kpi_weight: f64, workload_weight: f64) -> Self {
        self.kpi_weight = kpi_weight;
        self.workload_weight = workload_weight;
        self
    }

    /// Set the high-priority capacity reserve.
    pub fn with_priority_boost(mut self, priority_boost: f64) -> Self {
        self.priority_boost = priority_boost;
        self
    }
}

/// Bounded exponential backoff for record store calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failure
    pub base_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exp);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Configuration for the assignment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ranking weights
    pub weights: RankingWeights,
    /// Retry policy for store calls
    pub retry: RetryPolicy,
    /// Seconds between periodic cycles
    pub interval_secs: u64,
    /// Timeout for a single store call
    pub adapter_timeout_ms: u64,
    /// Projects processed in parallel within a cycle
    pub max_concurrent: usize,
    /// Selection rounds before giving up on resources that keep filling up
    pub max_selection_rounds: u32,
    /// Design platforms, best first
    pub platforms: Vec<String>,
    /// Chat webhook receiving cycle results
    pub webhook_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
            retry: RetryPolicy::default(),
            interval_secs: 300, // 5 minutes
            adapter_timeout_ms: 10_000,
            max_concurrent: 4,
            max_selection_rounds: 3,
            platforms: ["Adobe", "Figma", "Canva", "ProCreate", "Sketch", "Variety", "Other"]
                .into_iter()
                .map(String::from)
                .collect(),
            webhook_url: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Set the ranking weights.
    pub fn with_weights(mut self, weights: RankingWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set parallelism within a cycle.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set the per-call store timeout.
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Interval between periodic cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Timeout for a single store call.
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (name, value) in [
            ("skill_weight", w.skill_weight),
            ("kpi_weight", w.kpi_weight),
            ("workload_weight", w.workload_weight),
            ("platform_weight", w.platform_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be a non-negative number, got {value}")));
            }
        }
        if !(0.0..=1.0).contains(&w.priority_boost) {
            return Err(ConfigError::Invalid(format!(
                "priority_boost must be within 0..=1, got {}",
                w.priority_boost
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid("max_concurrent must be at least 1".into()));
        }
        if self.max_selection_rounds == 0 {
            return Err(ConfigError::Invalid("max_selection_rounds must be at least 1".into()));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid("interval_secs must be at least 1".into()));
        }
        if self.adapter_timeout_ms == 0 {
            return Err(ConfigError::Invalid("adapter_timeout_ms must be at least 1".into()));
        }
        Ok(())
    }
}
