//! Cycle timing and write-retry configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing of the collect/plan/apply cycle and of individual bridge calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time between scheduled cycles in ms (valid range: 100-60000).
    pub interval_ms: u32,
    /// Budget for one whole collection in ms (valid range: 50-30000).
    pub collect_timeout_ms: u32,
    /// Budget for a single window write in ms (valid range: 50-30000).
    pub write_timeout_ms: u32,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.interval_ms))
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.collect_timeout_ms))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.write_timeout_ms))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            collect_timeout_ms: 2000,
            write_timeout_ms: 1500,
        }
    }
}

/// Exponential backoff applied to windows whose writes fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry in ms (valid range: 10-10000).
    pub base_delay_ms: u32,
    /// Upper bound for any retry delay in ms (valid range: 10-300000).
    pub max_delay_ms: u32,
    /// Consecutive failures before a window is skipped for the session
    /// (valid range: 1-20).
    pub max_attempts: u32,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.base_delay_ms))
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.max_delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 250,
            max_delay_ms: 8000,
            max_attempts: 5,
        }
    }
}
