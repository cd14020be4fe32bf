//! Runtime settings of the engine, derived from the loaded config file.

use std::time::Duration;

use spatial_config::schema::LayoutConfig;
use spatial_config::SpatialConfig;

/// Retry schedule for failed remote writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Consecutive failures after which a window is skipped for the session.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Delay before the retry following the `failures`-th consecutive
    /// failure: `min(base * 2^(failures - 1), max)`.
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
            max_attempts: 5,
        }
    }
}

/// Everything one cycle needs to know, with durations resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Tick period, also the deadline budget of one cycle's writes.
    pub interval: Duration,
    pub collect_timeout: Duration,
    pub write_timeout: Duration,
    pub retry: RetryPolicy,
    pub max_concurrent_writes: usize,
    pub max_concurrent_reads: usize,
    /// Largest per-edge difference, in points, treated as "already there".
    pub epsilon: f64,
    pub layout: LayoutConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&SpatialConfig::default())
    }
}

impl From<&SpatialConfig> for EngineConfig {
    fn from(config: &SpatialConfig) -> Self {
        Self {
            interval: config.scheduler.interval(),
            collect_timeout: config.scheduler.collect_timeout(),
            write_timeout: config.scheduler.write_timeout(),
            retry: RetryPolicy {
                base_delay: config.retry.base_delay(),
                max_delay: config.retry.max_delay(),
                max_attempts: config.retry.max_attempts,
            },
            max_concurrent_writes: config.apply.max_concurrent_writes.max(1) as usize,
            max_concurrent_reads: config.apply.max_concurrent_reads.max(1) as usize,
            epsilon: config.apply.epsilon,
            layout: config.layout.clone(),
        }
    }
}
