//! Cycle timing and retry validation.

use crate::schema::SpatialConfig;

use super::helpers::validate_range;

/// Validate scheduler timing constraints.
pub(crate) fn validate_scheduler(errors: &mut Vec<String>, config: &SpatialConfig) {
    validate_range(
        errors,
        "scheduler.interval_ms",
        config.scheduler.interval_ms,
        100,
        60_000,
    );
    validate_range(
        errors,
        "scheduler.collect_timeout_ms",
        config.scheduler.collect_timeout_ms,
        50,
        30_000,
    );
    validate_range(
        errors,
        "scheduler.write_timeout_ms",
        config.scheduler.write_timeout_ms,
        50,
        30_000,
    );
}

/// Validate backoff constraints, including `base_delay <= max_delay`.
pub(crate) fn validate_retry(errors: &mut Vec<String>, config: &SpatialConfig) {
    let retry = &config.retry;
    validate_range(errors, "retry.base_delay_ms", retry.base_delay_ms, 10, 10_000);
    validate_range(errors, "retry.max_delay_ms", retry.max_delay_ms, 10, 300_000);
    validate_range(errors, "retry.max_attempts", retry.max_attempts, 1, 20);

    if retry.base_delay_ms > retry.max_delay_ms {
        errors.push(format!(
            "retry.base_delay_ms = {} exceeds retry.max_delay_ms = {}",
            retry.base_delay_ms, retry.max_delay_ms
        ));
    }
}
