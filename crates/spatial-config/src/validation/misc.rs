//! Validation for smaller config sections: apply and target.

use crate::schema::SpatialConfig;

use super::helpers::{validate_range, validate_range_f64};

/// Validate write-application constraints.
pub(crate) fn validate_apply(errors: &mut Vec<String>, config: &SpatialConfig) {
    validate_range(
        errors,
        "apply.max_concurrent_writes",
        config.apply.max_concurrent_writes,
        1,
        16,
    );
    validate_range(
        errors,
        "apply.max_concurrent_reads",
        config.apply.max_concurrent_reads,
        1,
        16,
    );
    validate_range_f64(errors, "apply.epsilon", config.apply.epsilon, 0.0, 50.0);
}

/// Validate the target application section.
pub(crate) fn validate_target(errors: &mut Vec<String>, config: &SpatialConfig) {
    if config.target.application.trim().is_empty() {
        errors.push("target.application must not be empty".into());
    }
}
