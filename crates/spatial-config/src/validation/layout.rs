//! Layout configuration validation (policy name, margins, gutters).

use crate::schema::{SpatialConfig, KNOWN_POLICIES};

use super::helpers::validate_range;

/// Validate all layout-related constraints.
pub(crate) fn validate_layout(errors: &mut Vec<String>, config: &SpatialConfig) {
    if !KNOWN_POLICIES.contains(&config.layout.policy.as_str()) {
        errors.push(format!(
            "layout.policy = {:?} is not one of [{}]",
            config.layout.policy,
            KNOWN_POLICIES.join(", ")
        ));
    }
    validate_range(
        errors,
        "layout.edge_margin",
        config.layout.edge_margin,
        0,
        200,
    );
    validate_range(errors, "layout.gutter", config.layout.gutter, 0, 100);
}
