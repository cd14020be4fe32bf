//! Full configuration validation.
//!
//! Validates all numeric ranges and cross-field constraints. Each domain has
//! its own submodule; this orchestrator calls them all and collects errors
//! into a single `ConfigError`.

mod helpers;
mod layout;
mod misc;
mod scheduler;


use crate::schema::SpatialConfig;
use spatial_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &SpatialConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    scheduler::validate_scheduler(&mut errors, config);
    scheduler::validate_retry(&mut errors, config);
    layout::validate_layout(&mut errors, config);
    misc::validate_apply(&mut errors, config);
    misc::validate_target(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
