//! Scheduler phases.

use serde::Serialize;
use std::fmt;

/// Where the scheduler currently is. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Collecting,
    Planning,
    Applying,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Collecting => "collecting",
            Phase::Planning => "planning",
            Phase::Applying => "applying",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
