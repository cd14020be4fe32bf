pub mod errors;
pub mod id;
pub mod types;

pub use errors::{BridgeError, ConfigError, PlanError, SpatialError};
pub use id::{new_correlation_id, new_id, CycleId};
pub use types::{Rect, WindowId};

pub type Result<T> = std::result::Result<T, SpatialError>;
