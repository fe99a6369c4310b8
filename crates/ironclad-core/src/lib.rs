//! Core vocabulary shared by the ironclad agent AI and its hosts.

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod ids;
pub mod math;

pub use config::{AgentConfig, FireCooldown};
pub use errors::{ConfigError, ConfigResult};
pub use ids::{AgentId, ProjectileId};

/// Type alias for a duration which can be used to represent time intervals.
pub type Dt = std::time::Duration;

/// Lengths and speeds below this are treated as zero.
pub const EPSILON: f32 = 1e-4;
