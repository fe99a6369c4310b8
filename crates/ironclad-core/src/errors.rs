use thiserror::Error;

/// Errors raised when an [`AgentConfig`](crate::AgentConfig) is inconsistent.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A value that must be strictly positive was zero or negative.
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    /// A value that must not be negative was negative.
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    /// Randomized fire interval has `min > max`.
    #[error("fire interval min {min} exceeds max {max}")]
    InvalidFireInterval { min: f32, max: f32 },

    /// Shooting range reaches further than the detection range.
    #[error("shooting range {shooting} exceeds detection range {detection}")]
    ShootingBeyondDetection { shooting: f32, detection: f32 },

    /// A range multiplier used for state hysteresis is below one.
    #[error("{field} must be at least 1.0, got {value}")]
    HysteresisBelowOne { field: &'static str, value: f32 },
}

/// Type alias for a result type that can contain a [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
