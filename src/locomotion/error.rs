use thiserror::Error;

/// Fatal errors raised while setting up a [`Locomotion`](super::Locomotion).
///
/// Nothing in here is produced during a tick. Probes that find nothing are
/// treated as "no ground" / "no wall" and never surface as an error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocomotionError {
    #[error("missing dependency: {0}")]
    MissingDependency(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
}

/// Why a [`LocomotionConfig`](super::LocomotionConfig) was rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("curve `{curve}` needs at least two keyframes, got {count}")]
    TooFewKeyframes { curve: &'static str, count: usize },

    #[error("curve `{curve}` keyframe {index} does not advance in time")]
    NonIncreasingTime { curve: &'static str, index: usize },

    #[error("curve `{curve}` multiplier decreases at keyframe {index}")]
    DecreasingMultiplier { curve: &'static str, index: usize },

    #[error("`{field}` must be finite")]
    NonFinite { field: &'static str },

    #[error("`{field}` must be greater than zero, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("`{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: f32 },
}
