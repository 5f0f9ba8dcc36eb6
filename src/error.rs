//! Error types for movement metric extraction.
//!
//! Only failures that make the whole analysis meaningless are errors. Problems
//! confined to one joint, metric or segment are reported as
//! [`DataQualityWarning`](crate::quality::DataQualityWarning)s inside the
//! payload instead.

use thiserror::Error;

/// Main error type for the extraction pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// Too few frames carry a usable anchor to normalize the clip.
    #[error(
        "Insufficient pose data: {usable_frames} of {total_frames} frames usable, \
         need at least {required_fraction:.2} of frames"
    )]
    InsufficientData {
        usable_frames: usize,
        total_frames: usize,
        required_fraction: f64,
    },

    /// No frame shows both the anchor and the scale reference joints, so body
    /// size cannot be measured.
    #[error("Cannot measure body scale in any of {total_frames} frames")]
    UndefinedBodyScale { total_frames: usize },

    /// The segment detector never left its idle state.
    #[error("No motion detected in {frames} frames")]
    NoMotionDetected { frames: usize },

    /// Input validation errors.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Frame timestamps go backwards.
    #[error("Timestamps must be non-decreasing at frame {index}")]
    NonMonotonicTimestamps { index: usize },

    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reference profile is inconsistent with itself or the skeleton.
    #[error("Invalid reference profile: {0}")]
    InvalidProfile(String),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

impl MetricsError {
    /// Create an insufficient data error.
    #[must_use]
    pub const fn insufficient_data(
        usable_frames: usize,
        total_frames: usize,
        required_fraction: f64,
    ) -> Self {
        Self::InsufficientData {
            usable_frames,
            total_frames,
            required_fraction,
        }
    }

    /// Create a no-motion error.
    #[must_use]
    pub const fn no_motion(frames: usize) -> Self {
        Self::NoMotionDetected { frames }
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid profile error.
    #[must_use]
    pub fn invalid_profile(msg: impl Into<String>) -> Self {
        Self::InvalidProfile(msg.into())
    }

    /// Whether the error comes from the pose data itself rather than from the
    /// caller's configuration.
    #[must_use]
    pub const fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. }
                | Self::UndefinedBodyScale { .. }
                | Self::NoMotionDetected { .. }
                | Self::NonMonotonicTimestamps { .. }
        )
    }
}
