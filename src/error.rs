//! Error types for pet search computations.

use thiserror::Error;

/// Result type alias for pet search operations
pub type Result<T> = std::result::Result<T, PetSearchError>;

/// Errors returned by the search services.
///
/// Missing optional inputs (no last-seen location, unknown behavior, ...) are
/// not errors: they fall back to neutral defaults. Only values that would poison
/// the arithmetic with NaN/Infinity, or lookups that cannot be satisfied, end up
/// here.
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum PetSearchError {
    /// A numeric or geographic argument is out of range or not finite
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The pet store has no record for the requested id
    #[error("pet not found: {0}")]
    PetNotFound(String),

    /// Neither a last-seen location nor a geocodable address is available
    #[error("no last-seen location for pet {0}")]
    MissingLocation(String),

    /// JSON payload could not be decoded or encoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PetSearchError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Fail with `InvalidArgument` unless `value` is finite and non-negative.
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PetSearchError::invalid(format!(
            "{} must be finite and >= 0, got {}",
            name, value
        )))
    }
}

/// Fail with `InvalidArgument` unless `value` is finite.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PetSearchError::invalid(format!("{} must be finite, got {}", name, value)))
    }
}
