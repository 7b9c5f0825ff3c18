//! Core data model for the kefir tracker.
//!
//! A ferment is one batch of milk or water kefir: when it started, how long
//! it should run, and how it ended. Everything time-derived (progress,
//! overdue, offset) lives in `projection`, never in the record.

mod details;
mod ferment;

pub use details::Details;
pub use ferment::{Ferment, FermentId, FermentPatch, FermentStatus, KefirKind, NewFerment};

/// Structural validation failures for ferment records and their inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("hours must be a finite number, got {0}")]
    NonFiniteHours(f64),

    #[error("target hours must be greater than zero, got {0}")]
    NonPositiveHours(f64),

    #[error("{field} must be greater than zero, got {value}")]
    NonPositiveAmount { field: &'static str, value: f64 },

    #[error("end time must be set exactly when the batch is no longer fermenting")]
    EndTimeMismatch,
}

/// Checks that a target duration is usable: finite and strictly positive.
pub fn validate_target_hours(hours: f64) -> Result<f64, ValidationError> {
    if !hours.is_finite() {
        return Err(ValidationError::NonFiniteHours(hours));
    }
    if hours <= 0.0 {
        return Err(ValidationError::NonPositiveHours(hours));
    }
    Ok(hours)
}
