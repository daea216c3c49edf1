//! # Error Types
//!
//! Domain-specific error types for rentable-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rentable-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input shape failures (before any I/O)          │
//! │                                                                         │
//! │  rentable-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  rentable-engine errors (separate crate)                               │
//! │  └── EngineError      - Conflict / StaleState / orchestration          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (violated bound, item id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Business-rule violations carry the bound so the UI can explain it

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested window is malformed.
    ///
    /// ## When This Occurs
    /// - Start does not precede end after UTC conversion
    /// - The local time does not exist in the tenant's zone (DST gap)
    /// - Date or time string failed to parse
    #[error("Invalid window: {reason}")]
    InvalidWindow { reason: String },

    /// The tenant's timezone string is not a known IANA zone.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// The requested start violates the tenant's advance-notice policy.
    ///
    /// ## When This Occurs
    /// - Lead time (start minus now) below the tenant minimum
    /// - Lead time above the tenant maximum
    ///
    /// The violated bound is carried so the UI can show e.g.
    /// "bookings require at least 24 hours notice".
    #[error("Notice violation: lead time of {lead_hours}h violates the {bound_hours}h {bound} bound")]
    NoticeViolation {
        lead_hours: i64,
        bound_hours: i64,
        bound: NoticeBound,
    },

    /// Booking subtotal is below the tenant's configured minimum.
    #[error("Minimum amount violation: subtotal {subtotal_cents} below minimum {minimum_cents}")]
    MinimumAmountViolation {
        subtotal_cents: i64,
        minimum_cents: i64,
    },

    /// A state transition not permitted by the booking lifecycle.
    ///
    /// ## When This Occurs
    /// - completed -> hold, expired -> confirmed, etc.
    /// - Any transition out of a terminal state
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidWindow error.
    pub fn invalid_window(reason: impl Into<String>) -> Self {
        CoreError::InvalidWindow {
            reason: reason.into(),
        }
    }
}

/// Which side of the notice window a request violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeBound {
    /// Requested start is too close to "now".
    Minimum,
    /// Requested start is too far in the future.
    Maximum,
}

impl std::fmt::Display for NoticeBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoticeBound::Minimum => write!(f, "minimum"),
            NoticeBound::Maximum => write!(f, "maximum"),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request input doesn't meet shape requirements.
/// Used for early validation before business logic or I/O runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid date, invalid time).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Collection exceeds the allowed size.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_violation_message() {
        let err = CoreError::NoticeViolation {
            lead_hours: 2,
            bound_hours: 24,
            bound: NoticeBound::Minimum,
        };
        assert_eq!(
            err.to_string(),
            "Notice violation: lead time of 2h violates the 24h minimum bound"
        );

        let err = CoreError::NoticeViolation {
            lead_hours: 9000,
            bound_hours: 8760,
            bound: NoticeBound::Maximum,
        };
        assert!(err.to_string().contains("8760h maximum bound"));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "business_id".to_string(),
        };
        assert_eq!(err.to_string(), "business_id is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "date".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
