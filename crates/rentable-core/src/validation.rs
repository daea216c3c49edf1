//! # Validation Module
//!
//! Input shape validation for booking requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE - shape checks, before any I/O                   │
//! │  ├── date/time format, id presence, quantity bounds                    │
//! │  └── rejected requests never touch the database                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: rentable-core policies - after a read                        │
//! │  ├── notice window, minimum amount                                     │
//! │  └── carry the violated bound for user display                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on status columns                               │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: each layer catches a different failure class        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, NaiveTime};

use crate::error::ValidationError;
use crate::{MAX_LINE_QUANTITY, MAX_RESERVATION_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Date / Time Parsers
// =============================================================================

/// Parses a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{value}' is not a YYYY-MM-DD date"),
        }
    })
}

/// Parses a wall-clock time in `HH:MM` form.
pub fn parse_time(field: &str, value: &str) -> ValidationResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{value}' is not an HH:MM time"),
        }
    })
}

// =============================================================================
// Request Field Validators
// =============================================================================

/// Validates an entity id is present and non-blank.
pub fn validate_id(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates the number of lines on a reservation request.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }
    if count > MAX_RESERVATION_LINES {
        return Err(ValidationError::TooMany {
            field: "lines".to_string(),
            max: MAX_RESERVATION_LINES,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
