//! # Engine Error Types
//!
//! Errors surfaced by the availability resolver, the booking state
//! machine, and the background sweeps. Domain and storage errors flow in
//! via `#[from]`; the engine adds the outcomes that only exist at this
//! layer (conflicts, stale transitions, gateway failures).

use rentable_core::CoreError;
use rentable_db::DbError;
use thiserror::Error;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Domain rule violation from the pure layer.
    ///
    /// ## When This Occurs
    /// - Window normalization failed (inverted window, DST gap, bad zone)
    /// - Notice bound or minimum-amount policy violated
    /// - Request shape validation failed
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage layer failure.
    #[error(transparent)]
    Db(DbError),

    /// Requested quantity is not available for the window.
    ///
    /// ## When This Occurs
    /// - The transactional re-check found less remaining quantity than the
    ///   request asked for (possibly because a concurrent writer won)
    /// - The underlying store reported write contention; a single retry
    ///   already happened before this surfaced
    #[error("Insufficient availability for item '{item_id}': requested {requested}, remaining {remaining}")]
    Conflict {
        item_id: String,
        requested: i64,
        remaining: i64,
    },

    /// A guarded transition matched no row.
    ///
    /// ## When This Occurs
    /// - Another caller (or the sweeper) moved the reservation out of the
    ///   expected status first
    #[error("Reservation '{id}' is no longer in a state that allows '{attempted}'")]
    StaleState { id: String, attempted: String },

    /// Referenced business does not exist.
    #[error("Business not found: {0}")]
    BusinessNotFound(String),

    /// Referenced reservation does not exist.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    /// Referenced inventory item does not exist or is not bookable.
    #[error("Item not bookable: {0}")]
    ItemNotBookable(String),

    /// External gateway call failed or timed out.
    ///
    /// Only raised where the external outcome gates the local transition;
    /// best-effort voids log and continue instead.
    #[error("Gateway error during {operation}: {message}")]
    Gateway { operation: String, message: String },
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        // Write contention is a booking conflict from the caller's point
        // of view, not an infrastructure failure.
        if err.is_busy() {
            return EngineError::Conflict {
                item_id: String::new(),
                requested: 0,
                remaining: 0,
            };
        }
        EngineError::Db(err)
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::from(DbError::from(err))
    }
}

impl EngineError {
    /// True when the caller may retry the same request as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict { .. })
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
