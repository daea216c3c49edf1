//! # rentable-core: Pure Business Logic for the Rentable Engine
//!
//! This crate is the **heart** of the reservation engine. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Rentable Architecture                              │
//! │                                                                         │
//! │  Booking request / payment webhook / cron trigger                      │
//! │       │                                                                 │
//! │  ┌────▼────────────────────────────────────────────────────────────┐   │
//! │  │                  rentable-engine                                │   │
//! │  │    Availability resolver · Booking state machine · Sweepers     │   │
//! │  └────┬───────────────────────────────────────────────────┬────────┘   │
//! │       │                                                   │            │
//! │  ┌────▼─────────────────────────────┐   ┌─────────────────▼────────┐   │
//! │  │   ★ rentable-core (THIS CRATE) ★ │   │       rentable-db        │   │
//! │  │                                  │   │  SQLite repositories,    │   │
//! │  │  ┌───────┐ ┌────────┐ ┌───────┐  │   │  migrations, pool        │   │
//! │  │  │ clock │ │ buffer │ │conflct│  │   └──────────────────────────┘   │
//! │  │  │ tz→UTC│ │ notice │ │ detect│  │                                  │
//! │  │  └───────┘ └────────┘ └───────┘  │                                  │
//! │  │                                  │                                  │
//! │  │  NO I/O • NO DATABASE • PURE     │                                  │
//! │  └──────────────────────────────────┘                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Business, InventoryItem, Reservation, lines)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`clock`] - Local date/time + IANA zone -> UTC instants
//! - [`buffer`] - Buffer expansion and advance-notice policy
//! - [`conflict`] - Overlap detection and remaining-quantity math
//! - [`error`] - Domain error types
//! - [`validation`] - Input shape validation (runs before any I/O)
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Half-Open Windows**: Every window is `[start, end)` - a reservation
//!    ending at noon never conflicts with one starting at noon
//! 5. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod buffer;
pub mod clock;
pub mod conflict;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use rentable_core::Money` instead of
// `use rentable_core::money::Money`

pub use buffer::BufferPolicy;
pub use clock::normalize_window;
pub use conflict::{remaining_quantity, windows_overlap, BookedWindow};
pub use error::{CoreError, NoticeBound, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single item on one reservation line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
/// Configurable per-tenant in future versions.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum number of lines on a single reservation.
///
/// ## Business Reason
/// Keeps the write transaction for a hold bounded; real bookings in the
/// reference data never exceed a dozen lines.
pub const MAX_RESERVATION_LINES: usize = 100;
