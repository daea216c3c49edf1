//! # Repository Module
//!
//! Repository implementations for database access.
//!
//! ## Repository Pattern
//! Each repository owns the SQL for one aggregate:
//!
//! - [`business`] - Tenant configuration reads/writes
//! - [`inventory`] - Rentable units and their operational status
//! - [`reservation`] - The booking aggregate: reservations, lines, and the
//!   external-correlation rows (invoices, quotes, payments, waivers)
//!
//! Methods whose name ends in `_tx` take a `&mut SqliteConnection` and
//! compose into a caller-owned transaction; everything else runs on the
//! pool directly.

pub mod business;
pub mod inventory;
pub mod reservation;

pub use business::BusinessRepository;
pub use inventory::InventoryRepository;
pub use reservation::ReservationRepository;

use uuid::Uuid;

/// Generates a new entity ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
