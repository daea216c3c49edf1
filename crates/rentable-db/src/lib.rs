//! # rentable-db: Database Layer for the Rentable Engine
//!
//! This crate provides database access for the reservation engine.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Rentable Data Flow                                │
//! │                                                                         │
//! │  rentable-engine (resolver / state machine / sweepers)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    rentable-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ BusinessRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo  │    │ 001_init.sql │  │   │
//! │  │   │ WAL mode      │    │ ReservationRepo│    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (business, inventory, reservation)
//!
//! ## Transaction Discipline
//!
//! Every multi-statement write in the engine runs inside one sqlx
//! [`Transaction`](sqlx::Transaction) obtained from `Database::begin()`.
//! Repository methods whose name ends in `_tx` take a `&mut SqliteConnection`
//! so they compose into a caller-owned transaction; a dropped transaction
//! rolls back, so a failed step can never leave a reservation flipped while
//! its lines are not.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::business::BusinessRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::reservation::ReservationRepository;
