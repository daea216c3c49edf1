//! # Rentable Engine
//!
//! Availability resolution and booking lifecycle for rental inventory.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                           rentable-engine                                │
//! │                                                                          │
//! │  ┌────────────────────┐   ┌──────────────────┐   ┌───────────────────┐  │
//! │  │ AvailabilityService│   │  BookingService  │   │  Sweepers         │  │
//! │  │  resolve()         │   │  issue_invoice() │   │  HoldSweeper      │  │
//! │  │  create_hold()     │   │  confirm()       │   │  RetentionSweeper │  │
//! │  └─────────┬──────────┘   │  cancel() ...    │   └─────────┬─────────┘  │
//! │            │              └────────┬─────────┘             │            │
//! │            └───────────────────────┼───────────────────────┘            │
//! │                                    ▼                                    │
//! │  ┌────────────────────────────────────────────────────────────────┐    │
//! │  │ rentable-db (SQLite repositories, guarded transitions)         │    │
//! │  │ rentable-core (clock, buffers, conflict math, state rules)     │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! │                                                                          │
//! │  External seams: PaymentGateway, DocumentSigner (best-effort voids)     │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Remaining quantity is never stored; every answer is derived from
//! committed demand at ask time. Writes re-derive inside the insert
//! transaction, so two racing holds for the last unit cannot both land.

pub mod availability;
pub mod booking;
pub mod config;
pub mod error;
pub mod gateway;
pub mod retention;
pub mod sweeper;

pub use availability::{
    AvailabilityService, HoldLineRequest, HoldRequest, ItemAvailability, WindowRequest,
};
pub use booking::BookingService;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use gateway::{DocumentSigner, MemoryGateway, PaymentGateway};
pub use retention::RetentionSweeper;
pub use sweeper::HoldSweeper;
