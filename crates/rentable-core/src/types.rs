//! # Domain Types
//!
//! Core domain types used throughout the Rentable engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │    Business     │   │  InventoryItem   │   │   Reservation    │     │
//! │  │  ─────────────  │   │  ──────────────  │   │  ──────────────  │     │
//! │  │  id (UUID)      │   │  id (UUID)       │   │  id (UUID)       │     │
//! │  │  timezone       │   │  quantity (ceil) │   │  status          │     │
//! │  │  notice hours   │   │  unit_price      │   │  start/end (UTC) │     │
//! │  │  buffer hours   │   │  status          │   │  expires_at      │     │
//! │  └─────────────────┘   └──────────────────┘   └────────┬─────────┘     │
//! │                                                         │ 1..n          │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌────────▼─────────┐     │
//! │  │ReservationStatus│   │ Invoice / Quote  │   │ ReservationLine  │     │
//! │  │  ─────────────  │   │ Payment / Waiver │   │  ──────────────  │     │
//! │  │  Hold           │   │  ──────────────  │   │  item_id, qty    │     │
//! │  │  Pending        │   │  external_id     │   │  own UTC window  │     │
//! │  │  Confirmed ...  │   │  mirrored status │   │  mirrored status │     │
//! │  └─────────────────┘   └──────────────────┘   └──────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Invariant
//! `Reservation.expires_at` is `Some` if and only if the status is
//! `Hold` or `Pending`. Every constructor and transition helper in this
//! file maintains that pairing; the database layer enforces it again with
//! guarded updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Business (tenant configuration)
// =============================================================================

/// Tenant configuration: timezone, notice window, buffers.
///
/// Immutable per request; read-only input to the availability resolver.
/// Created at tenant onboarding, updated by tenant admins, never deleted
/// while reservations reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Business {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// IANA timezone name (e.g., "America/Chicago").
    /// Local booking times are interpreted in this zone unless the
    /// request supplies its own.
    pub timezone: String,

    /// Minimum advance notice, in hours. 0 = same-instant bookings allowed.
    pub min_notice_hours: i64,

    /// Maximum advance notice, in hours (how far out the calendar opens).
    pub max_notice_hours: i64,

    /// Hours blocked before each booked window (setup/transport time).
    pub pre_buffer_hours: i64,

    /// Hours blocked after each booked window (cleaning/turnaround time).
    pub post_buffer_hours: i64,

    /// Optional minimum booking subtotal, in cents.
    pub min_total_cents: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Inventory Item
// =============================================================================

/// Operational status of a rentable unit.
///
/// Only `Available` items participate in availability computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// In service and bookable.
    Available,
    /// Temporarily out of service; excluded from availability.
    Maintenance,
    /// Permanently out of service.
    Retired,
}

/// A rentable unit.
///
/// ## Quantity Is a Ceiling
/// `quantity` is the total number of units owned, NOT a live counter.
/// Remaining availability is always derived by subtracting concurrently
/// committed demand for the overlapping window. Storing a mutable counter
/// invites lost-update bugs; deriving it does not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this item belongs to.
    pub business_id: String,

    /// Display name shown in availability responses.
    pub name: String,

    /// Total units owned (the ceiling).
    pub quantity: i64,

    /// Rental price per unit in cents.
    pub unit_price_cents: i64,

    /// Operational status.
    pub status: ItemStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Whether this item participates in availability computation.
    #[inline]
    pub fn is_bookable(&self) -> bool {
        self.status == ItemStatus::Available
    }
}

// =============================================================================
// Reservation Status
// =============================================================================

/// The lifecycle status of a reservation.
///
/// ## Lifecycle
/// ```text
/// HOLD ──► PENDING ──► CONFIRMED ──► COMPLETED
///   │         │            │
///   │         │            └──► CANCELLED (full refund)
///   ├─────────┼───────────────► CANCELLED (operator)
///   └─────────┴───────────────► EXPIRED   (sweeper only)
/// ```
/// `Cancelled`, `Expired` and `Completed` are terminal. `Expired` is
/// semantically a cancellation but distinguishes "customer abandoned"
/// from "operator cancelled" for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Customer started checkout; inventory provisionally reserved.
    Hold,
    /// Invoice/quote issued; awaiting payment.
    Pending,
    /// Payment captured; inventory firmly committed.
    Confirmed,
    /// Service delivered; kept for customer history.
    Completed,
    /// Operator cancelled or fully refunded.
    Cancelled,
    /// Hold deadline passed; set only by the expiration sweeper.
    Expired,
}

impl ReservationStatus {
    /// Terminal states admit no further transitions.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed
                | ReservationStatus::Cancelled
                | ReservationStatus::Expired
        )
    }

    /// Whether a reservation in this status counts against inventory.
    ///
    /// `Hold`/`Pending` only count while their deadline has not passed;
    /// that time filter lives in the availability query, not here.
    #[inline]
    pub fn holds_inventory(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Hold | ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }

    /// Whether `expires_at` must be present in this status.
    #[inline]
    pub fn carries_deadline(&self) -> bool {
        matches!(self, ReservationStatus::Hold | ReservationStatus::Pending)
    }

    /// The legal-transition table for the booking state machine.
    ///
    /// Every transition not listed here is rejected with `StaleState` /
    /// `InvalidTransition` by the engine.
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (*self, next),
            (Hold, Pending)
                | (Hold, Confirmed)
                | (Hold, Cancelled)
                | (Hold, Expired)
                | (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
        )
    }

    /// Stable lowercase name, matching the database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Hold => "hold",
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Reservation
// =============================================================================

/// The booking aggregate.
///
/// Owns one or more [`ReservationLine`] rows and optionally an invoice,
/// quote, payment and waiver correlation row each.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Reservation {
    pub id: String,
    pub business_id: String,
    pub status: ReservationStatus,

    /// Event window in UTC, half-open `[start_at, end_at)`.
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,

    /// Denormalized money summary, attached after external tax calculation.
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,

    /// Deadline for pre-confirmation states.
    /// Present if and only if status is `Hold` or `Pending`.
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Checks the expires_at/status pairing invariant.
    pub fn deadline_consistent(&self) -> bool {
        self.expires_at.is_some() == self.status.carries_deadline()
    }
}

// =============================================================================
// Reservation Line
// =============================================================================

/// The per-inventory-item portion of a reservation.
///
/// Carries its own UTC window (normally equal to the parent's) so a single
/// reservation can, in future, stagger pickup times per item. Status is
/// mirrored from the parent for bulk reporting queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReservationLine {
    pub id: String,
    pub reservation_id: String,
    pub item_id: String,
    pub quantity: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// External-System Correlations
// =============================================================================
// Each reservation optionally owns one of each of these. The remote
// system's lifecycle status is mirrored locally for offline reconciliation;
// a failed remote call leaves the mirror stale rather than blocking the
// local state transition.

/// Local lifecycle mirror of an externally issued invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Open,
    Paid,
    Void,
}

/// An invoice issued to the customer for payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub reservation_id: String,
    /// The remote billing system's handle, once known.
    pub external_id: Option<String>,
    pub status: InvoiceStatus,
    /// The invoice's own expiry; copied onto the reservation while Pending.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Local lifecycle mirror of an externally issued quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Open,
    Accepted,
    Void,
}

/// A quote issued to the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Quote {
    pub id: String,
    pub reservation_id: String,
    pub external_id: Option<String>,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Local lifecycle mirror of a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Captured,
    Failed,
    Refunded,
}

/// A payment towards a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentRecord {
    pub id: String,
    pub reservation_id: String,
    pub external_id: Option<String>,
    pub status: PaymentStatus,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Local lifecycle mirror of an e-signature envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum WaiverStatus {
    Sent,
    Signed,
    Void,
}

/// A liability waiver sent for signature.
///
/// The signed-document webhook updates this row only; it never drives the
/// reservation status itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Waiver {
    pub id: String,
    pub reservation_id: String,
    pub external_id: Option<String>,
    pub status: WaiverStatus,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_terminal_states_admit_no_transitions() {
        use ReservationStatus::*;
        for terminal in [Completed, Cancelled, Expired] {
            for next in [Hold, Pending, Confirmed, Completed, Cancelled, Expired] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{terminal} -> {next} should be illegal"
                );
            }
        }
    }

    #[test]
    fn test_legal_transitions() {
        use ReservationStatus::*;
        assert!(Hold.can_transition_to(Pending));
        assert!(Hold.can_transition_to(Confirmed));
        assert!(Hold.can_transition_to(Cancelled));
        assert!(Hold.can_transition_to(Expired));
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));

        // Confirmed reservations can never expire; only pre-payment
        // states are swept.
        assert!(!Confirmed.can_transition_to(Expired));
        assert!(!Completed.can_transition_to(Hold));
        assert!(!Pending.can_transition_to(Hold));
    }

    #[test]
    fn test_holds_inventory() {
        use ReservationStatus::*;
        assert!(Hold.holds_inventory());
        assert!(Pending.holds_inventory());
        assert!(Confirmed.holds_inventory());
        assert!(!Completed.holds_inventory());
        assert!(!Cancelled.holds_inventory());
        assert!(!Expired.holds_inventory());
    }

    #[test]
    fn test_deadline_consistency() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let mut reservation = Reservation {
            id: "r1".to_string(),
            business_id: "b1".to_string(),
            status: ReservationStatus::Hold,
            start_at: now,
            end_at: now + chrono::Duration::hours(2),
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            expires_at: Some(now + chrono::Duration::minutes(30)),
            created_at: now,
            updated_at: now,
        };
        assert!(reservation.deadline_consistent());

        reservation.status = ReservationStatus::Confirmed;
        assert!(!reservation.deadline_consistent());

        reservation.expires_at = None;
        assert!(reservation.deadline_consistent());
    }
}
