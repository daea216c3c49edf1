//! # Availability Resolver & Hold Creation
//!
//! The read path and the first write of the booking lifecycle.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                        Availability Pipeline                             │
//! │                                                                          │
//! │  local date + times ──► clock::normalize_window ──► [start, end) UTC    │
//! │                                                                          │
//! │  [start, end) ──► BufferPolicy::expand_search_window                     │
//! │                     ──► [start - post_buffer, end + pre_buffer)          │
//! │                                                                          │
//! │  expanded window ──► repo.booked_windows_tx  (committed demand)          │
//! │                     ──► conflict::remaining_quantity per item            │
//! │                                                                          │
//! │  Read path:  report remaining per bookable item                          │
//! │  Write path: re-run the same pipeline INSIDE the insert transaction,     │
//! │              then insert hold + lines only if every line still fits      │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resolver never stores availability; remaining quantity is always
//! derived from committed demand at ask time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rentable_core::{
    clock, conflict, validation, BufferPolicy, Business, CoreError, InventoryItem, Money,
    Reservation, ReservationLine, ReservationStatus, ValidationError, MAX_RESERVATION_LINES,
};
use rentable_db::{repository::generate_id, Database};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Request / Response Types
// =============================================================================

/// A rental window expressed in a business's local wall-clock terms.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowRequest {
    /// Local calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Local start time, `HH:MM`.
    pub start_time: String,
    /// Local end time, `HH:MM`.
    pub end_time: String,
    /// Optional IANA zone overriding the business's configured zone.
    pub timezone: Option<String>,
}

/// One requested item within a hold.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldLineRequest {
    pub item_id: String,
    pub quantity: i64,
}

/// Request to place a hold on inventory for a window.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldRequest {
    pub business_id: String,
    pub window: WindowRequest,
    pub lines: Vec<HoldLineRequest>,
}

/// Per-item availability for a resolved window.
#[derive(Debug, Clone, Serialize)]
pub struct ItemAvailability {
    pub item_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub total_quantity: i64,
    pub remaining: i64,
}

/// A window normalized against a business's policy.
struct ResolvedWindow {
    business: Business,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    search_start: DateTime<Utc>,
    search_end: DateTime<Utc>,
    policy: BufferPolicy,
}

// =============================================================================
// Service
// =============================================================================

/// Resolves availability and creates holds.
#[derive(Debug, Clone)]
pub struct AvailabilityService {
    db: Database,
    config: EngineConfig,
}

impl AvailabilityService {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        AvailabilityService { db, config }
    }

    /// Normalizes a wall-clock window against a business's zone and buffer
    /// policy. Shared by the read and write paths.
    async fn resolve_window(
        &self,
        business_id: &str,
        window: &WindowRequest,
    ) -> EngineResult<ResolvedWindow> {
        validation::validate_id("business_id", business_id).map_err(CoreError::from)?;

        let business = self
            .db
            .businesses()
            .get_by_id(business_id)
            .await?
            .ok_or_else(|| EngineError::BusinessNotFound(business_id.to_string()))?;

        let zone_name = window.timezone.as_deref().unwrap_or(&business.timezone);
        let tz = clock::parse_timezone(zone_name)?;
        let date = validation::parse_date("date", &window.date).map_err(CoreError::from)?;
        let start_time =
            validation::parse_time("start_time", &window.start_time).map_err(CoreError::from)?;
        let end_time =
            validation::parse_time("end_time", &window.end_time).map_err(CoreError::from)?;

        let (start, end) = clock::normalize_window(date, start_time, end_time, tz)?;
        let policy = BufferPolicy::from(&business);
        let (search_start, search_end) = policy.expand_search_window(start, end);

        Ok(ResolvedWindow {
            business,
            start,
            end,
            search_start,
            search_end,
            policy,
        })
    }

    /// Resolves remaining quantity for every bookable item of a business
    /// across a window. Items with nothing left are omitted; an empty
    /// report means no availability, which is not an error.
    ///
    /// `exclude` omits one reservation's own demand, so an edit flow can
    /// ask "what is free if my current booking moved".
    pub async fn resolve(
        &self,
        business_id: &str,
        window: &WindowRequest,
        exclude: Option<&str>,
    ) -> EngineResult<Vec<ItemAvailability>> {
        let now = Utc::now();
        let resolved = self.resolve_window(business_id, window).await?;
        resolved.policy.check_notice(now, resolved.start)?;

        let items = self.db.inventory().list_available(business_id).await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let item_ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();

        // Read-only transaction, dropped without commit.
        let mut tx = self.db.begin().await?;
        let booked = self
            .db
            .reservations()
            .booked_windows_tx(
                &mut tx,
                &item_ids,
                resolved.search_start,
                resolved.search_end,
                now,
                exclude,
            )
            .await?;
        drop(tx);

        let empty = Vec::new();
        let report = items
            .into_iter()
            .filter_map(|item| {
                let windows = booked.get(&item.id).unwrap_or(&empty);
                let remaining = conflict::remaining_quantity(
                    item.quantity,
                    resolved.search_start,
                    resolved.search_end,
                    windows,
                );
                (remaining > 0).then_some(ItemAvailability {
                    item_id: item.id,
                    name: item.name,
                    unit_price_cents: item.unit_price_cents,
                    total_quantity: item.quantity,
                    remaining,
                })
            })
            .collect();

        Ok(report)
    }

    /// Places a hold: validates the request, prices it, and inserts the
    /// reservation with its lines, re-checking availability inside the
    /// insert transaction.
    ///
    /// Write contention is retried once; a second failure surfaces as a
    /// conflict for the caller to retry.
    pub async fn create_hold(&self, request: &HoldRequest) -> EngineResult<Reservation> {
        let now = Utc::now();
        match self.create_hold_at(request, now).await {
            Err(EngineError::Conflict { ref item_id, .. }) if item_id.is_empty() => {
                debug!(business_id = %request.business_id, "Write contention on hold creation, retrying once");
                self.create_hold_at(request, now).await
            }
            other => other,
        }
    }

    /// `create_hold` with an explicit clock, for deterministic tests.
    pub async fn create_hold_at(
        &self,
        request: &HoldRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<Reservation> {
        self.validate_lines(&request.lines)?;

        let resolved = self
            .resolve_window(&request.business_id, &request.window)
            .await?;
        resolved.policy.check_notice(now, resolved.start)?;

        // Requested demand per item; one item may appear on several lines.
        let mut requested: HashMap<String, i64> = HashMap::new();
        for line in &request.lines {
            *requested.entry(line.item_id.clone()).or_insert(0) += line.quantity;
        }

        let items = self.load_items(&request.business_id, &request.lines).await?;
        let subtotal = price_lines(&request.lines, &items)?;

        if let Some(minimum) = resolved.business.min_total_cents {
            if subtotal.cents() < minimum {
                return Err(CoreError::MinimumAmountViolation {
                    subtotal_cents: subtotal.cents(),
                    minimum_cents: minimum,
                }
                .into());
            }
        }

        let repo = self.db.reservations();
        let mut tx = self.db.begin().await?;

        // The authoritative availability check: same transaction as the
        // insert, so a concurrent hold either lands before us (and counts
        // here) or after us (and sees ours).
        let item_ids: Vec<String> = requested.keys().cloned().collect();
        let booked = repo
            .booked_windows_tx(
                &mut tx,
                &item_ids,
                resolved.search_start,
                resolved.search_end,
                now,
                None,
            )
            .await?;

        let empty = Vec::new();
        for (item_id, want) in &requested {
            let item = &items[item_id];
            let windows = booked.get(item_id).unwrap_or(&empty);
            let remaining = conflict::remaining_quantity(
                item.quantity,
                resolved.search_start,
                resolved.search_end,
                windows,
            );
            if *want > remaining {
                return Err(EngineError::Conflict {
                    item_id: item_id.clone(),
                    requested: *want,
                    remaining,
                });
            }
        }

        let reservation = Reservation {
            id: generate_id(),
            business_id: request.business_id.clone(),
            status: ReservationStatus::Hold,
            start_at: resolved.start,
            end_at: resolved.end,
            subtotal_cents: subtotal.cents(),
            tax_cents: 0,
            total_cents: subtotal.cents(),
            expires_at: Some(now + self.config.hold_ttl),
            created_at: now,
            updated_at: now,
        };
        repo.insert_tx(&mut tx, &reservation).await?;

        for line in &request.lines {
            repo.insert_line_tx(
                &mut tx,
                &ReservationLine {
                    id: generate_id(),
                    reservation_id: reservation.id.clone(),
                    item_id: line.item_id.clone(),
                    quantity: line.quantity,
                    start_at: resolved.start,
                    end_at: resolved.end,
                    status: ReservationStatus::Hold,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            reservation_id = %reservation.id,
            business_id = %reservation.business_id,
            lines = request.lines.len(),
            subtotal = %subtotal,
            expires_at = ?reservation.expires_at,
            "Hold created"
        );

        Ok(reservation)
    }

    fn validate_lines(&self, lines: &[HoldLineRequest]) -> EngineResult<()> {
        validation::validate_line_count(lines.len()).map_err(CoreError::from)?;
        for line in lines {
            validation::validate_id("item_id", &line.item_id).map_err(CoreError::from)?;
            validation::validate_quantity(line.quantity).map_err(CoreError::from)?;
        }
        Ok(())
    }

    /// Loads every referenced item, requiring each to belong to the
    /// business and be bookable.
    async fn load_items(
        &self,
        business_id: &str,
        lines: &[HoldLineRequest],
    ) -> EngineResult<HashMap<String, InventoryItem>> {
        let mut items = HashMap::with_capacity(lines.len());
        for line in lines {
            if items.contains_key(&line.item_id) {
                continue;
            }
            let item = self
                .db
                .inventory()
                .get_by_id(&line.item_id)
                .await?
                .filter(|i| i.business_id == business_id && i.is_bookable())
                .ok_or_else(|| EngineError::ItemNotBookable(line.item_id.clone()))?;
            items.insert(line.item_id.clone(), item);
        }
        Ok(items)
    }
}

/// Prices a line set in integer cents with overflow checks.
fn price_lines(
    lines: &[HoldLineRequest],
    items: &HashMap<String, InventoryItem>,
) -> EngineResult<Money> {
    let mut subtotal = Money::zero();
    for line in lines {
        let item = &items[&line.item_id];
        let line_total = item
            .unit_price()
            .checked_mul(line.quantity)
            .and_then(|t| subtotal.checked_add(t))
            .ok_or_else(|| {
                CoreError::from(ValidationError::OutOfRange {
                    field: "subtotal_cents".to_string(),
                    min: 0,
                    max: i64::MAX,
                })
            })?;
        subtotal = line_total;
    }
    Ok(subtotal)
}

// MAX_RESERVATION_LINES is enforced inside validate_line_count; re-exported
// here for callers sizing their request batches.
pub const MAX_LINES_PER_HOLD: usize = MAX_RESERVATION_LINES;
