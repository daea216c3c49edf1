//! # Hold-Expiration Sweeper
//!
//! Reclaims inventory from holds and pending reservations whose deadline
//! has passed.
//!
//! ## Two Layers of Defense
//! Availability queries already refuse to count a past-deadline hold (the
//! read-time check in the demand query), so inventory frees the instant a
//! deadline passes even if the sweeper is behind. The sweeper's job is to
//! make that outcome durable: flip the row to EXPIRED, mirror the lines,
//! and void any open billing artifacts.
//!
//! ## Per-Row Transactions
//! Each candidate gets its own transaction with the deadline re-checked in
//! the UPDATE predicate. A reservation revived between the candidate
//! select and its sweep (payment webhook re-armed the deadline, or it was
//! confirmed) is skipped, not clobbered. One poisoned row never aborts the
//! rest of the batch.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use rentable_core::{Invoice, InvoiceStatus, Quote, QuoteStatus, ReservationStatus, Waiver};
use rentable_db::Database;

use crate::booking::BookingService;
use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Expires overdue holds and pending reservations.
#[derive(Clone)]
pub struct HoldSweeper {
    db: Database,
    config: EngineConfig,
    booking: BookingService,
}

impl HoldSweeper {
    pub fn new(db: Database, config: EngineConfig, booking: BookingService) -> Self {
        HoldSweeper {
            db,
            config,
            booking,
        }
    }

    /// Runs one sweep pass at `now`. Returns the number of reservations
    /// expired. Idempotent: a second pass over the same data returns 0.
    pub async fn sweep(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        let repo = self.db.reservations();
        let candidates = repo
            .select_expired(now, self.config.sweep_batch_size)
            .await?;

        if candidates.is_empty() {
            debug!("Sweep pass found no overdue reservations");
            return Ok(0);
        }

        type Correlations = (Option<Invoice>, Option<Quote>, Option<Waiver>);

        let mut expired = 0usize;
        for reservation in candidates {
            // Everything per-row, correlation reads included, runs inside
            // one fault barrier so a single bad row cannot abort the pass.
            let result: EngineResult<Option<Correlations>> = async {
                // Fetched before the transition so the external voids
                // afterwards see pre-sweep statuses.
                let invoice = repo.invoice_for(&reservation.id).await?;
                let quote = repo.quote_for(&reservation.id).await?;
                let waiver = repo.waiver_for(&reservation.id).await?;

                let mut tx = self.db.begin().await?;
                let applied = repo.expire_tx(&mut tx, &reservation.id, now).await?;
                if !applied {
                    return Ok(None);
                }
                repo.set_lines_status_tx(&mut tx, &reservation.id, ReservationStatus::Expired)
                    .await?;
                repo.settle_invoices_tx(&mut tx, &reservation.id, InvoiceStatus::Void)
                    .await?;
                repo.settle_quotes_tx(&mut tx, &reservation.id, QuoteStatus::Void)
                    .await?;
                tx.commit().await?;
                Ok(Some((invoice, quote, waiver)))
            }
            .await;

            match result {
                Ok(Some((invoice, quote, waiver))) => {
                    expired += 1;
                    info!(
                        reservation_id = %reservation.id,
                        business_id = %reservation.business_id,
                        was = %reservation.status,
                        "Reservation expired"
                    );
                    self.booking
                        .void_externals(&reservation.id, invoice, quote, None, waiver)
                        .await;
                }
                Ok(None) => {
                    debug!(reservation_id = %reservation.id, "Reservation revived before sweep, skipping");
                }
                Err(err) => {
                    // Log and move on; the next pass retries this row.
                    error!(reservation_id = %reservation.id, %err, "Failed to expire reservation");
                }
            }
        }

        info!(expired, "Sweep pass finished");
        Ok(expired)
    }
}
