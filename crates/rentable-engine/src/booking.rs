//! # Booking State Machine
//!
//! Lifecycle transitions for a reservation after its hold exists.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                                                                          │
//! │   HOLD ──issue invoice/quote──► PENDING ──payment──► CONFIRMED           │
//! │    │                              │  ▲                  │                │
//! │    │                              │  └─payment failed──┐│                │
//! │    │                              │    (stays PENDING, ││                │
//! │    │                              │     deadline re-armed)               │
//! │    ├──────── cancel ──────────────┼─────────────────────┤                │
//! │    │                              │                     ▼                │
//! │    ▼                              ▼                 COMPLETED            │
//! │  CANCELLED ◄──────────────────────┘                                      │
//! │                                                                          │
//! │   HOLD / PENDING past deadline ──sweeper──► EXPIRED                      │
//! │                                                                          │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transition is a guarded UPDATE: the allowed-from set travels into
//! the SQL predicate, and a zero-row result surfaces as [`StaleState`]
//! instead of silently re-applying. Line statuses mirror the parent inside
//! the same transaction.
//!
//! External side effects (voiding invoices, refunds, envelope voids) run
//! AFTER the local commit, best-effort, under a timeout. A billing outage
//! must never wedge a cancellation.
//!
//! [`StaleState`]: crate::error::EngineError::StaleState

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use rentable_core::{
    Invoice, InvoiceStatus, PaymentStatus, Quote, QuoteStatus, Reservation, ReservationStatus,
    ValidationError, Waiver, WaiverStatus,
};
use rentable_db::{repository::generate_id, Database};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::gateway::{DocumentSigner, GatewayResult, PaymentGateway};

/// Drives reservation lifecycle transitions.
#[derive(Clone)]
pub struct BookingService {
    db: Database,
    config: EngineConfig,
    payments: Arc<dyn PaymentGateway>,
    signer: Arc<dyn DocumentSigner>,
}

impl BookingService {
    pub fn new(
        db: Database,
        config: EngineConfig,
        payments: Arc<dyn PaymentGateway>,
        signer: Arc<dyn DocumentSigner>,
    ) -> Self {
        BookingService {
            db,
            config,
            payments,
            signer,
        }
    }

    async fn require_reservation(&self, id: &str) -> EngineResult<Reservation> {
        self.db
            .reservations()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::ReservationNotFound(id.to_string()))
    }

    fn stale(id: &str, attempted: &str) -> EngineError {
        EngineError::StaleState {
            id: id.to_string(),
            attempted: attempted.to_string(),
        }
    }

    /// Rejects transitions the state machine does not define. Racing
    /// callers that pass this check are still serialized by the guarded
    /// UPDATE, which reports the loser as stale.
    fn ensure_legal(reservation: &Reservation, to: ReservationStatus) -> EngineResult<()> {
        // Re-arming a PENDING deadline is a self-transition, not a move.
        if reservation.status == to && to == ReservationStatus::Pending {
            return Ok(());
        }
        if !reservation.status.can_transition_to(to) {
            return Err(rentable_core::CoreError::InvalidTransition {
                from: reservation.status.to_string(),
                to: to.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Runs an external call with the configured timeout, logging failures
    /// instead of propagating them.
    async fn best_effort<F>(&self, operation: &str, reservation_id: &str, call: F)
    where
        F: Future<Output = GatewayResult>,
    {
        match tokio::time::timeout(self.config.external_call_timeout, call).await {
            Ok(Ok(())) => {}
            Ok(Err(message)) => {
                warn!(%operation, %reservation_id, %message, "Gateway call failed, continuing")
            }
            Err(_) => warn!(%operation, %reservation_id, "Gateway call timed out, continuing"),
        }
    }

    // =========================================================================
    // HOLD -> PENDING
    // =========================================================================

    /// Records an issued invoice and moves the reservation to PENDING.
    ///
    /// The reservation's deadline follows the invoice: the billing
    /// provider's expiry when given, otherwise `now + invoice_ttl`.
    /// Re-issuing against a reservation already PENDING re-arms the
    /// deadline and records the new invoice.
    pub async fn issue_invoice(
        &self,
        reservation_id: &str,
        external_id: Option<&str>,
        provider_expires_at: Option<DateTime<Utc>>,
    ) -> EngineResult<()> {
        let reservation = self.require_reservation(reservation_id).await?;
        Self::ensure_legal(&reservation, ReservationStatus::Pending)?;
        let now = Utc::now();
        let deadline = provider_expires_at.unwrap_or(now + self.config.invoice_ttl);

        let repo = self.db.reservations();
        let mut tx = self.db.begin().await?;

        let applied = repo
            .transition_tx(
                &mut tx,
                reservation_id,
                &[ReservationStatus::Hold, ReservationStatus::Pending],
                ReservationStatus::Pending,
                Some(deadline),
            )
            .await?;
        if !applied {
            return Err(Self::stale(reservation_id, "issue_invoice"));
        }

        repo.set_lines_status_tx(&mut tx, reservation_id, ReservationStatus::Pending)
            .await?;
        repo.insert_invoice_tx(
            &mut tx,
            &Invoice {
                id: generate_id(),
                reservation_id: reservation_id.to_string(),
                external_id: external_id.map(String::from),
                status: InvoiceStatus::Open,
                expires_at: Some(deadline),
                created_at: now,
                updated_at: now,
            },
        )
        .await?;

        tx.commit().await?;

        info!(%reservation_id, ?external_id, %deadline, "Invoice issued, reservation pending payment");
        Ok(())
    }

    /// Records an issued quote and moves the reservation to PENDING.
    ///
    /// Quotes carry no provider expiry, so the deadline is always
    /// `now + invoice_ttl`.
    pub async fn issue_quote(
        &self,
        reservation_id: &str,
        external_id: Option<&str>,
    ) -> EngineResult<()> {
        let reservation = self.require_reservation(reservation_id).await?;
        Self::ensure_legal(&reservation, ReservationStatus::Pending)?;
        let now = Utc::now();
        let deadline = now + self.config.invoice_ttl;

        let repo = self.db.reservations();
        let mut tx = self.db.begin().await?;

        let applied = repo
            .transition_tx(
                &mut tx,
                reservation_id,
                &[ReservationStatus::Hold, ReservationStatus::Pending],
                ReservationStatus::Pending,
                Some(deadline),
            )
            .await?;
        if !applied {
            return Err(Self::stale(reservation_id, "issue_quote"));
        }

        repo.set_lines_status_tx(&mut tx, reservation_id, ReservationStatus::Pending)
            .await?;
        repo.insert_quote_tx(
            &mut tx,
            &Quote {
                id: generate_id(),
                reservation_id: reservation_id.to_string(),
                external_id: external_id.map(String::from),
                status: QuoteStatus::Open,
                created_at: now,
                updated_at: now,
            },
        )
        .await?;

        tx.commit().await?;

        info!(%reservation_id, ?external_id, %deadline, "Quote issued, reservation pending");
        Ok(())
    }

    // =========================================================================
    // HOLD / PENDING -> CONFIRMED
    // =========================================================================

    /// Confirms a reservation on successful payment.
    ///
    /// Clears the deadline (a confirmed booking never expires), settles
    /// any open invoice as paid, and records the captured payment.
    pub async fn confirm(
        &self,
        reservation_id: &str,
        payment_external_id: Option<&str>,
        amount_cents: i64,
    ) -> EngineResult<()> {
        let reservation = self.require_reservation(reservation_id).await?;
        Self::ensure_legal(&reservation, ReservationStatus::Confirmed)?;
        if amount_cents <= 0 {
            return Err(rentable_core::CoreError::from(ValidationError::MustBePositive {
                field: "amount_cents".to_string(),
            })
            .into());
        }

        let repo = self.db.reservations();
        let mut tx = self.db.begin().await?;

        let applied = repo
            .transition_tx(
                &mut tx,
                reservation_id,
                &[ReservationStatus::Hold, ReservationStatus::Pending],
                ReservationStatus::Confirmed,
                None,
            )
            .await?;
        if !applied {
            return Err(Self::stale(reservation_id, "confirm"));
        }

        repo.set_lines_status_tx(&mut tx, reservation_id, ReservationStatus::Confirmed)
            .await?;
        repo.settle_invoices_tx(&mut tx, reservation_id, InvoiceStatus::Paid)
            .await?;
        repo.settle_quotes_tx(&mut tx, reservation_id, QuoteStatus::Accepted)
            .await?;
        repo.upsert_payment_tx(
            &mut tx,
            reservation_id,
            payment_external_id,
            PaymentStatus::Captured,
            amount_cents,
        )
        .await?;

        tx.commit().await?;

        info!(
            %reservation_id,
            business_id = %reservation.business_id,
            amount_cents,
            "Reservation confirmed"
        );
        Ok(())
    }

    /// Records a failed payment attempt: the reservation stays PENDING
    /// with a freshly re-armed deadline, giving the customer another
    /// payment window before the sweeper reclaims the inventory.
    pub async fn record_payment_failure(
        &self,
        reservation_id: &str,
        payment_external_id: Option<&str>,
    ) -> EngineResult<()> {
        let reservation = self.require_reservation(reservation_id).await?;
        // A failed payment only makes sense once an invoice or quote put
        // the reservation in PENDING; a bare hold has nothing to fail.
        if reservation.status != ReservationStatus::Pending {
            return Err(rentable_core::CoreError::InvalidTransition {
                from: reservation.status.to_string(),
                to: ReservationStatus::Pending.to_string(),
            }
            .into());
        }
        let now = Utc::now();
        let deadline = now + self.config.invoice_ttl;

        let repo = self.db.reservations();
        let mut tx = self.db.begin().await?;

        let applied = repo
            .transition_tx(
                &mut tx,
                reservation_id,
                &[ReservationStatus::Pending],
                ReservationStatus::Pending,
                Some(deadline),
            )
            .await?;
        if !applied {
            return Err(Self::stale(reservation_id, "record_payment_failure"));
        }

        repo.upsert_payment_tx(
            &mut tx,
            reservation_id,
            payment_external_id,
            PaymentStatus::Failed,
            reservation.total_cents,
        )
        .await?;

        tx.commit().await?;

        warn!(%reservation_id, %deadline, "Payment failed, deadline re-armed");
        Ok(())
    }

    // =========================================================================
    // -> CANCELLED / COMPLETED
    // =========================================================================

    /// Cancels a reservation from any active state.
    ///
    /// The local transition commits first; voiding the invoice, quote, and
    /// signature envelope at their providers (and refunding a captured
    /// payment) happen afterwards, best-effort.
    pub async fn cancel(&self, reservation_id: &str, reason: Option<&str>) -> EngineResult<()> {
        let reservation = self.require_reservation(reservation_id).await?;
        Self::ensure_legal(&reservation, ReservationStatus::Cancelled)?;

        let repo = self.db.reservations();
        let invoice = repo.invoice_for(reservation_id).await?;
        let quote = repo.quote_for(reservation_id).await?;
        let payment = repo.payment_for(reservation_id).await?;
        let waiver = repo.waiver_for(reservation_id).await?;

        let mut tx = self.db.begin().await?;

        let applied = repo
            .transition_tx(
                &mut tx,
                reservation_id,
                &[
                    ReservationStatus::Hold,
                    ReservationStatus::Pending,
                    ReservationStatus::Confirmed,
                ],
                ReservationStatus::Cancelled,
                None,
            )
            .await?;
        if !applied {
            return Err(Self::stale(reservation_id, "cancel"));
        }

        repo.set_lines_status_tx(&mut tx, reservation_id, ReservationStatus::Cancelled)
            .await?;
        repo.settle_invoices_tx(&mut tx, reservation_id, InvoiceStatus::Void)
            .await?;
        repo.settle_quotes_tx(&mut tx, reservation_id, QuoteStatus::Void)
            .await?;

        tx.commit().await?;

        info!(%reservation_id, ?reason, "Reservation cancelled");

        self.void_externals(reservation_id, invoice, quote, payment, waiver)
            .await;
        Ok(())
    }

    /// Marks a confirmed reservation as fulfilled.
    pub async fn complete(&self, reservation_id: &str) -> EngineResult<()> {
        let reservation = self.require_reservation(reservation_id).await?;
        Self::ensure_legal(&reservation, ReservationStatus::Completed)?;

        let repo = self.db.reservations();
        let mut tx = self.db.begin().await?;

        let applied = repo
            .transition_tx(
                &mut tx,
                reservation_id,
                &[ReservationStatus::Confirmed],
                ReservationStatus::Completed,
                None,
            )
            .await?;
        if !applied {
            return Err(Self::stale(reservation_id, "complete"));
        }

        repo.set_lines_status_tx(&mut tx, reservation_id, ReservationStatus::Completed)
            .await?;

        tx.commit().await?;

        info!(%reservation_id, "Reservation completed");
        Ok(())
    }

    /// Voids provider-side artifacts after a cancellation or expiry.
    pub(crate) async fn void_externals(
        &self,
        reservation_id: &str,
        invoice: Option<Invoice>,
        quote: Option<Quote>,
        payment: Option<rentable_core::PaymentRecord>,
        waiver: Option<Waiver>,
    ) {
        if let Some(ext) = invoice
            .filter(|i| i.status == InvoiceStatus::Open)
            .and_then(|i| i.external_id)
        {
            self.best_effort("void_invoice", reservation_id, self.payments.void_invoice(&ext))
                .await;
        }
        if let Some(ext) = quote
            .filter(|q| q.status == QuoteStatus::Open)
            .and_then(|q| q.external_id)
        {
            self.best_effort("void_quote", reservation_id, self.payments.void_quote(&ext))
                .await;
        }
        if let Some(p) = payment.filter(|p| p.status == PaymentStatus::Captured) {
            if let Some(ext) = p.external_id {
                self.best_effort(
                    "refund_payment",
                    reservation_id,
                    self.payments.refund_payment(&ext, p.amount_cents),
                )
                .await;
            }
        }
        if let Some(ext) = waiver
            .filter(|w| w.status == WaiverStatus::Sent)
            .and_then(|w| w.external_id)
        {
            self.best_effort("void_envelope", reservation_id, self.signer.void_envelope(&ext))
                .await;
        }
    }

    // =========================================================================
    // Auxiliary records
    // =========================================================================

    /// Attaches externally computed totals to an active reservation.
    pub async fn record_totals(
        &self,
        reservation_id: &str,
        subtotal_cents: i64,
        tax_cents: i64,
    ) -> EngineResult<()> {
        if subtotal_cents < 0 || tax_cents < 0 {
            return Err(rentable_core::CoreError::from(ValidationError::MustBePositive {
                field: "totals".to_string(),
            })
            .into());
        }
        let total_cents = subtotal_cents
            .checked_add(tax_cents)
            .ok_or_else(|| {
                rentable_core::CoreError::from(ValidationError::OutOfRange {
                    field: "total_cents".to_string(),
                    min: 0,
                    max: i64::MAX,
                })
            })?;

        self.db
            .reservations()
            .update_totals(reservation_id, subtotal_cents, tax_cents, total_cents)
            .await?;

        info!(%reservation_id, subtotal_cents, tax_cents, total_cents, "Totals recorded");
        Ok(())
    }

    /// Records that a waiver envelope was sent for signature.
    pub async fn send_waiver(
        &self,
        reservation_id: &str,
        external_id: Option<&str>,
    ) -> EngineResult<()> {
        self.require_reservation(reservation_id).await?;
        let now = Utc::now();

        self.db
            .reservations()
            .insert_waiver(&Waiver {
                id: generate_id(),
                reservation_id: reservation_id.to_string(),
                external_id: external_id.map(String::from),
                status: WaiverStatus::Sent,
                signed_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(%reservation_id, ?external_id, "Waiver sent");
        Ok(())
    }

    /// Records a signed-envelope event from the e-signature provider.
    ///
    /// Touches the waiver row only; reservation status is driven by
    /// payments, not signatures.
    pub async fn record_signed_waiver(
        &self,
        reservation_id: &str,
        signed_at: DateTime<Utc>,
    ) -> EngineResult<()> {
        self.db
            .reservations()
            .mark_waiver_signed(reservation_id, signed_at)
            .await?;

        info!(%reservation_id, %signed_at, "Waiver signed");
        Ok(())
    }
}
