//! # Reservation Repository
//!
//! Database operations for the booking aggregate: reservations, their
//! lines, and the external-correlation rows (invoices, quotes, payments,
//! waivers).
//!
//! ## Guarded Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Optimistic check-then-set, in SQL                          │
//! │                                                                         │
//! │  UPDATE reservations                                                   │
//! │     SET status = <to>, expires_at = <deadline>, updated_at = <now>     │
//! │   WHERE id = ?  AND status IN (<allowed-from set>)                     │
//! │                                                                         │
//! │  rows_affected == 1  → transition applied                              │
//! │  rows_affected == 0  → someone got there first: StaleState upstream    │
//! │                                                                         │
//! │  Two concurrent transition attempts on the same reservation can        │
//! │  therefore never both succeed: the status predicate makes the UPDATE   │
//! │  itself the linearization point.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived Availability
//! `booked_windows_tx` is the single query behind the no-overbooking
//! invariant. It counts a line as committed demand when its parent is
//! `confirmed`, or `hold`/`pending` with a deadline still in the future -
//! the read-time TTL double-check that keeps availability honest between
//! sweeper runs. The query only filters; the arithmetic lives in
//! `rentable_core::conflict` so the resolver and the hold re-check share
//! one definition of "remaining".

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use rentable_core::{
    BookedWindow, Invoice, InvoiceStatus, PaymentRecord, PaymentStatus, Quote, QuoteStatus,
    Reservation, ReservationLine, ReservationStatus, Waiver, WaiverStatus,
};

const RESERVATION_COLUMNS: &str = r#"
    id, business_id, status, start_at, end_at,
    subtotal_cents, tax_cents, total_cents,
    expires_at, created_at, updated_at
"#;

/// One committed line window overlapping a search window.
#[derive(Debug, sqlx::FromRow)]
struct BookedRow {
    item_id: String,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    quantity: i64,
}

/// Repository for reservation database operations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    // =========================================================================
    // Reads (pool)
    // =========================================================================

    /// Gets a reservation by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Reservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1");
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(reservation)
    }

    /// Gets all lines for a reservation.
    pub async fn get_lines(&self, reservation_id: &str) -> DbResult<Vec<ReservationLine>> {
        let lines = sqlx::query_as::<_, ReservationLine>(
            r#"
            SELECT
                id, reservation_id, item_id, quantity,
                start_at, end_at, status, created_at, updated_at
            FROM reservation_lines
            WHERE reservation_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Selects reservations whose hold/pending deadline has passed.
    ///
    /// The sweep candidate query. Re-running it after a partial sweep only
    /// returns rows still matching - already expired rows are excluded by
    /// the status filter, which is what makes the sweep idempotent.
    pub async fn select_expired(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<Reservation>> {
        let sql = format!(
            r#"
            SELECT {RESERVATION_COLUMNS} FROM reservations
            WHERE status IN ('hold', 'pending') AND expires_at <= ?1
            ORDER BY expires_at
            LIMIT ?2
            "#
        );
        let rows = sqlx::query_as::<_, Reservation>(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Selects EXPIRED reservations untouched since before `threshold`.
    ///
    /// The retention candidate query.
    pub async fn select_expired_older_than(
        &self,
        threshold: DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<Reservation>> {
        let sql = format!(
            r#"
            SELECT {RESERVATION_COLUMNS} FROM reservations
            WHERE status = 'expired' AND updated_at < ?1
            ORDER BY updated_at
            LIMIT ?2
            "#
        );
        let rows = sqlx::query_as::<_, Reservation>(&sql)
            .bind(threshold)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    // =========================================================================
    // Derived availability (transaction-scoped)
    // =========================================================================

    /// Fetches committed line windows per item across a search window.
    ///
    /// A line counts when its window intersects `[search_start, search_end)`
    /// and its parent reservation is:
    /// - `confirmed`, or
    /// - `hold`/`pending` with `expires_at > now` (not yet provably expired)
    ///
    /// `exclude` lets an in-progress edit see its own hold as
    /// non-conflicting. Items with no demand are absent from the map.
    ///
    /// Takes a connection so the write path can run the same query inside
    /// its insert transaction.
    pub async fn booked_windows_tx(
        &self,
        conn: &mut SqliteConnection,
        item_ids: &[String],
        search_start: DateTime<Utc>,
        search_end: DateTime<Utc>,
        now: DateTime<Utc>,
        exclude: Option<&str>,
    ) -> DbResult<HashMap<String, Vec<BookedWindow>>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; item_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT rl.item_id AS item_id, rl.start_at AS start_at,
                   rl.end_at AS end_at, rl.quantity AS quantity
            FROM reservation_lines rl
            JOIN reservations r ON r.id = rl.reservation_id
            WHERE rl.item_id IN ({placeholders})
              AND rl.start_at < ?
              AND rl.end_at > ?
              AND (
                    r.status = 'confirmed'
                 OR (r.status IN ('hold', 'pending') AND r.expires_at > ?)
              )
              AND (? IS NULL OR r.id <> ?)
            "#
        );

        let mut query = sqlx::query_as::<_, BookedRow>(&sql);
        for item_id in item_ids {
            query = query.bind(item_id);
        }
        let rows = query
            .bind(search_end)
            .bind(search_start)
            .bind(now)
            .bind(exclude)
            .bind(exclude)
            .fetch_all(conn)
            .await?;

        let mut by_item: HashMap<String, Vec<BookedWindow>> = HashMap::new();
        for row in rows {
            by_item.entry(row.item_id).or_default().push(BookedWindow {
                start: row.start_at,
                end: row.end_at,
                quantity: row.quantity,
            });
        }
        Ok(by_item)
    }

    // =========================================================================
    // Writes (transaction-scoped)
    // =========================================================================

    /// Inserts a reservation row.
    pub async fn insert_tx(
        &self,
        conn: &mut SqliteConnection,
        reservation: &Reservation,
    ) -> DbResult<()> {
        debug!(id = %reservation.id, status = %reservation.status, "Inserting reservation");

        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, business_id, status, start_at, end_at,
                subtotal_cents, tax_cents, total_cents,
                expires_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&reservation.id)
        .bind(&reservation.business_id)
        .bind(reservation.status)
        .bind(reservation.start_at)
        .bind(reservation.end_at)
        .bind(reservation.subtotal_cents)
        .bind(reservation.tax_cents)
        .bind(reservation.total_cents)
        .bind(reservation.expires_at)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a reservation line.
    pub async fn insert_line_tx(
        &self,
        conn: &mut SqliteConnection,
        line: &ReservationLine,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reservation_lines (
                id, reservation_id, item_id, quantity,
                start_at, end_at, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&line.id)
        .bind(&line.reservation_id)
        .bind(&line.item_id)
        .bind(line.quantity)
        .bind(line.start_at)
        .bind(line.end_at)
        .bind(line.status)
        .bind(line.created_at)
        .bind(line.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Applies a guarded status transition.
    ///
    /// Returns `true` when the transition applied, `false` when the
    /// current status was no longer in `allowed_from` (stale).
    /// `expires_at` is written unconditionally: `Some` re-arms the
    /// deadline, `None` clears it, maintaining the status/deadline pairing
    /// invariant in one statement.
    pub async fn transition_tx(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        allowed_from: &[ReservationStatus],
        to: ReservationStatus,
        expires_at: Option<DateTime<Utc>>,
    ) -> DbResult<bool> {
        let now = Utc::now();
        let placeholders = vec!["?"; allowed_from.len()].join(", ");
        let sql = format!(
            r#"
            UPDATE reservations
            SET status = ?, expires_at = ?, updated_at = ?
            WHERE id = ? AND status IN ({placeholders})
            "#
        );

        let mut query = sqlx::query(&sql).bind(to).bind(expires_at).bind(now).bind(id);
        for from in allowed_from {
            query = query.bind(*from);
        }
        let result = query.execute(conn).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sweep transition: hold/pending -> expired, but only when the
    /// deadline has actually passed at `now`.
    ///
    /// The deadline predicate is repeated here (not just in the candidate
    /// select) so a reservation revived between select and sweep - say a
    /// payment webhook re-armed its deadline - is skipped.
    pub async fn expire_tx(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'expired', expires_at = NULL, updated_at = ?2
            WHERE id = ?1 AND status IN ('hold', 'pending') AND expires_at <= ?2
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bulk-updates the mirrored status on every line of a reservation.
    pub async fn set_lines_status_tx(
        &self,
        conn: &mut SqliteConnection,
        reservation_id: &str,
        status: ReservationStatus,
    ) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE reservation_lines SET status = ?2, updated_at = ?3
            WHERE reservation_id = ?1
            "#,
        )
        .bind(reservation_id)
        .bind(status)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Updates the denormalized money summary.
    ///
    /// Guarded to non-terminal states: totals attached after an external
    /// tax calculation must never resurrect a cancelled reservation's
    /// numbers.
    pub async fn update_totals(
        &self,
        id: &str,
        subtotal_cents: i64,
        tax_cents: i64,
        total_cents: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE reservations SET
                subtotal_cents = ?2,
                tax_cents = ?3,
                total_cents = ?4,
                updated_at = ?5
            WHERE id = ?1 AND status IN ('hold', 'pending', 'confirmed')
            "#,
        )
        .bind(id)
        .bind(subtotal_cents)
        .bind(tax_cents)
        .bind(total_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Reservation (active)", id));
        }

        Ok(())
    }

    // =========================================================================
    // External correlations
    // =========================================================================

    /// Gets the newest invoice for a reservation, if any.
    pub async fn invoice_for(&self, reservation_id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, reservation_id, external_id, status, expires_at,
                   created_at, updated_at
            FROM invoices
            WHERE reservation_id = ?1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Gets the newest quote for a reservation, if any.
    pub async fn quote_for(&self, reservation_id: &str) -> DbResult<Option<Quote>> {
        let quote = sqlx::query_as::<_, Quote>(
            r#"
            SELECT id, reservation_id, external_id, status,
                   created_at, updated_at
            FROM quotes
            WHERE reservation_id = ?1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quote)
    }

    /// Gets the newest payment record for a reservation, if any.
    pub async fn payment_for(&self, reservation_id: &str) -> DbResult<Option<PaymentRecord>> {
        let payment = sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT id, reservation_id, external_id, status, amount_cents,
                   created_at, updated_at
            FROM payments
            WHERE reservation_id = ?1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Gets the newest waiver for a reservation, if any.
    pub async fn waiver_for(&self, reservation_id: &str) -> DbResult<Option<Waiver>> {
        let waiver = sqlx::query_as::<_, Waiver>(
            r#"
            SELECT id, reservation_id, external_id, status, signed_at,
                   created_at, updated_at
            FROM waivers
            WHERE reservation_id = ?1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(waiver)
    }

    /// Inserts an invoice correlation row.
    pub async fn insert_invoice_tx(
        &self,
        conn: &mut SqliteConnection,
        invoice: &Invoice,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, reservation_id, external_id, status, expires_at,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.reservation_id)
        .bind(&invoice.external_id)
        .bind(invoice.status)
        .bind(invoice.expires_at)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a quote correlation row.
    pub async fn insert_quote_tx(
        &self,
        conn: &mut SqliteConnection,
        quote: &Quote,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quotes (
                id, reservation_id, external_id, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&quote.id)
        .bind(&quote.reservation_id)
        .bind(&quote.external_id)
        .bind(quote.status)
        .bind(quote.created_at)
        .bind(quote.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a waiver correlation row.
    pub async fn insert_waiver(&self, waiver: &Waiver) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO waivers (
                id, reservation_id, external_id, status, signed_at,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&waiver.id)
        .bind(&waiver.reservation_id)
        .bind(&waiver.external_id)
        .bind(waiver.status)
        .bind(waiver.signed_at)
        .bind(waiver.created_at)
        .bind(waiver.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Settles open invoices for a reservation to `status`.
    ///
    /// Only `open` rows move; a voided invoice can never become paid.
    pub async fn settle_invoices_tx(
        &self,
        conn: &mut SqliteConnection,
        reservation_id: &str,
        status: InvoiceStatus,
    ) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE invoices SET status = ?2, updated_at = ?3
            WHERE reservation_id = ?1 AND status = 'open'
            "#,
        )
        .bind(reservation_id)
        .bind(status)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Settles open quotes for a reservation to `status`.
    pub async fn settle_quotes_tx(
        &self,
        conn: &mut SqliteConnection,
        reservation_id: &str,
        status: QuoteStatus,
    ) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE quotes SET status = ?2, updated_at = ?3
            WHERE reservation_id = ?1 AND status = 'open'
            "#,
        )
        .bind(reservation_id)
        .bind(status)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Records a payment outcome: updates the existing record for the
    /// reservation or inserts one if the webhook arrived first.
    pub async fn upsert_payment_tx(
        &self,
        conn: &mut SqliteConnection,
        reservation_id: &str,
        external_id: Option<&str>,
        status: PaymentStatus,
        amount_cents: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = ?2, external_id = COALESCE(?3, external_id),
                amount_cents = ?4, updated_at = ?5
            WHERE reservation_id = ?1
            "#,
        )
        .bind(reservation_id)
        .bind(status)
        .bind(external_id)
        .bind(amount_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            sqlx::query(
                r#"
                INSERT INTO payments (
                    id, reservation_id, external_id, status, amount_cents,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(super::generate_id())
            .bind(reservation_id)
            .bind(external_id)
            .bind(status)
            .bind(amount_cents)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await?;
        }

        Ok(())
    }

    /// Marks a reservation's waiver as signed.
    ///
    /// Driven by the e-signature webhook; touches the waiver row only.
    pub async fn mark_waiver_signed(
        &self,
        reservation_id: &str,
        signed_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE waivers SET status = 'signed', signed_at = ?2, updated_at = ?2
            WHERE reservation_id = ?1 AND status = 'sent'
            "#,
        )
        .bind(reservation_id)
        .bind(signed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Waiver (sent)", reservation_id));
        }

        Ok(())
    }

    // =========================================================================
    // Retention cascade
    // =========================================================================

    /// Hard-deletes a reservation and every dependent row.
    ///
    /// Dependency order: lines and correlation rows first, the reservation
    /// last, all on the caller's transaction.
    pub async fn purge_tx(
        &self,
        conn: &mut SqliteConnection,
        reservation_id: &str,
    ) -> DbResult<()> {
        for table in [
            "reservation_lines",
            "payments",
            "waivers",
            "invoices",
            "quotes",
        ] {
            let sql = format!("DELETE FROM {table} WHERE reservation_id = ?1");
            sqlx::query(&sql)
                .bind(reservation_id)
                .execute(&mut *conn)
                .await?;
        }

        sqlx::query("DELETE FROM reservations WHERE id = ?1")
            .bind(reservation_id)
            .execute(conn)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
