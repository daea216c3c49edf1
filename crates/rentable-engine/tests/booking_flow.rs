//! End-to-end booking lifecycle tests against an in-memory database.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use rentable_core::{
    Business, CoreError, InventoryItem, InvoiceStatus, ItemStatus, NoticeBound, PaymentStatus,
    ReservationStatus, ValidationError, WaiverStatus,
};
use rentable_db::{Database, DbConfig};
use rentable_engine::{
    AvailabilityService, BookingService, EngineConfig, EngineError, HoldLineRequest, HoldRequest,
    HoldSweeper, MemoryGateway, RetentionSweeper, WindowRequest,
};

struct Harness {
    db: Database,
    availability: AvailabilityService,
    booking: BookingService,
    sweeper: HoldSweeper,
    retention: RetentionSweeper,
    gateway: Arc<MemoryGateway>,
}

async fn harness() -> Harness {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let config = EngineConfig::default();
    let gateway = Arc::new(MemoryGateway::new());
    let booking = BookingService::new(
        db.clone(),
        config.clone(),
        gateway.clone(),
        gateway.clone(),
    );
    Harness {
        availability: AvailabilityService::new(db.clone(), config.clone()),
        sweeper: HoldSweeper::new(db.clone(), config.clone(), booking.clone()),
        retention: RetentionSweeper::new(db.clone(), config),
        booking,
        gateway,
        db,
    }
}

async fn seed_business(h: &Harness, business: Business) {
    h.db.businesses().insert(&business).await.unwrap();
}

fn business(id: &str) -> Business {
    let now = Utc::now();
    Business {
        id: id.to_string(),
        name: "Bounce Co".to_string(),
        timezone: "UTC".to_string(),
        min_notice_hours: 0,
        max_notice_hours: 876_000,
        pre_buffer_hours: 0,
        post_buffer_hours: 0,
        min_total_cents: None,
        created_at: now,
        updated_at: now,
    }
}

async fn seed_item(h: &Harness, id: &str, business_id: &str, quantity: i64, price: i64) {
    let now = Utc::now();
    h.db.inventory()
        .insert(&InventoryItem {
            id: id.to_string(),
            business_id: business_id.to_string(),
            name: format!("Item {id}"),
            quantity,
            unit_price_cents: price,
            status: ItemStatus::Available,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

fn window(start: &str, end: &str) -> WindowRequest {
    WindowRequest {
        date: "2099-06-01".to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        timezone: None,
    }
}

fn hold_request(business_id: &str, item_id: &str, quantity: i64, w: WindowRequest) -> HoldRequest {
    HoldRequest {
        business_id: business_id.to_string(),
        window: w,
        lines: vec![HoldLineRequest {
            item_id: item_id.to_string(),
            quantity,
        }],
    }
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2099, 6, 1, hour, minute, 0).unwrap()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_full_booking_lifecycle() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 2, 15_000).await;

    // Hold one of two castles for 10:00-12:00
    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Hold);
    assert!(reservation.expires_at.is_some());
    assert_eq!(reservation.subtotal_cents, 15_000);
    assert_eq!(reservation.start_at, at(10, 0));
    assert_eq!(reservation.end_at, at(12, 0));

    // The hold consumes one unit
    let report = h
        .availability
        .resolve("biz-1", &window("10:00", "12:00"), None)
        .await
        .unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].remaining, 1);

    // Invoice out: hold -> pending, deadline re-armed to the invoice
    h.booking
        .issue_invoice(&reservation.id, Some("inv-ext-1"), None)
        .await
        .unwrap();
    let fetched = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ReservationStatus::Pending);
    assert!(fetched.expires_at.is_some());
    let invoice = h.db.reservations().invoice_for(&reservation.id).await.unwrap().unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Open);

    // Payment lands: pending -> confirmed, deadline cleared, invoice paid
    h.booking
        .confirm(&reservation.id, Some("pay-ext-1"), 15_000)
        .await
        .unwrap();
    let fetched = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ReservationStatus::Confirmed);
    assert!(fetched.expires_at.is_none());
    assert!(fetched.deadline_consistent());
    let invoice = h.db.reservations().invoice_for(&reservation.id).await.unwrap().unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    let payment = h.db.reservations().payment_for(&reservation.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Captured);
    assert_eq!(payment.amount_cents, 15_000);

    // Lines mirror the parent
    let lines = h.db.reservations().get_lines(&reservation.id).await.unwrap();
    assert!(lines.iter().all(|l| l.status == ReservationStatus::Confirmed));

    // Rental fulfilled
    h.booking.complete(&reservation.id).await.unwrap();
    let fetched = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ReservationStatus::Completed);
}

#[tokio::test]
async fn test_conflict_on_last_unit() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    h.availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();

    // Overlapping request for the same single unit loses
    let err = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("11:00", "13:00")))
        .await
        .unwrap_err();
    match err {
        EngineError::Conflict {
            item_id,
            requested,
            remaining,
        } => {
            assert_eq!(item_id, "castle");
            assert_eq!(requested, 1);
            assert_eq!(remaining, 0);
        }
        other => panic!("expected Conflict, got {other:?}"),
    }

    // Adjacent half-open window is fine
    h.availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("12:00", "14:00")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_post_buffer_blocks_turnaround_window() {
    let h = harness().await;
    let mut biz = business("biz-1");
    biz.post_buffer_hours = 2;
    seed_business(&h, biz).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    h.availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("08:00", "10:00")))
        .await
        .unwrap();

    // Booking ends 10:00 with a 2h teardown; 11:00 start is too soon
    let err = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("11:00", "13:00")))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict { .. }));

    // Exactly at the buffer boundary is free
    h.availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("12:00", "14:00")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_notice_bounds() {
    let h = harness().await;
    let mut biz = business("biz-1");
    biz.min_notice_hours = 24;
    seed_business(&h, biz).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    // One hour of lead time against a 24h minimum
    let err = h
        .availability
        .create_hold_at(
            &hold_request("biz-1", "castle", 1, window("10:00", "12:00")),
            at(9, 0),
        )
        .await
        .unwrap_err();
    match err {
        EngineError::Core(CoreError::NoticeViolation { bound, .. }) => {
            assert_eq!(bound, NoticeBound::Minimum);
        }
        other => panic!("expected NoticeViolation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_minimum_total_enforced() {
    let h = harness().await;
    let mut biz = business("biz-1");
    biz.min_total_cents = Some(50_000);
    seed_business(&h, biz).await;
    seed_item(&h, "castle", "biz-1", 5, 10_000).await;

    let err = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::MinimumAmountViolation {
            subtotal_cents: 10_000,
            minimum_cents: 50_000,
        })
    ));

    // Five units clear the minimum
    h.availability
        .create_hold(&hold_request("biz-1", "castle", 5, window("10:00", "12:00")))
        .await
        .unwrap();
}

// =============================================================================
// Expiration & retention
// =============================================================================

#[tokio::test]
async fn test_hold_expiration_sweep_is_idempotent() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let t0 = at(8, 0);
    let reservation = h
        .availability
        .create_hold_at(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")), t0)
        .await
        .unwrap();

    // Before the 30-minute TTL: nothing to do
    assert_eq!(h.sweeper.sweep(t0 + Duration::minutes(29)).await.unwrap(), 0);

    // Past the TTL: exactly one expiry, lines mirrored
    assert_eq!(h.sweeper.sweep(t0 + Duration::minutes(31)).await.unwrap(), 1);
    let fetched = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ReservationStatus::Expired);
    assert!(fetched.expires_at.is_none());
    let lines = h.db.reservations().get_lines(&reservation.id).await.unwrap();
    assert!(lines.iter().all(|l| l.status == ReservationStatus::Expired));

    // Second pass over the same data is a no-op
    assert_eq!(h.sweeper.sweep(t0 + Duration::minutes(31)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_confirmed_reservations_never_expire() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let t0 = at(8, 0);
    let reservation = h
        .availability
        .create_hold_at(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")), t0)
        .await
        .unwrap();
    h.booking.confirm(&reservation.id, None, 15_000).await.unwrap();

    assert_eq!(h.sweeper.sweep(t0 + Duration::days(365)).await.unwrap(), 0);
    let fetched = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ReservationStatus::Confirmed);
}

#[tokio::test]
async fn test_expired_hold_frees_inventory_and_voids_invoice() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let t0 = at(8, 0);
    let reservation = h
        .availability
        .create_hold_at(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")), t0)
        .await
        .unwrap();
    h.booking
        .issue_invoice(&reservation.id, Some("inv-ext-1"), Some(t0 + Duration::minutes(30)))
        .await
        .unwrap();

    assert_eq!(h.sweeper.sweep(t0 + Duration::hours(1)).await.unwrap(), 1);

    let invoice = h.db.reservations().invoice_for(&reservation.id).await.unwrap().unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Void);
    assert!(h
        .gateway
        .calls()
        .await
        .contains(&"void_invoice:inv-ext-1".to_string()));

    // The unit is bookable again
    h.availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sweep_survives_per_reservation_storage_failure() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 2, 15_000).await;

    let t0 = at(8, 0);
    for _ in 0..2 {
        h.availability
            .create_hold_at(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")), t0)
            .await
            .unwrap();
    }

    // Break the invoice lookup out from under the sweeper; each row's
    // failure must be contained, not abort the pass.
    sqlx::query("DROP TABLE invoices")
        .execute(h.db.pool())
        .await
        .unwrap();

    assert_eq!(h.sweeper.sweep(t0 + Duration::hours(1)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_retention_purges_only_long_expired() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 2, 15_000).await;

    let t0 = at(8, 0);
    let first = h
        .availability
        .create_hold_at(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")), t0)
        .await
        .unwrap();
    let second = h
        .availability
        .create_hold_at(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")), t0)
        .await
        .unwrap();

    assert_eq!(h.sweeper.sweep(t0 + Duration::hours(1)).await.unwrap(), 2);

    // Inside the grace period nothing is purged
    assert_eq!(h.retention.purge(t0 + Duration::days(29)).await.unwrap(), 0);

    let purged = h.retention.purge(t0 + Duration::days(31)).await.unwrap();
    assert_eq!(purged, 2);
    assert!(h.db.reservations().get_by_id(&first.id).await.unwrap().is_none());
    assert!(h.db.reservations().get_lines(&second.id).await.unwrap().is_empty());

    // Idempotent
    assert_eq!(h.retention.purge(t0 + Duration::days(31)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_retention_ignores_cancelled_and_completed() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();
    h.booking.cancel(&reservation.id, Some("customer request")).await.unwrap();

    assert_eq!(h.retention.purge(Utc::now() + Duration::days(365)).await.unwrap(), 0);
    assert!(h.db.reservations().get_by_id(&reservation.id).await.unwrap().is_some());
}

// =============================================================================
// Cancellation & payment edges
// =============================================================================

#[tokio::test]
async fn test_cancel_confirmed_refunds_and_voids() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();
    h.booking.confirm(&reservation.id, Some("pay-ext-1"), 15_000).await.unwrap();
    h.booking.send_waiver(&reservation.id, Some("env-1")).await.unwrap();

    h.booking.cancel(&reservation.id, None).await.unwrap();

    let fetched = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ReservationStatus::Cancelled);

    let calls = h.gateway.calls().await;
    assert!(calls.contains(&"refund_payment:pay-ext-1:15000".to_string()));
    assert!(calls.contains(&"void_envelope:env-1".to_string()));

    // Inventory is free again
    h.availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_gateway_failure_never_blocks_cancellation() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();
    h.booking.issue_invoice(&reservation.id, Some("inv-ext-1"), None).await.unwrap();

    h.gateway.fail_all();
    h.booking.cancel(&reservation.id, None).await.unwrap();

    let fetched = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ReservationStatus::Cancelled);
}

#[tokio::test]
async fn test_payment_failure_rearms_deadline() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();
    h.booking.issue_invoice(&reservation.id, None, None).await.unwrap();

    let before = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    h.booking
        .record_payment_failure(&reservation.id, Some("pay-ext-1"))
        .await
        .unwrap();

    let after = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(after.status, ReservationStatus::Pending);
    assert!(after.expires_at.unwrap() >= before.expires_at.unwrap());
    let payment = h.db.reservations().payment_for(&reservation.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn test_payment_failure_on_bare_hold_is_rejected() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    // No invoice or quote yet, so there is no payment attempt to fail
    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();
    let err = h
        .booking
        .record_payment_failure(&reservation.id, Some("pay-ext-1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidTransition { .. })
    ));

    let fetched = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ReservationStatus::Hold);
    assert!(h.db.reservations().payment_for(&reservation.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_confirm_rejects_non_positive_amount() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();

    for amount in [0, -15_000] {
        let err = h
            .booking
            .confirm(&reservation.id, None, amount)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
    }

    let fetched = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ReservationStatus::Hold);
}

#[tokio::test]
async fn test_illegal_transitions_are_rejected() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();

    // Completing a bare hold skips confirmation
    let err = h.booking.complete(&reservation.id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidTransition { .. })
    ));

    // Terminal states admit nothing
    h.booking.cancel(&reservation.id, None).await.unwrap();
    let err = h.booking.cancel(&reservation.id, None).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidTransition { .. })
    ));
    let err = h.booking.confirm(&reservation.id, None, 15_000).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_signed_waiver_updates_waiver_only() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();
    h.booking.send_waiver(&reservation.id, Some("env-1")).await.unwrap();
    h.booking
        .record_signed_waiver(&reservation.id, Utc::now())
        .await
        .unwrap();

    let waiver = h.db.reservations().waiver_for(&reservation.id).await.unwrap().unwrap();
    assert_eq!(waiver.status, WaiverStatus::Signed);

    // Reservation status untouched by the signature event
    let fetched = h.db.reservations().get_by_id(&reservation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ReservationStatus::Hold);
}

#[tokio::test]
async fn test_fully_booked_item_drops_from_report() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;
    seed_item(&h, "slide", "biz-1", 2, 9_000).await;

    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
        .await
        .unwrap();

    let report = h
        .availability
        .resolve("biz-1", &window("10:00", "12:00"), None)
        .await
        .unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].item_id, "slide");

    // Excluding the hold lets an edit see its own unit as free
    let report = h
        .availability
        .resolve("biz-1", &window("10:00", "12:00"), Some(reservation.id.as_str()))
        .await
        .unwrap();
    assert_eq!(report.len(), 2);
}

#[tokio::test]
async fn test_concurrent_holds_cannot_overbook() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let availability = h.availability.clone();
        tasks.push(tokio::spawn(async move {
            availability
                .create_hold(&hold_request("biz-1", "castle", 1, window("10:00", "12:00")))
                .await
        }));
    }

    let mut won = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            won += 1;
        }
    }
    assert_eq!(won, 1);

    let report = h
        .availability
        .resolve("biz-1", &window("10:00", "12:00"), None)
        .await
        .unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_timezone_override_shifts_window() {
    let h = harness().await;
    seed_business(&h, business("biz-1")).await;
    seed_item(&h, "castle", "biz-1", 1, 15_000).await;

    let mut w = window("10:00", "12:00");
    w.timezone = Some("America/Chicago".to_string());

    // June 1st is CDT (UTC-5)
    let reservation = h
        .availability
        .create_hold(&hold_request("biz-1", "castle", 1, w))
        .await
        .unwrap();
    assert_eq!(reservation.start_at, at(15, 0));
    assert_eq!(reservation.end_at, at(17, 0));
}
