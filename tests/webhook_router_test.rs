use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::json;
use test_context::{test_context, AsyncTestContext};
use uuid::Uuid;

use train_booking_system::models::booking::{
    Booking, BookingStatus, PaymentDetails, PaymentStatus, RefundStatus, SourceOrigin,
    TrainDetails,
};
use train_booking_system::store::BookingStore;
use train_booking_system::utils::error::AppError;

mod common {
    pub mod test_utils;
}
use common::test_utils::{
    captured_event_body, client_event, harness, sample_draft, signed_webhook, Harness,
};

struct RouterContext {
    harness: Harness,
}

#[async_trait]
impl AsyncTestContext for RouterContext {
    async fn setup() -> Self {
        RouterContext { harness: harness() }
    }

    async fn teardown(self) {}
}

/// A booking that exists but has not been confirmed yet, as if the
/// order was registered and the payer never finished. Inserted
/// directly; no API path creates unconfirmed bookings.
fn pending_booking(order_id: &str, transaction_id: &str) -> Booking {
    let now = Utc::now();
    Booking {
        id: Uuid::new_v4(),
        user_id: Some(7),
        train: TrainDetails {
            train_id: "12951".to_string(),
            train_name: "Rajdhani Express".to_string(),
            train_number: "12951".to_string(),
            from_station: "NDLS".to_string(),
            to_station: "BCT".to_string(),
            journey_date: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
            departure_time: None,
            arrival_time: None,
            selected_class: "3A".to_string(),
        },
        passengers: Vec::new(),
        total_fare: 126000,
        payment: PaymentDetails {
            transaction_id: transaction_id.to_string(),
            gateway_order_id: Some(order_id.to_string()),
            gateway: "razorpay".to_string(),
            amount: 126000,
            currency: "INR".to_string(),
            status: PaymentStatus::Pending,
            payment_date: None,
        },
        status: BookingStatus::PendingPayment,
        pnr_number: None,
        refund_status: None,
        source_origin: SourceOrigin::Client,
        ticket_document_ref: None,
        created_at: now,
        updated_at: now,
    }
}

fn failed_event_body(order_id: &str, payment_id: &str) -> serde_json::Value {
    json!({
        "event": "payment.failed",
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "amount": 126000,
                    "currency": "INR",
                    "status": "failed"
                }
            }
        },
        "created_at": 1767004800
    })
}

fn refund_event_body(event: &str, payment_id: &str) -> serde_json::Value {
    json!({
        "event": event,
        "payload": {
            "refund": {
                "entity": {
                    "id": "rfnd_1",
                    "payment_id": payment_id,
                    "status": "processed"
                }
            }
        },
        "created_at": 1767004800
    })
}

#[test_context(RouterContext)]
#[tokio::test]
async fn captured_event_creates_a_minimal_booking(ctx: &RouterContext) -> anyhow::Result<()> {
    let body = captured_event_body(
        "order_300",
        "pay_300",
        84000,
        json!({
            "train_id": "12009",
            "train_name": "Shatabdi Express",
            "from_station": "NDLS",
            "to_station": "LKO",
            "selected_class": "CC",
            "journey_date": "2026-11-02",
            "user_id": "42"
        }),
    );
    let (raw, signature) = signed_webhook(&body);
    let event = ctx
        .harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;
    assert_eq!(event, "payment.captured");

    let booking = ctx
        .harness
        .store
        .find_by_transaction_id("pay_300")
        .await?
        .expect("booking created from webhook alone");
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.source_origin, SourceOrigin::WebhookOnly);
    assert_eq!(booking.user_id, Some(42));
    assert_eq!(booking.train.train_name, "Shatabdi Express");
    assert_eq!(booking.train.selected_class, "CC");
    assert_eq!(
        booking.train.journey_date,
        NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()
    );
    assert_eq!(booking.total_fare, 84000);
    assert!(booking.passengers.is_empty());
    assert!(booking.pnr_number.is_some());
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn tampered_webhook_body_is_rejected(ctx: &RouterContext) -> anyhow::Result<()> {
    let body = captured_event_body("order_301", "pay_301", 126000, json!({}));
    let (raw, signature) = signed_webhook(&body);
    let tampered = raw.replace("126000", "1");

    let result = ctx
        .harness
        .service
        .route_webhook(tampered.as_bytes(), &signature)
        .await;

    assert!(matches!(result, Err(AppError::SignatureInvalid)));
    assert_eq!(ctx.harness.store.booking_count(), 0);
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn duplicate_webhook_delivery_is_a_noop(ctx: &RouterContext) -> anyhow::Result<()> {
    let body = captured_event_body("order_302", "pay_302", 126000, json!({}));
    let (raw, signature) = signed_webhook(&body);

    ctx.harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;
    let first = ctx
        .harness
        .store
        .find_by_transaction_id("pay_302")
        .await?
        .unwrap();

    // Gateway redelivers the same event.
    ctx.harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;
    let second = ctx
        .harness
        .store
        .find_by_transaction_id("pay_302")
        .await?
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.pnr_number, second.pnr_number);
    assert_eq!(ctx.harness.store.booking_count(), 1);
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn order_paid_is_keyed_by_the_order_id(ctx: &RouterContext) -> anyhow::Result<()> {
    let body = json!({
        "event": "order.paid",
        "payload": {
            "order": {
                "entity": {
                    "id": "order_303",
                    "amount": 126000,
                    "currency": "INR"
                }
            }
        },
        "created_at": 1767004800
    });
    let (raw, signature) = signed_webhook(&body);
    let event = ctx
        .harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;
    assert_eq!(event, "order.paid");

    let booking = ctx
        .harness
        .store
        .find_by_transaction_id("order_303")
        .await?
        .expect("order.paid carries no payment entity, so the order id keys the booking");
    assert_eq!(booking.status, BookingStatus::Confirmed);
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn failed_payment_never_creates_a_booking(ctx: &RouterContext) -> anyhow::Result<()> {
    let body = failed_event_body("order_304", "pay_304");
    let (raw, signature) = signed_webhook(&body);

    let event = ctx
        .harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;

    assert_eq!(event, "payment.failed");
    assert_eq!(ctx.harness.store.booking_count(), 0);
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn failed_payment_marks_a_pending_booking(ctx: &RouterContext) -> anyhow::Result<()> {
    ctx.harness
        .store
        .insert(pending_booking("order_305", "pay_305"))
        .await?;

    let body = failed_event_body("order_305", "pay_305");
    let (raw, signature) = signed_webhook(&body);
    ctx.harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;

    let booking = ctx
        .harness
        .store
        .find_by_transaction_id("pay_305")
        .await?
        .unwrap();
    assert_eq!(booking.payment.status, PaymentStatus::Failed);
    assert_eq!(booking.status, BookingStatus::PendingPayment);
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn failed_payment_never_downgrades_a_confirmed_booking(
    ctx: &RouterContext,
) -> anyhow::Result<()> {
    let confirmed = ctx
        .harness
        .service
        .reconcile(
            client_event("order_306", "pay_306"),
            Some(sample_draft()),
            Some(7),
        )
        .await?;

    // A stale failure event arrives after the capture already settled.
    let body = failed_event_body("order_306", "pay_306");
    let (raw, signature) = signed_webhook(&body);
    ctx.harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;

    let booking = ctx
        .harness
        .store
        .find_by_transaction_id("pay_306")
        .await?
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment.status, PaymentStatus::Successful);
    assert_eq!(booking.pnr_number, confirmed.pnr_number);
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn authorized_is_an_intermediate_state_only(ctx: &RouterContext) -> anyhow::Result<()> {
    let body = json!({
        "event": "payment.authorized",
        "payload": {
            "payment": {
                "entity": {
                    "id": "pay_307",
                    "order_id": "order_307",
                    "amount": 126000,
                    "currency": "INR",
                    "status": "authorized"
                }
            }
        },
        "created_at": 1767004800
    });
    let (raw, signature) = signed_webhook(&body);
    ctx.harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;

    // Authorization alone never confirms and never creates.
    assert_eq!(ctx.harness.store.booking_count(), 0);
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn refund_events_layer_onto_a_confirmed_booking(ctx: &RouterContext) -> anyhow::Result<()> {
    ctx.harness
        .service
        .reconcile(
            client_event("order_308", "pay_308"),
            Some(sample_draft()),
            Some(7),
        )
        .await?;

    let (raw, signature) = signed_webhook(&refund_event_body("refund.created", "pay_308"));
    ctx.harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;
    let booking = ctx
        .harness
        .store
        .find_by_transaction_id("pay_308")
        .await?
        .unwrap();
    assert_eq!(booking.refund_status, Some(RefundStatus::Initiated));
    assert_eq!(booking.status, BookingStatus::Confirmed);

    let (raw, signature) = signed_webhook(&refund_event_body("refund.processed", "pay_308"));
    ctx.harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;
    let booking = ctx
        .harness
        .store
        .find_by_transaction_id("pay_308")
        .await?
        .unwrap();
    assert_eq!(booking.refund_status, Some(RefundStatus::Completed));
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn refund_for_an_unknown_payment_is_acknowledged(ctx: &RouterContext) -> anyhow::Result<()> {
    let (raw, signature) = signed_webhook(&refund_event_body("refund.created", "pay_none"));
    let event = ctx
        .harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;
    assert_eq!(event, "refund.created");
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn unrecognized_event_types_are_acknowledged(ctx: &RouterContext) -> anyhow::Result<()> {
    let body = json!({
        "event": "settlement.processed",
        "payload": {},
        "created_at": 1767004800
    });
    let (raw, signature) = signed_webhook(&body);

    let event = ctx
        .harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;

    assert_eq!(event, "settlement.processed");
    assert_eq!(ctx.harness.store.booking_count(), 0);
    Ok(())
}

#[test_context(RouterContext)]
#[tokio::test]
async fn malformed_body_with_a_valid_signature_is_still_acked(
    ctx: &RouterContext,
) -> anyhow::Result<()> {
    // A non-200 here would make the gateway redeliver the same broken
    // payload forever.
    let raw = "not json at all";
    let signature = common::test_utils::sign_webhook_raw(raw);

    let event = ctx
        .harness
        .service
        .route_webhook(raw.as_bytes(), &signature)
        .await?;

    assert_eq!(event, "unknown");
    assert_eq!(ctx.harness.store.booking_count(), 0);
    Ok(())
}
