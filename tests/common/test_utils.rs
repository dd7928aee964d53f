use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use train_booking_system::models::booking::{Booking, BookingDraft, Passenger, TrainDetails};
use train_booking_system::models::fare::Quota;
use train_booking_system::models::payment::{ConfirmationEvent, ConfirmationSource};
use train_booking_system::services::booking_service::BookingService;
use train_booking_system::services::renderer_service::{RenderError, TicketRenderer};
use train_booking_system::store::memory::InMemoryBookingStore;
use train_booking_system::store::BookingStore;
use train_booking_system::utils::config::{AppConfig, GatewayConfig};
use train_booking_system::utils::signature::{client_confirmation_payload, sign};

pub const CLIENT_SECRET: &str = "test-key-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "mysql://unused".to_string(),
        gateway: GatewayConfig {
            base_url: "http://localhost:0".to_string(),
            key_id: "test_key_id".to_string(),
            key_secret: CLIENT_SECRET.to_string(),
            name: "razorpay".to_string(),
        },
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        allow_unsigned: false,
        ticket_output_dir: PathBuf::from("target/test-tickets"),
    }
}

/// Renderer that succeeds without touching the filesystem and counts
/// how often it ran.
pub struct StubRenderer {
    pub calls: AtomicUsize,
}

impl StubRenderer {
    pub fn new() -> Self {
        StubRenderer {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TicketRenderer for StubRenderer {
    async fn render(&self, booking: &Booking) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("tickets/{}.txt", booking.id))
    }
}

/// Renderer that always fails, for the rendering-is-non-fatal tests.
pub struct FailingRenderer;

#[async_trait]
impl TicketRenderer for FailingRenderer {
    async fn render(&self, _booking: &Booking) -> Result<String, RenderError> {
        Err(RenderError::Failed("renderer exploded".to_string()))
    }
}

pub struct Harness {
    pub store: Arc<InMemoryBookingStore>,
    pub service: Arc<BookingService>,
}

pub fn harness() -> Harness {
    harness_with_renderer(Arc::new(StubRenderer::new()))
}

pub fn harness_with_renderer(renderer: Arc<dyn TicketRenderer>) -> Harness {
    let store = Arc::new(InMemoryBookingStore::new());
    let store_dyn: Arc<dyn BookingStore> = store.clone();
    let service = Arc::new(BookingService::new(store_dyn, renderer, &test_config()));
    Harness { store, service }
}

pub fn sample_draft() -> BookingDraft {
    let mut class_fares = HashMap::new();
    class_fares.insert("SL".to_string(), 50000);
    class_fares.insert("3A".to_string(), 120000);

    BookingDraft {
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
        passengers: vec![Passenger {
            name: "Asha Verma".to_string(),
            age: 34,
            gender: "female".to_string(),
            seat_number: None,
        }],
        class_fares,
        discount_code: None,
        quota: Quota::General,
        declared_total_fare: None,
    }
}

/// Client-path confirmation with a valid signature for the harness
/// secrets.
pub fn client_event(order_id: &str, payment_id: &str) -> ConfirmationEvent {
    let payload = client_confirmation_payload(order_id, payment_id);
    ConfirmationEvent {
        source: ConfirmationSource::Client,
        gateway_order_id: Some(order_id.to_string()),
        gateway_payment_id: Some(payment_id.to_string()),
        signature: sign(payload.as_bytes(), CLIENT_SECRET),
        signed_payload: payload.clone().into_bytes(),
        amount: None,
        currency: None,
        notes: HashMap::new(),
        received_at: Utc::now(),
    }
}

/// Serialize a webhook body and sign the exact bytes the router will
/// see.
pub fn signed_webhook(body: &serde_json::Value) -> (String, String) {
    let raw = body.to_string();
    let signature = sign(raw.as_bytes(), WEBHOOK_SECRET);
    (raw, signature)
}

pub fn sign_webhook_raw(raw: &str) -> String {
    sign(raw.as_bytes(), WEBHOOK_SECRET)
}

pub fn captured_event_body(
    order_id: &str,
    payment_id: &str,
    amount: i64,
    notes: serde_json::Value,
) -> serde_json::Value {
    json!({
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "amount": amount,
                    "currency": "INR",
                    "status": "captured",
                    "notes": notes
                }
            }
        },
        "created_at": 1767004800
    })
}
