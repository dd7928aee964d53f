use crate::models::fare::Quota;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Successful,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Initiated,
    Completed,
}

/// Which confirmation path first created the booking. `WebhookOnly`
/// bookings were built from gateway metadata alone and may lack
/// passenger detail and an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceOrigin {
    Client,
    WebhookOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TrainDetails {
    pub train_id: String,
    pub train_name: String,
    pub train_number: String,
    pub from_station: String,
    pub to_station: String,
    pub journey_date: NaiveDate,
    pub departure_time: Option<NaiveTime>,
    pub arrival_time: Option<NaiveTime>,
    pub selected_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct Passenger {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(range(min = 1, max = 120))]
    pub age: u8,
    pub gender: String,
    pub seat_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PaymentDetails {
    /// Gateway payment id (or order id when no payment id exists).
    /// Globally unique across bookings; the idempotency key.
    pub transaction_id: String,
    pub gateway_order_id: Option<String>,
    pub gateway: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
}

/// The durable booking aggregate. Created on the first accepted
/// confirmation event, mutated only by the reconciler, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Option<i32>,
    pub train: TrainDetails,
    pub passengers: Vec<Passenger>,
    /// Minor currency units.
    pub total_fare: i64,
    pub payment: PaymentDetails,
    pub status: BookingStatus,
    pub pnr_number: Option<String>,
    pub refund_status: Option<RefundStatus>,
    pub source_origin: SourceOrigin,
    /// Attached asynchronously by the ticket renderer; absence is not
    /// an error state.
    pub ticket_document_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// Client-declared booking context forwarded with the verify-payment
/// call. Everything needed to build a full booking and to recompute
/// the fare server-side.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct BookingDraft {
    pub train: TrainDetails,
    #[validate(length(min = 1, max = 6))]
    pub passengers: Vec<Passenger>,
    /// Base fare per passenger for each class, minor units, as looked
    /// up from inventory by the client flow.
    pub class_fares: HashMap<String, i64>,
    pub discount_code: Option<String>,
    pub quota: Quota,
    /// What the client displayed and charged; cross-checked against
    /// the server-side quote.
    pub declared_total_fare: Option<i64>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct BookingHistoryResponse {
    pub bookings: Vec<Booking>,
}
