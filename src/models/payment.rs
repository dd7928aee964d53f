use crate::models::booking::{Booking, BookingDraft};
use crate::utils::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct CreateOrderRequest {
    /// Major currency units; converted to minor units (x100) before
    /// the gateway sees it.
    #[validate(range(min = 1))]
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    /// Opaque key-values echoed back by the gateway on webhooks. The
    /// only way to recover booking context from a webhook-first
    /// confirmation, so the client flow should fill these in.
    #[serde(default)]
    pub notes: HashMap<String, String>,
}

impl CreateOrderRequest {
    /// The major-to-minor unit crossing. Happens exactly once, here;
    /// an amount too large to convert is rejected, never wrapped.
    pub fn amount_minor(&self) -> AppResult<i64> {
        self.amount
            .checked_mul(100)
            .ok_or_else(|| AppError::ValidationError("amount out of range".into()))
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CreateOrderResponse {
    pub intent_id: String,
    /// Minor units, as registered with the gateway.
    pub amount: i64,
    pub currency: String,
    pub gateway_public_key: String,
}

/// A payment intent as the gateway reports it. Ephemeral.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    pub booking_context: BookingDraft,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub booking: Booking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationSource {
    Client,
    Webhook,
}

/// One inbound confirmation signal, from either delivery path,
/// normalized for the reconciler. `signed_payload` holds the exact
/// bytes the signature covers: `orderId|paymentId` on the client path,
/// the raw request body on the webhook path.
#[derive(Debug, Clone)]
pub struct ConfirmationEvent {
    pub source: ConfirmationSource,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub signature: String,
    pub signed_payload: Vec<u8>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub notes: HashMap<String, String>,
    pub received_at: DateTime<Utc>,
}

impl ConfirmationEvent {
    /// The idempotency key: payment id when present, otherwise the
    /// order id (e.g. `order.paid` carries no payment entity).
    pub fn transaction_id(&self) -> Option<&str> {
        self.gateway_payment_id
            .as_deref()
            .or(self.gateway_order_id.as_deref())
    }
}

/// Closed variant over the gateway event types we understand. The
/// default arm keeps unrecognized types routable (acknowledge and
/// ignore) instead of failing the delivery.
#[derive(Debug, Clone, PartialEq, Eq, Display, EnumString)]
pub enum WebhookEventKind {
    #[strum(serialize = "payment.captured")]
    PaymentCaptured,
    #[strum(serialize = "payment.failed")]
    PaymentFailed,
    #[strum(serialize = "payment.authorized")]
    PaymentAuthorized,
    #[strum(serialize = "order.paid")]
    OrderPaid,
    #[strum(serialize = "refund.created")]
    RefundCreated,
    #[strum(serialize = "refund.processed")]
    RefundProcessed,
    #[strum(default)]
    Unknown(String),
}

/// Raw gateway webhook envelope. Entities are wrapped one level deep,
/// and only the ones relevant to the event type are present.
#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    #[serde(default)]
    pub payload: GatewayEventPayload,
    pub created_at: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewayEventPayload {
    pub payment: Option<EntityWrapper<PaymentEntity>>,
    pub order: Option<EntityWrapper<OrderEntity>>,
    pub refund: Option<EntityWrapper<RefundEntity>>,
}

#[derive(Debug, Deserialize)]
pub struct EntityWrapper<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderEntity {
    pub id: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct RefundEntity {
    pub id: String,
    pub payment_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PaymentStatusResponse {
    pub payment: PaymentIntent,
}
