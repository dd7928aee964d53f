use crate::models::payment::{
    ConfirmationEvent, ConfirmationSource, CreateOrderRequest, CreateOrderResponse,
    PaymentStatusResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};
use crate::services::booking_service::BookingService;
use crate::services::gateway_service::OrderGatewayClient;
use crate::utils::config::AppConfig;
use crate::utils::error::AppError;
use crate::utils::jwt::AuthenticatedUser;
use crate::utils::signature::client_confirmation_payload;
use chrono::Utc;
use rocket::request::{FromRequest, Outcome};
use rocket::serde::json::Json;
use rocket::serde::json::{json, Value};
use rocket::Request;
use rocket::State;
use rocket_okapi::openapi;
use std::collections::HashMap;
use validator::Validate;

/// Open a payment intent with the gateway for the quoted amount.
/// `amount` arrives in major units and crosses to minor units here;
/// the gateway only ever sees minor units.
#[openapi(tag = "Payments")]
#[post("/payments/order", format = "json", data = "<request>")]
pub async fn create_order(
    request: Json<CreateOrderRequest>,
    _auth: AuthenticatedUser,
    gateway: &State<OrderGatewayClient>,
    config: &State<AppConfig>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let amount_minor = request.amount_minor()?;
    let intent = gateway
        .create_order(
            amount_minor,
            &request.currency,
            request.receipt.as_deref(),
            &request.notes,
        )
        .await?;

    Ok(Json(CreateOrderResponse {
        intent_id: intent.id,
        amount: intent.amount,
        currency: intent.currency,
        gateway_public_key: config.gateway.key_id.clone(),
    }))
}

/// Client confirmation path: the gateway redirected a signed
/// confirmation to the client, which forwards it here together with
/// the booking context.
#[openapi(tag = "Payments")]
#[post("/payments/verify", format = "json", data = "<request>")]
pub async fn verify_payment(
    request: Json<VerifyPaymentRequest>,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let request = request.into_inner();

    let event = ConfirmationEvent {
        source: ConfirmationSource::Client,
        signed_payload: client_confirmation_payload(
            &request.gateway_order_id,
            &request.gateway_payment_id,
        )
        .into_bytes(),
        gateway_order_id: Some(request.gateway_order_id),
        gateway_payment_id: Some(request.gateway_payment_id),
        signature: request.signature,
        amount: None,
        currency: None,
        notes: HashMap::new(),
        received_at: Utc::now(),
    };

    let booking = booking_service
        .reconcile(event, Some(request.booking_context), Some(auth.user_id))
        .await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        booking,
    }))
}

/// Gateway-side payment status passthrough.
#[openapi(tag = "Payments")]
#[get("/payments/<payment_id>/status")]
pub async fn payment_status(
    payment_id: &str,
    _auth: AuthenticatedUser,
    gateway: &State<OrderGatewayClient>,
) -> Result<Json<PaymentStatusResponse>, AppError> {
    let payment = gateway.fetch_payment(payment_id).await?;
    Ok(Json(PaymentStatusResponse { payment }))
}

/// Signature header on webhook deliveries. Always present as a guard
/// so the service layer decides what a missing signature means.
pub struct GatewaySignature(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GatewaySignature {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(GatewaySignature(
            request
                .headers()
                .get_one("X-Gateway-Signature")
                .unwrap_or_default()
                .to_string(),
        ))
    }
}

/// Async confirmation path. The body must stay raw: the signature
/// covers the exact bytes the gateway sent. Anything past the
/// signature check acks with 200 so the gateway stops redelivering,
/// including event types we do not recognize.
#[post("/payments/webhook", data = "<body>")]
pub async fn gateway_webhook(
    body: String,
    signature: GatewaySignature,
    booking_service: &State<BookingService>,
) -> Result<Json<Value>, AppError> {
    let event = booking_service
        .route_webhook(body.as_bytes(), &signature.0)
        .await?;

    Ok(Json(json!({ "status": "success", "event": event })))
}
