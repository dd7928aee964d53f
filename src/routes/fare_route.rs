use crate::models::fare::{FareQuote, FareQuoteRequest};
use crate::services::fare_service::FareService;
use crate::utils::error::AppError;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use validator::Validate;

/// Display quote. The reconciler recomputes with the same pure
/// calculator, so what this returns is what gets charged.
#[openapi(tag = "Fares")]
#[post("/fares/quote", format = "json", data = "<request>")]
pub async fn quote_fare(request: Json<FareQuoteRequest>) -> Result<Json<FareQuote>, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let discount = request
        .discount_code
        .as_deref()
        .and_then(FareService::resolve_discount);

    let quote = FareService::quote(
        &request.class_fares,
        &request.selected_class,
        request.passenger_count,
        discount.as_ref(),
        request.quota,
    )?;

    Ok(Json(quote))
}
