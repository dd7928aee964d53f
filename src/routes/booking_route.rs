use crate::models::booking::{Booking, BookingHistoryResponse};
use crate::services::booking_service::BookingService;
use crate::utils::error::AppError;
use crate::utils::jwt::AuthenticatedUser;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use uuid::Uuid;

/// Booking history for the authenticated traveler, newest first.
#[openapi(tag = "Bookings")]
#[get("/bookings")]
pub async fn booking_history(
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<BookingHistoryResponse>, AppError> {
    let bookings = booking_service.history(auth.user_id).await?;
    Ok(Json(BookingHistoryResponse { bookings }))
}

#[openapi(tag = "Bookings")]
#[get("/bookings/<id>")]
pub async fn get_booking(
    id: &str,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<Booking>, AppError> {
    let id = Uuid::parse_str(id)
        .map_err(|_| AppError::BadRequest("invalid booking id".to_string()))?;

    let booking = booking_service.booking_for_user(id, auth.user_id).await?;
    Ok(Json(booking))
}
