pub mod booking_route;
pub mod fare_route;
pub mod payment_route;
