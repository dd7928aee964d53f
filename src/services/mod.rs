pub mod booking_service;
pub mod fare_service;
pub mod gateway_service;
pub mod renderer_service;
