pub mod booking;
pub mod fare;
pub mod payment;
