pub mod memory;
pub mod mysql;

use crate::models::booking::{Booking, PaymentStatus, RefundStatus};
use crate::utils::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Unique-constraint violation on `transaction_id`. The caller
    /// lost the insert race to the other confirmation path; this is
    /// folded into success, never surfaced.
    #[error("duplicate transaction id")]
    DuplicateTransaction,

    /// Unique-constraint violation on `pnr_number`; the caller
    /// regenerates and retries.
    #[error("duplicate pnr number")]
    DuplicatePnr,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateTransaction => {
                AppError::Conflict("duplicate transaction id".into())
            }
            StoreError::DuplicatePnr => AppError::Conflict("duplicate pnr number".into()),
            StoreError::Unavailable(msg) => AppError::DatabaseError(msg),
        }
    }
}

/// Fields applied when a booking transitions into CONFIRMED. An
/// already-assigned PNR always wins over `pnr_number`.
#[derive(Debug, Clone)]
pub struct ConfirmUpdate {
    pub pnr_number: String,
    pub payment_status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
}

/// The single durable source of truth for bookings. The unique
/// constraint on `transaction_id` is the linearization point for the
/// racing confirmation paths; implementations must enforce it
/// atomically, along with uniqueness of `pnr_number`.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert a new booking. `DuplicateTransaction` means another
    /// writer got there first; `DuplicatePnr` means the generated PNR
    /// collided.
    async fn insert(&self, booking: Booking) -> Result<Booking, StoreError>;

    /// Atomically confirm the booking with the given transaction id,
    /// skipping rows that are already CONFIRMED. Returns the updated
    /// booking, or `None` when no non-terminal row matched.
    async fn confirm(
        &self,
        transaction_id: &str,
        update: ConfirmUpdate,
    ) -> Result<Option<Booking>, StoreError>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Booking>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Booking>, StoreError>;

    /// Update the payment sub-status of the booking matching a gateway
    /// reference (order id or transaction id), leaving CONFIRMED
    /// bookings untouched. Returns whether a row changed.
    async fn set_payment_status(
        &self,
        gateway_ref: &str,
        status: PaymentStatus,
    ) -> Result<bool, StoreError>;

    /// Layer the refund sub-state onto the matching booking without
    /// touching its main status. Returns whether a row changed.
    async fn set_refund_status(
        &self,
        gateway_ref: &str,
        status: RefundStatus,
    ) -> Result<bool, StoreError>;

    /// Best-effort attachment of the rendered ticket document.
    async fn set_ticket_document(&self, id: Uuid, doc_ref: &str) -> Result<(), StoreError>;

    async fn pnr_exists(&self, pnr: &str) -> Result<bool, StoreError>;
}
