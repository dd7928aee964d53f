use crate::models::booking::{Booking, BookingStatus, PaymentStatus, RefundStatus};
use crate::store::{BookingStore, ConfirmUpdate, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory `BookingStore` keyed by transaction id, enforcing the
/// same uniqueness contract as the MySQL store. Used by the test
/// suite and for local development without a database.
#[derive(Default)]
pub struct InMemoryBookingStore {
    inner: Mutex<HashMap<String, Booking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Booking>>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("poisoned booking store lock".into()))
    }

    pub fn booking_count(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }
}

fn matches_ref(booking: &Booking, gateway_ref: &str) -> bool {
    booking.payment.transaction_id == gateway_ref
        || booking.payment.gateway_order_id.as_deref() == Some(gateway_ref)
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: Booking) -> Result<Booking, StoreError> {
        let mut map = self.lock()?;
        let txn_id = booking.payment.transaction_id.clone();
        if map.contains_key(&txn_id) {
            return Err(StoreError::DuplicateTransaction);
        }
        if let Some(pnr) = booking.pnr_number.as_deref() {
            if map.values().any(|b| b.pnr_number.as_deref() == Some(pnr)) {
                return Err(StoreError::DuplicatePnr);
            }
        }
        map.insert(txn_id, booking.clone());
        Ok(booking)
    }

    async fn confirm(
        &self,
        transaction_id: &str,
        update: ConfirmUpdate,
    ) -> Result<Option<Booking>, StoreError> {
        let mut map = self.lock()?;
        let taken = map
            .values()
            .any(|b| b.pnr_number.as_deref() == Some(update.pnr_number.as_str()));

        let booking = match map.get_mut(transaction_id) {
            Some(b) if b.status != BookingStatus::Confirmed => b,
            _ => return Ok(None),
        };

        if booking.pnr_number.is_none() {
            if taken {
                return Err(StoreError::DuplicatePnr);
            }
            booking.pnr_number = Some(update.pnr_number);
        }
        booking.status = BookingStatus::Confirmed;
        booking.payment.status = update.payment_status;
        booking.payment.payment_date = Some(update.payment_date);
        booking.updated_at = Utc::now();
        Ok(Some(booking.clone()))
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        Ok(self.lock()?.get(transaction_id).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.lock()?.values().find(|b| b.id == id).cloned())
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Booking>, StoreError> {
        let mut bookings: Vec<Booking> = self
            .lock()?
            .values()
            .filter(|b| b.user_id == Some(user_id))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn set_payment_status(
        &self,
        gateway_ref: &str,
        status: PaymentStatus,
    ) -> Result<bool, StoreError> {
        let mut map = self.lock()?;
        let booking = map
            .values_mut()
            .find(|b| matches_ref(b, gateway_ref) && b.status != BookingStatus::Confirmed);
        match booking {
            Some(b) => {
                b.payment.status = status;
                b.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_refund_status(
        &self,
        gateway_ref: &str,
        status: RefundStatus,
    ) -> Result<bool, StoreError> {
        let mut map = self.lock()?;
        match map.values_mut().find(|b| matches_ref(b, gateway_ref)) {
            Some(b) => {
                b.refund_status = Some(status);
                b.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_ticket_document(&self, id: Uuid, doc_ref: &str) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        if let Some(b) = map.values_mut().find(|b| b.id == id) {
            b.ticket_document_ref = Some(doc_ref.to_string());
            b.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn pnr_exists(&self, pnr: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()?
            .values()
            .any(|b| b.pnr_number.as_deref() == Some(pnr)))
    }
}
