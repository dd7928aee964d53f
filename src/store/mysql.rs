use crate::models::booking::{
    Booking, BookingStatus, Passenger, PaymentDetails, PaymentStatus, RefundStatus, SourceOrigin,
    TrainDetails,
};
use crate::store::{BookingStore, ConfirmUpdate, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use std::str::FromStr;
use uuid::Uuid;

/// MySQL-backed `BookingStore`. The unique indexes on
/// `transaction_id` and `pnr_number` carry the concurrency contract;
/// every mutation here is a single statement.
pub struct MySqlBookingStore {
    pool: MySqlPool,
}

impl MySqlBookingStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlBookingStore { pool }
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let msg = db_err.message();
            if msg.contains("pnr") {
                return StoreError::DuplicatePnr;
            }
            return StoreError::DuplicateTransaction;
        }
    }
    StoreError::Unavailable(err.to_string())
}

fn parse_enum<T: FromStr>(value: &str, column: &str) -> Result<T, StoreError> {
    T::from_str(value)
        .map_err(|_| StoreError::Unavailable(format!("corrupt {} value: {}", column, value)))
}

fn booking_from_row(row: &MySqlRow) -> Result<Booking, StoreError> {
    let unavailable = |e: sqlx::Error| StoreError::Unavailable(e.to_string());

    let passengers_json: String = row.try_get("passengers").map_err(unavailable)?;
    let passengers: Vec<Passenger> = serde_json::from_str(&passengers_json)
        .map_err(|e| StoreError::Unavailable(format!("corrupt passengers column: {}", e)))?;

    let id_str: String = row.try_get("id").map_err(unavailable)?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| StoreError::Unavailable(format!("corrupt booking id: {}", e)))?;

    let status: String = row.try_get("status").map_err(unavailable)?;
    let payment_status: String = row.try_get("payment_status").map_err(unavailable)?;
    let source_origin: String = row.try_get("source_origin").map_err(unavailable)?;
    let refund_status: Option<String> = row.try_get("refund_status").map_err(unavailable)?;

    Ok(Booking {
        id,
        user_id: row.try_get("user_id").map_err(unavailable)?,
        train: TrainDetails {
            train_id: row.try_get("train_id").map_err(unavailable)?,
            train_name: row.try_get("train_name").map_err(unavailable)?,
            train_number: row.try_get("train_number").map_err(unavailable)?,
            from_station: row.try_get("from_station").map_err(unavailable)?,
            to_station: row.try_get("to_station").map_err(unavailable)?,
            journey_date: row
                .try_get::<NaiveDate, _>("journey_date")
                .map_err(unavailable)?,
            departure_time: row
                .try_get::<Option<NaiveTime>, _>("departure_time")
                .map_err(unavailable)?,
            arrival_time: row
                .try_get::<Option<NaiveTime>, _>("arrival_time")
                .map_err(unavailable)?,
            selected_class: row.try_get("selected_class").map_err(unavailable)?,
        },
        passengers,
        total_fare: row.try_get("total_fare").map_err(unavailable)?,
        payment: PaymentDetails {
            transaction_id: row.try_get("transaction_id").map_err(unavailable)?,
            gateway_order_id: row.try_get("gateway_order_id").map_err(unavailable)?,
            gateway: row.try_get("gateway").map_err(unavailable)?,
            amount: row.try_get("amount").map_err(unavailable)?,
            currency: row.try_get("currency").map_err(unavailable)?,
            status: parse_enum::<PaymentStatus>(&payment_status, "payment_status")?,
            payment_date: row
                .try_get::<Option<DateTime<Utc>>, _>("payment_date")
                .map_err(unavailable)?,
        },
        status: parse_enum::<BookingStatus>(&status, "status")?,
        pnr_number: row.try_get("pnr_number").map_err(unavailable)?,
        refund_status: refund_status
            .map(|s| parse_enum::<RefundStatus>(&s, "refund_status"))
            .transpose()?,
        source_origin: parse_enum::<SourceOrigin>(&source_origin, "source_origin")?,
        ticket_document_ref: row.try_get("ticket_document_ref").map_err(unavailable)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(unavailable)?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(unavailable)?,
    })
}

const SELECT_BOOKING: &str = r#"
    SELECT id, user_id, train_id, train_name, train_number, from_station, to_station,
           journey_date, departure_time, arrival_time, selected_class, passengers,
           total_fare, transaction_id, gateway_order_id, gateway, amount, currency,
           payment_status, payment_date, status, pnr_number, refund_status,
           source_origin, ticket_document_ref, created_at, updated_at
    FROM booking
"#;

#[async_trait]
impl BookingStore for MySqlBookingStore {
    async fn insert(&self, booking: Booking) -> Result<Booking, StoreError> {
        let passengers_json = serde_json::to_string(&booking.passengers)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO booking
                (id, user_id, train_id, train_name, train_number, from_station, to_station,
                 journey_date, departure_time, arrival_time, selected_class, passengers,
                 total_fare, transaction_id, gateway_order_id, gateway, amount, currency,
                 payment_status, payment_date, status, pnr_number, refund_status,
                 source_origin, ticket_document_ref)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(booking.id.to_string())
        .bind(booking.user_id)
        .bind(&booking.train.train_id)
        .bind(&booking.train.train_name)
        .bind(&booking.train.train_number)
        .bind(&booking.train.from_station)
        .bind(&booking.train.to_station)
        .bind(booking.train.journey_date)
        .bind(booking.train.departure_time)
        .bind(booking.train.arrival_time)
        .bind(&booking.train.selected_class)
        .bind(&passengers_json)
        .bind(booking.total_fare)
        .bind(&booking.payment.transaction_id)
        .bind(&booking.payment.gateway_order_id)
        .bind(&booking.payment.gateway)
        .bind(booking.payment.amount)
        .bind(&booking.payment.currency)
        .bind(booking.payment.status.to_string())
        .bind(booking.payment.payment_date)
        .bind(booking.status.to_string())
        .bind(&booking.pnr_number)
        .bind(booking.refund_status.map(|s| s.to_string()))
        .bind(booking.source_origin.to_string())
        .bind(&booking.ticket_document_ref)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        self.find_by_transaction_id(&booking.payment.transaction_id)
            .await?
            .ok_or_else(|| StoreError::Unavailable("inserted booking not found".into()))
    }

    async fn confirm(
        &self,
        transaction_id: &str,
        update: ConfirmUpdate,
    ) -> Result<Option<Booking>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE booking
            SET status = 'CONFIRMED',
                payment_status = ?,
                payment_date = ?,
                pnr_number = COALESCE(pnr_number, ?),
                updated_at = CURRENT_TIMESTAMP
            WHERE transaction_id = ? AND status <> 'CONFIRMED'
            "#,
        )
        .bind(update.payment_status.to_string())
        .bind(update.payment_date)
        .bind(&update.pnr_number)
        .bind(transaction_id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_transaction_id(transaction_id).await
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!("{} WHERE transaction_id = ?", SELECT_BOOKING))
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;

        row.as_ref().map(booking_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_BOOKING))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;

        row.as_ref().map(booking_from_row).transpose()
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query(&format!(
            "{} WHERE user_id = ? ORDER BY created_at DESC",
            SELECT_BOOKING
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        rows.iter().map(booking_from_row).collect()
    }

    async fn set_payment_status(
        &self,
        gateway_ref: &str,
        status: PaymentStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE booking
            SET payment_status = ?, updated_at = CURRENT_TIMESTAMP
            WHERE (gateway_order_id = ? OR transaction_id = ?)
              AND status <> 'CONFIRMED'
            "#,
        )
        .bind(status.to_string())
        .bind(gateway_ref)
        .bind(gateway_ref)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_refund_status(
        &self,
        gateway_ref: &str,
        status: RefundStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE booking
            SET refund_status = ?, updated_at = CURRENT_TIMESTAMP
            WHERE gateway_order_id = ? OR transaction_id = ?
            "#,
        )
        .bind(status.to_string())
        .bind(gateway_ref)
        .bind(gateway_ref)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_ticket_document(&self, id: Uuid, doc_ref: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE booking SET ticket_document_ref = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(doc_ref)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }

    async fn pnr_exists(&self, pnr: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS present FROM booking WHERE pnr_number = ?")
            .bind(pnr)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;

        Ok(row.is_some())
    }
}
