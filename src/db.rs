use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;

// Database connection manager
pub struct Database {
    pub pool: MySqlPool,
}

impl Database {
    // Create a new database connection pool
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    // Get a reference to the connection pool
    pub fn get_pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Idempotent schema bootstrap. The two unique indexes are load
    /// bearing: `transaction_id` is the linearization point for the
    /// racing confirmation paths and `pnr_number` backs the
    /// exactly-once PNR assignment.
    pub async fn ensure_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS booking (
                id CHAR(36) NOT NULL PRIMARY KEY,
                user_id INT NULL,
                train_id VARCHAR(32) NOT NULL,
                train_name VARCHAR(128) NOT NULL,
                train_number VARCHAR(16) NOT NULL,
                from_station VARCHAR(64) NOT NULL,
                to_station VARCHAR(64) NOT NULL,
                journey_date DATE NOT NULL,
                departure_time TIME NULL,
                arrival_time TIME NULL,
                selected_class VARCHAR(8) NOT NULL,
                passengers JSON NOT NULL,
                total_fare BIGINT NOT NULL,
                transaction_id VARCHAR(64) NOT NULL,
                gateway_order_id VARCHAR(64) NULL,
                gateway VARCHAR(32) NOT NULL,
                amount BIGINT NOT NULL,
                currency VARCHAR(8) NOT NULL,
                payment_status VARCHAR(16) NOT NULL,
                payment_date TIMESTAMP NULL,
                status VARCHAR(24) NOT NULL,
                pnr_number CHAR(10) NULL,
                refund_status VARCHAR(16) NULL,
                source_origin VARCHAR(16) NOT NULL,
                ticket_document_ref VARCHAR(255) NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                CONSTRAINT booking_transaction_id_uindex UNIQUE (transaction_id),
                CONSTRAINT booking_pnr_number_uindex UNIQUE (pnr_number),
                INDEX booking_gateway_order_id_index (gateway_order_id),
                INDEX booking_user_id_index (user_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}
