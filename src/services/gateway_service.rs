use crate::models::payment::PaymentIntent;
use crate::utils::config::GatewayConfig;
use crate::utils::error::{AppError, AppResult};
use once_cell::sync::Lazy;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

static CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .pool_max_idle_per_host(50)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build reqwest client")
});

/// Thin client for the external payment gateway: opens payment
/// intents and reads payment status. The gateway's own retry and
/// delivery semantics are its business; this client is a plain
/// request/response boundary.
pub struct OrderGatewayClient {
    config: GatewayConfig,
}

impl OrderGatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        OrderGatewayClient { config }
    }

    /// Register a payment intent for `amount` minor units. `notes`
    /// are echoed back by the gateway on webhooks and are the only
    /// booking context available on a webhook-first confirmation.
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: Option<&str>,
        notes: &HashMap<String, String>,
    ) -> AppResult<PaymentIntent> {
        let body = json!({
            "amount": amount,
            "currency": currency,
            "receipt": receipt,
            "notes": notes,
        });

        let response = CLIENT
            .post(format!("{}/v1/orders", self.config.base_url))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::GatewayError(format!(
                "order creation failed with status {}",
                response.status()
            )));
        }

        Ok(response.json::<PaymentIntent>().await?)
    }

    /// Current gateway-side state of a payment.
    pub async fn fetch_payment(&self, payment_id: &str) -> AppResult<PaymentIntent> {
        let response = CLIENT
            .get(format!(
                "{}/v1/payments/{}",
                self.config.base_url, payment_id
            ))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "payment {} not found",
                payment_id
            )));
        }
        if !response.status().is_success() {
            return Err(AppError::GatewayError(format!(
                "payment lookup failed with status {}",
                response.status()
            )));
        }

        Ok(response.json::<PaymentIntent>().await?)
    }
}
