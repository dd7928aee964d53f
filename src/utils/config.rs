use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),

    /// A confirmation path without its secret would have to accept
    /// everything. Refuse to start instead, unless the development
    /// override is set.
    #[error("misconfigured secret: {0}")]
    MisconfiguredSecret(&'static str),
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    /// Name recorded on bookings as `payment.gateway`.
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub gateway: GatewayConfig,
    pub webhook_secret: Option<String>,
    /// Development-only escape hatch: skip signature checks when no
    /// secret is configured. Never the default.
    pub allow_unsigned: bool,
    pub ticket_output_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

        let allow_unsigned = env::var("PAYMENTS_ALLOW_UNSIGNED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let key_id =
            env::var("GATEWAY_KEY_ID").map_err(|_| ConfigError::MissingVar("GATEWAY_KEY_ID"))?;
        let key_secret = match env::var("GATEWAY_KEY_SECRET") {
            Ok(v) if !v.trim().is_empty() => v,
            _ if allow_unsigned => String::new(),
            _ => return Err(ConfigError::MisconfiguredSecret("GATEWAY_KEY_SECRET")),
        };

        let webhook_secret = match env::var("GATEWAY_WEBHOOK_SECRET") {
            Ok(v) if !v.trim().is_empty() => Some(v),
            _ if allow_unsigned => None,
            _ => return Err(ConfigError::MisconfiguredSecret("GATEWAY_WEBHOOK_SECRET")),
        };

        Ok(AppConfig {
            database_url,
            gateway: GatewayConfig {
                base_url: env::var("GATEWAY_BASE_URL")
                    .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
                key_id,
                key_secret,
                name: env::var("GATEWAY_NAME").unwrap_or_else(|_| "razorpay".to_string()),
            },
            webhook_secret,
            allow_unsigned,
            ticket_output_dir: env::var("TICKET_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("tickets")),
        })
    }
}
