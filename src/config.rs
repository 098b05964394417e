//! Environment-driven configuration.

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::orders::OrderIdMode;

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// WhatsApp Cloud API bearer token.
    pub whatsapp_token: SecretString,
    /// Sender identity (the business phone number id on the Graph API).
    pub phone_number_id: String,
    /// Shared secret for the webhook verification handshake.
    pub verify_token: String,
    /// Operator contact notified on every finalized order.
    pub operator_number: String,
    /// HTTP listen port.
    pub port: u16,
    /// Path to the local orders database.
    pub db_path: String,
    /// Order-id generation strategy.
    pub order_id_mode: OrderIdMode,
    /// Idle session eviction threshold in minutes. Zero disables the sweep.
    pub session_ttl_min: u64,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            whatsapp_token: SecretString::from(required("WHATSAPP_TOKEN")?),
            phone_number_id: required("PHONE_NUMBER_ID")?,
            verify_token: required("VERIFY_TOKEN")?,
            operator_number: required("OPERATOR_NUMBER")?,
            port: parsed("PORT", 5000)?,
            db_path: std::env::var("LAUNDRY_BOT_DB_PATH")
                .unwrap_or_else(|_| "./data/laundry-bot.db".to_string()),
            order_id_mode: order_id_mode_from_env()?,
            session_ttl_min: parsed("SESSION_TTL_MIN", 30)?,
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

fn order_id_mode_from_env() -> Result<OrderIdMode, ConfigError> {
    match std::env::var("ORDER_ID_MODE") {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "sequential" => Ok(OrderIdMode::Sequential),
            "random" => Ok(OrderIdMode::Random),
            other => Err(ConfigError::InvalidValue {
                key: "ORDER_ID_MODE".to_string(),
                message: format!("expected 'sequential' or 'random', got {other:?}"),
            }),
        },
        Err(_) => Ok(OrderIdMode::Sequential),
    }
}
