use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_GATEWAY_BASE_URL: &str = "https://sandbox.wompi.co/v1";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CURRENCY: &str = "COP";
const DEFAULT_BASE_FEE_CENTS: i64 = 5_000;
const DEFAULT_DELIVERY_FEE_CENTS: i64 = 10_000;

/// Checkout pricing configuration: settlement currency and the two fixed
/// fees added on top of every order's subtotal.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CheckoutConfig {
    /// ISO 4217 settlement currency
    #[serde(default = "default_currency")]
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: String,

    /// Fixed base fee in minor currency units
    #[serde(default = "default_base_fee_cents")]
    #[validate(range(min = 0))]
    pub base_fee_cents: i64,

    /// Fixed delivery fee in minor currency units
    #[serde(default = "default_delivery_fee_cents")]
    #[validate(range(min = 0))]
    pub delivery_fee_cents: i64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            base_fee_cents: default_base_fee_cents(),
            delivery_fee_cents: default_delivery_fee_cents(),
        }
    }
}

/// Payment gateway credentials and endpoint configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_base_url")]
    #[validate(url)]
    pub base_url: String,

    /// Merchant public key, used for card tokenization and the acceptance
    /// token lookup
    #[validate(length(min = 1, message = "Gateway public key is required"))]
    pub public_key: String,

    /// Merchant private key, used for payment sources, charges and status
    /// queries
    #[validate(length(min = 1, message = "Gateway private key is required"))]
    pub private_key: String,

    /// Shared secret for the tamper-evident charge signature
    #[validate(length(min = 1, message = "Gateway integrity secret is required"))]
    pub integrity_secret: String,

    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Environment name: "development", "test" or "production"
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    #[validate]
    pub checkout: CheckoutConfig,

    #[validate]
    pub gateway: GatewayConfig,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_base_fee_cents() -> i64 {
    DEFAULT_BASE_FEE_CENTS
}

fn default_delivery_fee_cents() -> i64 {
    DEFAULT_DELIVERY_FEE_CENTS
}

fn default_gateway_base_url() -> String {
    DEFAULT_GATEWAY_BASE_URL.to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    DEFAULT_GATEWAY_TIMEOUT_SECS
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Loads configuration from layered sources: `config/default.toml`, then the
/// environment-specific file, then `APP__`-prefixed environment variables
/// (e.g. `APP__GATEWAY__PRIVATE_KEY`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = std::env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let config = Config::builder()
        .add_source(File::from(Path::new(CONFIG_DIR).join("default")).required(false))
        .add_source(File::from(Path::new(CONFIG_DIR).join(&environment)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config
        .validate()
        .map_err(|e| ConfigError::Message(format!("Invalid configuration: {}", e)))?;

    info!(
        environment = %app_config.environment,
        currency = %app_config.checkout.currency,
        "configuration loaded"
    );

    Ok(app_config)
}
