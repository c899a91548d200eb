//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional, with defaults:
//! - `STOREFRONT_DELIVERY_ESTIMATE_DAYS` - Days added to the placement time
//!   for the delivery estimate (default: 5). One constant for every checkout
//!   path; the original system used two different offsets, which was a bug.
//! - `STOREFRONT_STORE_TIMEOUT_SECS` - Bound on every document store round
//!   trip (default: 10)
//! - `STOREFRONT_CHECKOUT_MAX_RETRIES` - Retries of the stock guard when a
//!   concurrent checkout wins the race (default: 3)
//! - `STOREFRONT_CURRENCY` - ISO 4217 display currency (default: INR)
//! - `STOREFRONT_COUPON_RULES` - Comma-separated `CODE=RATE` pairs
//!   (default: `SAVE10=0.10`); rates are decimals in `[0, 1)`

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use velvet_fig_core::CurrencyCode;

const DEFAULT_DELIVERY_ESTIMATE_DAYS: i64 = 5;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CHECKOUT_MAX_RETRIES: u32 = 3;
const DEFAULT_COUPON_RULES: &str = "SAVE10=0.10";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront core configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Days between placement and the estimated delivery date.
    pub delivery_estimate_days: i64,
    /// Bound on every document store operation.
    pub store_timeout: Duration,
    /// Stock-guard retries before a checkout conflict is surfaced.
    pub checkout_max_retries: u32,
    /// Display currency.
    pub currency: CurrencyCode,
    /// Coupon rule table, `(code, rate)` pairs.
    pub coupon_rules: Vec<(String, Decimal)>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            delivery_estimate_days: DEFAULT_DELIVERY_ESTIMATE_DAYS,
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
            checkout_max_retries: DEFAULT_CHECKOUT_MAX_RETRIES,
            currency: CurrencyCode::default(),
            coupon_rules: parse_coupon_rules(DEFAULT_COUPON_RULES)
                .unwrap_or_default(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Some(value) = get_optional_env("STOREFRONT_DELIVERY_ESTIMATE_DAYS") {
            config.delivery_estimate_days = parse_days(&value)
                .map_err(|e| invalid("STOREFRONT_DELIVERY_ESTIMATE_DAYS", &e))?;
        }
        if let Some(value) = get_optional_env("STOREFRONT_STORE_TIMEOUT_SECS") {
            let secs: u64 = value
                .parse()
                .map_err(|_| invalid("STOREFRONT_STORE_TIMEOUT_SECS", "expected seconds"))?;
            config.store_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = get_optional_env("STOREFRONT_CHECKOUT_MAX_RETRIES") {
            config.checkout_max_retries = value
                .parse()
                .map_err(|_| invalid("STOREFRONT_CHECKOUT_MAX_RETRIES", "expected an integer"))?;
        }
        if let Some(value) = get_optional_env("STOREFRONT_CURRENCY") {
            config.currency = value
                .parse()
                .map_err(|e: String| invalid("STOREFRONT_CURRENCY", &e))?;
        }
        if let Some(value) = get_optional_env("STOREFRONT_COUPON_RULES") {
            config.coupon_rules =
                parse_coupon_rules(&value).map_err(|e| invalid("STOREFRONT_COUPON_RULES", &e))?;
        }

        Ok(config)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_owned(), message.to_owned())
}

/// Parse a positive day count.
fn parse_days(value: &str) -> Result<i64, String> {
    let days: i64 = value.parse().map_err(|_| "expected a number of days".to_owned())?;
    if days < 1 {
        return Err("must be at least 1 day".to_owned());
    }
    Ok(days)
}

/// Parse comma-separated `CODE=RATE` coupon rules.
fn parse_coupon_rules(value: &str) -> Result<Vec<(String, Decimal)>, String> {
    let mut rules = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (code, rate) = entry
            .split_once('=')
            .ok_or_else(|| format!("expected CODE=RATE, got '{entry}'"))?;
        let code = code.trim();
        if code.is_empty() {
            return Err(format!("empty coupon code in '{entry}'"));
        }
        let rate: Decimal = rate
            .trim()
            .parse()
            .map_err(|_| format!("bad rate in '{entry}'"))?;
        if rate.is_sign_negative() || rate >= Decimal::ONE {
            return Err(format!("rate out of [0, 1) in '{entry}'"));
        }
        rules.push((code.to_owned(), rate));
    }
    Ok(rules)
}
