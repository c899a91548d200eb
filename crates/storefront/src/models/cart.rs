//! Cart line document.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use velvet_fig_core::ProductId;

use super::DocumentError;

/// One line under `users/{userId}/cart/{cartLineId}`.
///
/// The name and unit price are snapshots taken when the line was added;
/// later catalog changes never touch an existing line. The product image,
/// by contrast, is resolved live at display time and is deliberately not
/// stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product this line references.
    pub product_key: ProductId,
    /// Product name at add time.
    pub product_name: String,
    /// Units requested, at least 1.
    pub quantity: u32,
    /// Effective unit price at add time.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Selected size; required when the product defines sizes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Insertion timestamp.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Parse and validate a cart line read from the store.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the JSON is malformed, the quantity is
    /// zero, or the unit price is negative.
    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        let line: Self = serde_json::from_value(value.clone())?;
        if line.quantity == 0 {
            return Err(DocumentError::ZeroQuantity);
        }
        if line.price.is_sign_negative() {
            return Err(DocumentError::NegativePrice);
        }
        Ok(line)
    }

    /// Serialize for the store.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the document cannot be encoded.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// `unit price × quantity`, exact.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
