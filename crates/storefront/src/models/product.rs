//! Product catalog document.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DocumentError;

/// A product record under `products/{productId}`.
///
/// Referenced (never duplicated) by cart lines; orders store denormalized
/// snapshots, so deleting a product orphans historical order lines by
/// design.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Display name.
    pub product_name: String,
    /// Category label (free-form, e.g. "Hoodies").
    pub category: String,
    /// List price.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Discounted price the customer actually pays, when set.
    #[serde(
        default,
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount: Option<Decimal>,
    /// Units available. Informational for display; checkout guards it.
    pub stock: u32,
    /// Long-form description.
    #[serde(default)]
    pub description: String,
    /// Image URLs in display order; the first one is the thumbnail.
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Available sizes. A product with sizes requires a selection at add
    /// time; `None` (or empty) means the product is un-sized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<String>>,
    /// Creation timestamp.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Parse and validate a product document read from the store.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the JSON is malformed, the list price is
    /// negative, or the discount is negative or exceeds the list price.
    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        let product: Self = serde_json::from_value(value.clone())?;
        product.validate()?;
        Ok(product)
    }

    /// Check the pricing invariants.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` when a pricing invariant is violated.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.price.is_sign_negative() {
            return Err(DocumentError::NegativePrice);
        }
        if let Some(discount) = self.discount {
            if discount.is_sign_negative() {
                return Err(DocumentError::NegativeDiscount);
            }
            if discount > self.price {
                return Err(DocumentError::DiscountExceedsList);
            }
        }
        Ok(())
    }

    /// Serialize for the store.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the document cannot be encoded.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// The price the customer actually pays: the discount price when present
    /// and non-zero, otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.discount
            .filter(|discount| !discount.is_zero())
            .unwrap_or(self.price)
    }

    /// Whether a size must be selected before this product enters a cart.
    #[must_use]
    pub fn has_sizes(&self) -> bool {
        self.sizes.as_ref().is_some_and(|sizes| !sizes.is_empty())
    }

    /// The thumbnail image, when any image exists.
    #[must_use]
    pub fn first_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }
}
