//! Order documents.
//!
//! An order is an immutable snapshot: line prices, subtotal, and final
//! total are frozen at creation and never recomputed, even if the catalog
//! changes afterwards. The only mutable field is `status`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use velvet_fig_core::{OrderStatus, ProductId};

use super::{DocumentError, round_money};

/// One snapshotted line item inside an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Product the line was built from. The product may no longer exist;
    /// the snapshot stands on its own.
    pub product_key: ProductId,
    /// Product name at placement time.
    pub product_name: String,
    /// First product image at placement time, empty when none resolved.
    #[serde(default)]
    pub product_image: String,
    /// Units ordered.
    pub quantity: u32,
    /// Unit price charged.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Selected size, when the product had sizes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl OrderLine {
    /// `unit price × quantity`, exact.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// An order under `users/{userId}/orders/{orderId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Snapshotted line items, in cart order.
    pub items: Vec<OrderLine>,
    /// Subtotal before the coupon: `Σ unit price × quantity`.
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    /// Coupon discount rate applied, in `[0, 1)`.
    #[serde(with = "rust_decimal::serde::str")]
    pub discount: Decimal,
    /// Amount charged: `round₂(total × (1 − discount))`.
    #[serde(with = "rust_decimal::serde::str")]
    pub final_total: Decimal,
    /// Free-text shipping address, non-empty.
    pub shipping_address: String,
    /// Coupon code the customer entered, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    /// Placement timestamp.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub order_time: DateTime<Utc>,
    /// Placement timestamp plus the configured delivery offset.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub estimated_delivery: DateTime<Utc>,
    /// Lifecycle status, admin-settable.
    pub status: OrderStatus,
}

impl Order {
    /// Parse and validate an order document read from the store.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the JSON is malformed, the order has no
    /// lines, a line has quantity zero or a negative price, the rate is
    /// outside `[0, 1)`, or the stored totals do not match the stored lines.
    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        let order: Self = serde_json::from_value(value.clone())?;
        if order.items.is_empty() {
            return Err(DocumentError::EmptyOrder);
        }
        for line in &order.items {
            if line.quantity == 0 {
                return Err(DocumentError::ZeroQuantity);
            }
            if line.price.is_sign_negative() {
                return Err(DocumentError::NegativePrice);
            }
        }
        if order.discount.is_sign_negative() || order.discount >= Decimal::ONE {
            return Err(DocumentError::RateOutOfRange);
        }
        if order.subtotal_of_items() != order.total
            || order.recomputed_total() != order.final_total
        {
            return Err(DocumentError::InconsistentTotals);
        }
        Ok(order)
    }

    /// Serialize for the store.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the document cannot be encoded.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Subtotal recomputed from the stored lines.
    #[must_use]
    pub fn subtotal_of_items(&self) -> Decimal {
        self.items.iter().map(OrderLine::line_total).sum()
    }

    /// Final total recomputed from the stored lines and rate.
    ///
    /// For a well-formed order this always equals `final_total`, whatever
    /// has happened to the referenced products since.
    #[must_use]
    pub fn recomputed_total(&self) -> Decimal {
        round_money(self.subtotal_of_items() * (Decimal::ONE - self.discount))
    }
}
