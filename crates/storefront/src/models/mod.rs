//! Validated store documents.
//!
//! The backend hands back loosely-typed JSON; every entity here is a tagged
//! record with a validated constructor (`from_value`) at the store boundary.
//! A document that violates its invariants is rejected as malformed rather
//! than trusted.
//!
//! Wire field names are `camelCase`, matching the documents the original
//! backend holds (`productName`, `imageUrls`, `finalTotal`, ...); timestamps
//! are epoch milliseconds; monetary amounts are decimal strings.

pub mod cart;
pub mod order;
pub mod product;
pub mod profile;

pub use cart::CartLine;
pub use order::{Order, OrderLine};
pub use product::Product;
pub use profile::UserProfile;

use rust_decimal::{Decimal, RoundingStrategy};

/// Reasons a stored document fails validation.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The JSON did not match the document's shape.
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A price is negative.
    #[error("price must not be negative")]
    NegativePrice,

    /// A discount price is negative.
    #[error("discount must not be negative")]
    NegativeDiscount,

    /// The discount price exceeds the list price.
    #[error("discount must not exceed the list price")]
    DiscountExceedsList,

    /// A line item carries quantity zero.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// An order has no line items.
    #[error("order has no line items")]
    EmptyOrder,

    /// A discount rate is outside `[0, 1)`.
    #[error("discount rate out of range")]
    RateOutOfRange,

    /// Stored totals do not match the stored line items.
    #[error("stored totals are inconsistent")]
    InconsistentTotals,

    /// A profile email failed validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] velvet_fig_core::EmailError),
}

/// Round a monetary amount to the minor currency unit.
///
/// Half-away-from-zero, the rounding the customer sees on a receipt.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(719.995)), dec!(720.00));
        assert_eq!(round_money(dec!(719.994)), dec!(719.99));
        assert_eq!(round_money(dec!(720)), dec!(720));
    }
}
