//! Unified error handling for the storefront core.
//!
//! Every failed action surfaces to the user as a single human-readable
//! message ([`StorefrontError::user_message`]); the taxonomy below is for
//! the code, not the UI. Validation refuses an operation before any write
//! happens; store errors mean a mutation was rejected or timed out with the
//! prior state intact.

use thiserror::Error;
use velvet_fig_core::OrderStatus;

use crate::models::DocumentError;
use crate::store::StoreError;

/// Input problems caught before any write.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The product defines sizes and none was selected.
    #[error("please select a size")]
    SizeRequired,

    /// Quantity must be at least 1.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Shipping address is empty or whitespace.
    #[error("please provide a shipping address")]
    BlankAddress,

    /// Checkout was attempted with no cart lines.
    #[error("your cart is empty")]
    EmptyCart,

    /// Requested quantity exceeds available stock.
    #[error("only {available} left in stock (requested {requested})")]
    InsufficientStock {
        /// Quantity the user asked for.
        requested: u32,
        /// Stock currently available.
        available: u32,
    },

    /// A checkout attempt was placed from a state other than `Reviewing`.
    #[error("this checkout attempt has already been resolved")]
    NotReviewing,

    /// Catalog administration submitted an invalid product.
    #[error("invalid product: {0}")]
    InvalidProduct(String),

    /// A coupon rule carries a rate outside `[0, 1)`.
    #[error("coupon rate must be at least 0 and below 1")]
    InvalidCouponRate,
}

/// Application-level error type for the storefront core.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Input refused before any state mutation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced record no longer exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// No authenticated identity; cart and order mutations are refused.
    #[error("not signed in")]
    SignedOut,

    /// The document store rejected or timed out an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The blob store rejected an upload.
    #[error("blob error: {0}")]
    Blob(#[from] crate::blob::BlobError),

    /// The order-status lifecycle forbids this transition.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// A stored document failed validation at the read boundary.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl StorefrontError {
    /// Wrap a malformed-document error with the entity it was read from.
    #[must_use]
    pub fn corrupt(entity: &str, err: &DocumentError) -> Self {
        Self::DataCorruption(format!("{entity}: {err}"))
    }

    /// The single message shown to the user for this failure.
    ///
    /// Internal detail stays out of the UI; the full error remains available
    /// for logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::NotFound(_) => "That item is no longer available.".to_owned(),
            Self::SignedOut => "Please sign in to continue.".to_owned(),
            Self::Store(StoreError::Timeout(_)) => {
                "The store took too long to respond. Please try again.".to_owned()
            }
            Self::Store(_) | Self::Blob(_) | Self::DataCorruption(_) => {
                "Something went wrong. Please try again.".to_owned()
            }
            Self::InvalidTransition { .. } => "That status change is not allowed.".to_owned(),
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = ValidationError::InsufficientStock {
            requested: 5,
            available: 2,
        };
        assert_eq!(err.to_string(), "only 2 left in stock (requested 5)");
    }

    #[test]
    fn test_user_message_hides_store_detail() {
        let err = StorefrontError::Store(StoreError::WriteFailed("backend detail".into()));
        assert!(!err.user_message().contains("backend detail"));
    }

    #[test]
    fn test_user_message_surfaces_validation() {
        let err = StorefrontError::Validation(ValidationError::SizeRequired);
        assert_eq!(err.user_message(), "please select a size");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = StorefrontError::InvalidTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Pending,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition: completed -> pending"
        );
    }
}
