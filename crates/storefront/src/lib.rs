//! Velvet Fig Storefront - catalog, cart, checkout, and order services.
//!
//! This library is the storefront core: everything between the user's
//! actions and the hosted backend. It owns the pricing, coupon, checkout,
//! and order-lifecycle rules; presentation and navigation live elsewhere.
//!
//! # Architecture
//!
//! - An abstract realtime [`store::DocumentStore`] (read/write/update/delete
//!   plus change subscriptions and atomic multi-path batches) stands in for
//!   the hosted document database. [`store::MemoryStore`] is the in-process
//!   implementation used by tests and local development.
//! - [`blob::BlobStore`] provides stable public URLs for uploaded product
//!   images (consumed by catalog administration only).
//! - [`identity::IdentityProvider`] delivers the nullable current user; every
//!   cart and order mutation requires a signed-in identity.
//! - [`models`] are validated documents: constructors at the store boundary
//!   reject malformed data instead of trusting the read.
//! - Services ([`catalog`], [`cart`], [`coupon`], [`checkout`], [`orders`],
//!   [`profile`]) carry the business rules. Monetary math is exact decimal
//!   arithmetic throughout.
//!
//! # Store layout
//!
//! ```text
//! products/{productId}                product documents
//! users/{userId}                      profile fields (name, email, phone, address)
//! users/{userId}/cart/{cartLineId}    cart lines awaiting checkout
//! users/{userId}/orders/{orderId}     immutable order snapshots
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod blob;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod coupon;
pub mod error;
pub mod identity;
pub mod models;
pub mod orders;
pub mod profile;
pub mod store;

pub use cart::{CartLineView, CartService, compute_subtotal};
pub use catalog::{CatalogReader, CatalogWriter, NewProduct, ProductPatch, discount_percentage};
pub use checkout::{CheckoutAttempt, CheckoutService, CheckoutState, PlacedOrder};
pub use config::{ConfigError, StorefrontConfig};
pub use coupon::CouponBook;
pub use error::{Result, StorefrontError, ValidationError};
pub use identity::{AuthState, IdentityProvider, UserIdentity};
pub use models::{CartLine, Order, OrderLine, Product, UserProfile};
pub use orders::OrderService;
pub use profile::{ProfilePatch, ProfileService};
