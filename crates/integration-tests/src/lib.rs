//! Integration tests for Velvet Fig.
//!
//! The suites run the full storefront core — catalog, cart, coupon,
//! checkout, orders, profiles — against the in-memory backend, asserting
//! the end-to-end properties: exact totals, checkout atomicity, order
//! immutability, the stock guard, and the status lifecycle.
//!
//! # Test Categories
//!
//! - `checkout_flow` - cart-to-order pipeline, instant buy, atomicity
//! - `order_lifecycle` - status transitions and the admin order board
//! - `catalog_admin` - product create/update/delete and image uploads
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p velvet-fig-integration-tests
//! ```

use std::sync::Arc;

use velvet_fig_core::{Email, UserId};
use velvet_fig_storefront::blob::MemoryBlobStore;
use velvet_fig_storefront::store::{MemoryStore, SharedStore, TimedStore};
use velvet_fig_storefront::{
    AuthState, CartService, CatalogReader, CatalogWriter, CheckoutService, CouponBook,
    OrderService, ProfileService, StorefrontConfig, UserIdentity,
};

/// The fully wired storefront core over the in-memory backend.
pub struct TestContext {
    /// Direct handle to the memory store (fault injection, raw dumps).
    pub memory: MemoryStore,
    /// The store handle the services run on.
    pub store: SharedStore,
    pub auth: AuthState,
    pub catalog: CatalogReader,
    pub catalog_admin: CatalogWriter,
    pub cart: CartService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub profiles: ProfileService,
}

impl TestContext {
    /// Wire every service the way a deployment would, with the bounded
    /// store timeout in place.
    #[must_use]
    pub fn new() -> Self {
        let config = StorefrontConfig::default();
        let memory = MemoryStore::new();
        let store: SharedStore =
            Arc::new(TimedStore::new(memory.clone(), config.store_timeout));

        let catalog = CatalogReader::new(store.clone());
        let blobs = Arc::new(MemoryBlobStore::new("https://cdn.example"));
        let catalog_admin = CatalogWriter::new(store.clone(), blobs);
        let cart = CartService::new(store.clone(), catalog.clone());
        let profiles = ProfileService::new(store.clone());
        let orders = OrderService::new(store.clone());
        let coupons = CouponBook::from_rules(config.coupon_rules.clone())
            .unwrap_or_default();
        let checkout = CheckoutService::new(
            store.clone(),
            catalog.clone(),
            cart.clone(),
            profiles.clone(),
            coupons,
            config,
        );

        Self {
            memory,
            store,
            auth: AuthState::new(),
            catalog,
            catalog_admin,
            cart,
            checkout,
            orders,
            profiles,
        }
    }

    /// Sign in a throwaway customer and return the identity.
    pub fn sign_in(&self, key: &str) -> UserIdentity {
        let identity = UserIdentity {
            id: UserId::new(key),
            display_name: Some("Asha".to_owned()),
            email: Email::parse(&format!("{key}@example.com")).ok(),
        };
        self.auth.sign_in(identity.clone());
        identity
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
