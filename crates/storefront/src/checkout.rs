//! Checkout: cart-to-order pipeline.
//!
//! One checkout attempt walks `Reviewing → AddressRequired → Placing →
//! Placed | Failed`. Placing recomputes the subtotal from the current cart
//! lines (never a cached figure), applies the coupon rate, snapshots the
//! lines into an immutable order, and commits everything — order create,
//! cart clear, stock decrements — as one atomic batch. A partially placed
//! order is impossible by construction: either every write lands or the
//! cart is left untouched.
//!
//! Stock is claimed with compare-and-swap guards on the observed counts. A
//! concurrent checkout that wins the race fails the guard; the loser
//! re-reads and retries a bounded number of times before surfacing the
//! conflict. There is no cancel path once `place` is invoked.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::instrument;
use velvet_fig_core::{OrderId, OrderStatus, Price, ProductId, UserId};

use crate::cart::{CartService, compute_subtotal};
use crate::catalog::CatalogReader;
use crate::config::StorefrontConfig;
use crate::coupon::CouponBook;
use crate::error::{Result, StorefrontError, ValidationError};
use crate::identity::UserIdentity;
use crate::models::{CartLine, Order, OrderLine, round_money};
use crate::profile::ProfileService;
use crate::store::{SharedStore, StoreError, WriteBatch, paths};

/// Where a checkout attempt stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    /// Cart lines and coupon known; ready to place.
    Reviewing,
    /// Place was attempted without a shipping address; supply one to return
    /// to `Reviewing`.
    AddressRequired,
    /// The order is being committed.
    Placing,
    /// The order landed; the id is final.
    Placed(OrderId),
    /// The commit failed; the cart is untouched. Carries the user-facing
    /// message.
    Failed(String),
}

/// One user-initiated checkout, from review to resolution.
#[derive(Debug, Clone)]
pub struct CheckoutAttempt {
    user: UserIdentity,
    coupon_code: Option<String>,
    shipping_address: String,
    state: CheckoutState,
}

impl CheckoutAttempt {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// The shipping address that will be placed on the order.
    #[must_use]
    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    /// The coupon code under evaluation, when any.
    #[must_use]
    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    /// Supply or replace the shipping address. A non-blank address moves an
    /// `AddressRequired` attempt back to `Reviewing`.
    ///
    /// # Errors
    ///
    /// Refuses a blank address with a validation error.
    pub fn supply_address(&mut self, address: &str) -> Result<()> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::BlankAddress.into());
        }
        self.shipping_address = trimmed.to_owned();
        if self.state == CheckoutState::AddressRequired {
            self.state = CheckoutState::Reviewing;
        }
        Ok(())
    }
}

/// A successfully placed order.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    /// Key assigned at creation.
    pub id: OrderId,
    /// The immutable snapshot that was written.
    pub order: Order,
}

/// The checkout pipeline.
#[derive(Clone)]
pub struct CheckoutService {
    store: SharedStore,
    catalog: CatalogReader,
    cart: CartService,
    profiles: ProfileService,
    coupons: CouponBook,
    config: StorefrontConfig,
}

impl CheckoutService {
    /// Assemble the pipeline.
    #[must_use]
    pub fn new(
        store: SharedStore,
        catalog: CatalogReader,
        cart: CartService,
        profiles: ProfileService,
        coupons: CouponBook,
        config: StorefrontConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            cart,
            profiles,
            coupons,
            config,
        }
    }

    /// Start a checkout attempt for a signed-in user.
    ///
    /// The shipping address is prefilled from the profile's default when
    /// one is on file; the coupon code is held for evaluation at place
    /// time.
    ///
    /// # Errors
    ///
    /// Currently infallible beyond the signature; the profile prefill
    /// degrades to an empty address on read problems.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn begin(
        &self,
        user: &UserIdentity,
        coupon_code: Option<&str>,
    ) -> Result<CheckoutAttempt> {
        let shipping_address = match self.profiles.default_address(user).await {
            Ok(address) => address.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to prefill shipping address");
                String::new()
            }
        };
        Ok(CheckoutAttempt {
            user: user.clone(),
            coupon_code: coupon_code
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_owned),
            shipping_address,
            state: CheckoutState::Reviewing,
        })
    }

    /// Place the order for the attempt's current cart.
    ///
    /// On success the attempt is `Placed`, the user's cart is empty, and
    /// exactly one new order exists. On failure the attempt is `Failed`
    /// (or `AddressRequired`) and nothing was written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank address, an empty cart, an
    /// attempt not in `Reviewing`, or insufficient stock; `NotFound` when
    /// every product in the cart is gone; a store error when the commit
    /// fails.
    #[instrument(skip(self, attempt), fields(user = %attempt.user.id))]
    pub async fn place(&self, attempt: &mut CheckoutAttempt) -> Result<PlacedOrder> {
        if attempt.state != CheckoutState::Reviewing {
            return Err(ValidationError::NotReviewing.into());
        }
        if attempt.shipping_address.trim().is_empty() {
            attempt.state = CheckoutState::AddressRequired;
            return Err(ValidationError::BlankAddress.into());
        }

        attempt.state = CheckoutState::Placing;
        match self.place_from_cart(attempt).await {
            Ok(placed) => {
                attempt.state = CheckoutState::Placed(placed.id.clone());
                Ok(placed)
            }
            Err(err) => {
                tracing::error!(error = %err, "checkout failed");
                attempt.state = CheckoutState::Failed(err.user_message());
                Err(err)
            }
        }
    }

    /// Instant buy: place a single-line order directly from a product view,
    /// bypassing the persisted cart entirely.
    ///
    /// The synthesized line is never written as a cart line; the pipeline
    /// is otherwise identical to the cart path, including the delivery
    /// offset and the stock guard. No coupon applies on this path.
    ///
    /// # Errors
    ///
    /// Same validations as adding to cart (quantity, size, stock) plus a
    /// non-blank address; `NotFound` when the product does not exist; a
    /// store error when the commit fails.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn buy_now(
        &self,
        user: &UserIdentity,
        product_id: &ProductId,
        quantity: u32,
        size: Option<String>,
        shipping_address: &str,
    ) -> Result<PlacedOrder> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity.into());
        }
        if shipping_address.trim().is_empty() {
            return Err(ValidationError::BlankAddress.into());
        }
        let product = self.catalog.get(product_id).await?;
        if product.has_sizes() && size.is_none() {
            return Err(ValidationError::SizeRequired.into());
        }

        let line = CartLine {
            product_key: product_id.clone(),
            product_name: product.product_name.clone(),
            quantity,
            price: product.effective_price(),
            size,
            added_at: Utc::now(),
        };
        self.commit_order(
            &user.id,
            &[line],
            Decimal::ZERO,
            None,
            shipping_address,
            false,
        )
        .await
    }

    async fn place_from_cart(&self, attempt: &CheckoutAttempt) -> Result<PlacedOrder> {
        // Recompute from the live cart, not anything cached on the attempt
        let lines = self.cart.lines(&attempt.user).await?;
        if lines.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        let lines: Vec<CartLine> = lines.into_iter().map(|(_, line)| line).collect();

        let rate = attempt
            .coupon_code
            .as_deref()
            .map_or(Decimal::ZERO, |code| self.coupons.evaluate(code));

        self.commit_order(
            &attempt.user.id,
            &lines,
            rate,
            attempt.coupon_code.clone(),
            &attempt.shipping_address,
            true,
        )
        .await
    }

    /// Commit with a bounded retry of the stock compare-and-swap. Only the
    /// guard loop retries: nothing has committed when a guard fails, so
    /// re-running is safe. Other write failures surface immediately — there
    /// is no idempotency key on order creation, so a blind retry could
    /// double-place.
    async fn commit_order(
        &self,
        user_id: &UserId,
        lines: &[CartLine],
        rate: Decimal,
        coupon_code: Option<String>,
        shipping_address: &str,
        clear_cart: bool,
    ) -> Result<PlacedOrder> {
        let mut tries = 0;
        loop {
            match self
                .try_commit(
                    user_id,
                    lines,
                    rate,
                    coupon_code.clone(),
                    shipping_address,
                    clear_cart,
                )
                .await
            {
                Err(StorefrontError::Store(StoreError::GuardFailed { ref path }))
                    if tries < self.config.checkout_max_retries =>
                {
                    tries += 1;
                    tracing::warn!(%path, tries, "stock guard lost a race, retrying");
                }
                other => return other,
            }
        }
    }

    async fn try_commit(
        &self,
        user_id: &UserId,
        lines: &[CartLine],
        rate: Decimal,
        coupon_code: Option<String>,
        shipping_address: &str,
        clear_cart: bool,
    ) -> Result<PlacedOrder> {
        // Live-join each line's product for the image snapshot and the
        // observed stock. A deleted product keeps its snapshot with a
        // placeholder image; the order is rejected only when nothing in it
        // still exists.
        let mut items = Vec::with_capacity(lines.len());
        let mut stock_claims: BTreeMap<ProductId, (u32, u32)> = BTreeMap::new();
        let mut orphaned = 0usize;

        for line in lines {
            let product = self.catalog.try_get(&line.product_key).await?;
            let product_image = match &product {
                Some(p) => p.first_image().unwrap_or_default().to_owned(),
                None => {
                    orphaned += 1;
                    tracing::warn!(product = %line.product_key, "ordered product no longer exists");
                    String::new()
                }
            };
            if let Some(p) = product {
                let claim = stock_claims
                    .entry(line.product_key.clone())
                    .or_insert((p.stock, 0));
                claim.1 += line.quantity;
            }
            items.push(OrderLine {
                product_key: line.product_key.clone(),
                product_name: line.product_name.clone(),
                product_image,
                quantity: line.quantity,
                price: line.price,
                size: line.size.clone(),
            });
        }

        if orphaned == lines.len() {
            return Err(StorefrontError::NotFound(
                "none of the ordered products still exist".to_owned(),
            ));
        }
        for (observed, claimed) in stock_claims.values() {
            if claimed > observed {
                return Err(ValidationError::InsufficientStock {
                    requested: *claimed,
                    available: *observed,
                }
                .into());
            }
        }

        let subtotal = compute_subtotal(lines);
        let final_total = round_money(subtotal * (Decimal::ONE - rate));
        let now = Utc::now();
        let order = Order {
            items,
            total: subtotal,
            discount: rate,
            final_total,
            shipping_address: shipping_address.trim().to_owned(),
            coupon_code,
            order_time: now,
            estimated_delivery: now
                + chrono::Duration::days(self.config.delivery_estimate_days),
            status: OrderStatus::Pending,
        };

        let order_id = OrderId::generate();
        let mut batch = WriteBatch::new();
        for (product_id, (observed, claimed)) in &stock_claims {
            batch = batch
                .guard(paths::product_stock(product_id), json!(observed))
                .put(paths::product_stock(product_id), json!(observed - claimed));
        }
        batch = batch.put(
            paths::order(user_id, &order_id),
            order.to_value().map_err(StoreError::from)?,
        );
        if clear_cart {
            batch = batch.delete(paths::user_cart(user_id));
        }

        self.store.commit(batch).await?;
        let charged = Price::new(order.final_total, self.config.currency);
        tracing::info!(user = %user_id, order = %order_id, total = %charged.display(),
            "order placed");
        Ok(PlacedOrder {
            id: order_id,
            order,
        })
    }
}
