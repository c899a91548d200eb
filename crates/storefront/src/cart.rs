//! Cart aggregation.
//!
//! Every add appends a fresh line — duplicate adds for the same product and
//! size do not merge. Name and unit price are snapshotted at add time; the
//! product image shown next to a line is a live join resolved at read time.
//! The two contracts are deliberately distinct and must stay that way.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;
use velvet_fig_core::{CartLineId, ProductId};

use crate::catalog::CatalogReader;
use crate::error::{Result, StorefrontError, ValidationError};
use crate::identity::UserIdentity;
use crate::models::CartLine;
use crate::store::{SharedStore, StoreError, Subscription, paths};

/// Sum of `unit price × quantity` over a set of cart lines, exact to the
/// minor currency unit. Pure; no store access.
pub fn compute_subtotal<'a, I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = &'a CartLine>,
{
    lines.into_iter().map(CartLine::line_total).sum()
}

/// A cart line enriched for display: the live-joined product image rides
/// along with the stored snapshot.
#[derive(Debug, Clone)]
pub struct CartLineView {
    /// The line's store key.
    pub id: CartLineId,
    /// The stored snapshot.
    pub line: CartLine,
    /// Current first image of the referenced product; `None` when the
    /// product is gone or has no image (show a placeholder).
    pub product_image: Option<String>,
}

/// Per-user cart operations.
#[derive(Clone)]
pub struct CartService {
    store: SharedStore,
    catalog: CatalogReader,
}

impl CartService {
    /// Create a cart service over a store and catalog.
    #[must_use]
    pub fn new(store: SharedStore, catalog: CatalogReader) -> Self {
        Self { store, catalog }
    }

    /// Append a new cart line for `user`.
    ///
    /// Snapshots the product name and effective price at call time; later
    /// catalog changes never touch the line. Each call appends — existing
    /// lines for the same product and size are left alone.
    ///
    /// # Errors
    ///
    /// Refuses with a validation error when the quantity is zero, the
    /// product defines sizes and none was selected, or the quantity exceeds
    /// current stock. Returns `NotFound` when the product does not exist.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn add(
        &self,
        user: &UserIdentity,
        product_id: &ProductId,
        quantity: u32,
        size: Option<String>,
    ) -> Result<CartLineId> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity.into());
        }
        let product = self.catalog.get(product_id).await?;
        if product.has_sizes() && size.is_none() {
            return Err(ValidationError::SizeRequired.into());
        }
        if quantity > product.stock {
            return Err(ValidationError::InsufficientStock {
                requested: quantity,
                available: product.stock,
            }
            .into());
        }

        let line = CartLine {
            product_key: product_id.clone(),
            product_name: product.product_name.clone(),
            quantity,
            price: product.effective_price(),
            size,
            added_at: Utc::now(),
        };
        let id = CartLineId::generate();
        let value = line.to_value().map_err(StoreError::from)?;
        self.store
            .write(&paths::cart_line(&user.id, &id), value)
            .await?;
        tracing::debug!(line = %id, product = %product_id, "cart line added");
        Ok(id)
    }

    /// Remove one line. Removing a line that is already gone is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a store error when the delete fails.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn remove(&self, user: &UserIdentity, line_id: &CartLineId) -> Result<()> {
        self.store
            .delete(&paths::cart_line(&user.id, line_id))
            .await?;
        Ok(())
    }

    /// Remove every line in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns a store error when the delete fails.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn clear(&self, user: &UserIdentity) -> Result<()> {
        self.store.delete(&paths::user_cart(&user.id)).await?;
        Ok(())
    }

    /// The user's cart lines in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a store error when the cart cannot be read, or
    /// `DataCorruption` when a stored line is malformed — the cart feeds
    /// checkout, so it is read strictly.
    pub async fn lines(&self, user: &UserIdentity) -> Result<Vec<(CartLineId, CartLine)>> {
        let Some(value) = self.store.read(&paths::user_cart(&user.id)).await? else {
            return Ok(Vec::new());
        };
        let Some(entries) = value.as_object() else {
            return Ok(Vec::new());
        };

        let mut lines = Vec::with_capacity(entries.len());
        for (key, doc) in entries {
            let line = CartLine::from_value(doc)
                .map_err(|e| StorefrontError::corrupt("cart line", &e))?;
            lines.push((CartLineId::new(key.clone()), line));
        }
        lines.sort_by(|a, b| a.1.added_at.cmp(&b.1.added_at));
        Ok(lines)
    }

    /// The user's cart lines enriched with live-joined product images.
    ///
    /// # Errors
    ///
    /// Same as [`CartService::lines`]; a missing product is not an error
    /// here, only a `None` image.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn lines_with_images(&self, user: &UserIdentity) -> Result<Vec<CartLineView>> {
        let lines = self.lines(user).await?;
        let mut views = Vec::with_capacity(lines.len());
        for (id, line) in lines {
            let product_image = self.catalog.first_image(&line.product_key).await;
            views.push(CartLineView {
                id,
                line,
                product_image,
            });
        }
        Ok(views)
    }

    /// Subscribe to changes of the user's cart.
    #[must_use]
    pub fn watch(&self, user: &UserIdentity) -> Subscription {
        self.store.subscribe(&paths::user_cart(&user.id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::catalog::{CatalogWriter, NewProduct, ProductPatch};
    use crate::store::MemoryStore;
    use velvet_fig_core::UserId;

    struct Fixture {
        cart: CartService,
        writer: CatalogWriter,
        user: UserIdentity,
    }

    fn fixture() -> Fixture {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let catalog = CatalogReader::new(store.clone());
        let blobs = Arc::new(MemoryBlobStore::new("https://cdn.example"));
        Fixture {
            cart: CartService::new(store.clone(), catalog),
            writer: CatalogWriter::new(store, blobs),
            user: UserIdentity {
                id: UserId::new("u-1"),
                display_name: None,
                email: None,
            },
        }
    }

    fn shirt() -> NewProduct {
        NewProduct {
            product_name: "Linen Shirt".into(),
            category: "Shirts".into(),
            price: dec!(500),
            discount: Some(dec!(400)),
            stock: 10,
            description: String::new(),
            image_urls: vec!["https://img.example/shirt.jpg".into()],
            sizes: Some(vec!["S".into(), "M".into()]),
        }
    }

    #[tokio::test]
    async fn test_add_snapshots_effective_price_and_name() {
        let fx = fixture();
        let product_id = fx.writer.create(shirt()).await.unwrap();

        fx.cart
            .add(&fx.user, &product_id, 2, Some("M".into()))
            .await
            .unwrap();

        let lines = fx.cart.lines(&fx.user).await.unwrap();
        assert_eq!(lines.len(), 1);
        let (_, line) = &lines[0];
        assert_eq!(line.price, dec!(400));
        assert_eq!(line.product_name, "Linen Shirt");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.size.as_deref(), Some("M"));
    }

    #[tokio::test]
    async fn test_snapshot_survives_catalog_price_change() {
        let fx = fixture();
        let product_id = fx.writer.create(shirt()).await.unwrap();
        fx.cart
            .add(&fx.user, &product_id, 1, Some("M".into()))
            .await
            .unwrap();

        fx.writer
            .update(
                &product_id,
                ProductPatch {
                    discount: Some(Some(dec!(300))),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();

        let lines = fx.cart.lines(&fx.user).await.unwrap();
        assert_eq!(lines[0].1.price, dec!(400));
    }

    #[tokio::test]
    async fn test_add_requires_size_when_product_has_sizes() {
        let fx = fixture();
        let product_id = fx.writer.create(shirt()).await.unwrap();

        let result = fx.cart.add(&fx.user, &product_id, 1, None).await;
        assert!(matches!(
            result,
            Err(StorefrontError::Validation(ValidationError::SizeRequired))
        ));
        assert!(fx.cart.lines(&fx.user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_without_sizes_needs_no_size() {
        let fx = fixture();
        let product_id = fx
            .writer
            .create(NewProduct {
                sizes: None,
                ..shirt()
            })
            .await
            .unwrap();

        fx.cart.add(&fx.user, &product_id, 1, None).await.unwrap();
        assert_eq!(fx.cart.lines(&fx.user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_zero_quantity() {
        let fx = fixture();
        let product_id = fx.writer.create(shirt()).await.unwrap();

        let result = fx.cart.add(&fx.user, &product_id, 0, Some("M".into())).await;
        assert!(matches!(
            result,
            Err(StorefrontError::Validation(
                ValidationError::InvalidQuantity
            ))
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_quantity_above_stock() {
        let fx = fixture();
        let product_id = fx.writer.create(shirt()).await.unwrap();

        let result = fx
            .cart
            .add(&fx.user, &product_id, 11, Some("M".into()))
            .await;
        assert!(matches!(
            result,
            Err(StorefrontError::Validation(
                ValidationError::InsufficientStock {
                    requested: 11,
                    available: 10
                }
            ))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_adds_stay_separate_lines() {
        let fx = fixture();
        let product_id = fx.writer.create(shirt()).await.unwrap();

        fx.cart
            .add(&fx.user, &product_id, 1, Some("M".into()))
            .await
            .unwrap();
        fx.cart
            .add(&fx.user, &product_id, 1, Some("M".into()))
            .await
            .unwrap();

        let lines = fx.cart.lines(&fx.user).await.unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let fx = fixture();
        let product_id = fx.writer.create(shirt()).await.unwrap();
        let line_id = fx
            .cart
            .add(&fx.user, &product_id, 1, Some("M".into()))
            .await
            .unwrap();

        fx.cart.remove(&fx.user, &line_id).await.unwrap();
        fx.cart.remove(&fx.user, &line_id).await.unwrap();
        assert!(fx.cart.lines(&fx.user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subtotal_additivity() {
        let fx = fixture();
        let product_id = fx.writer.create(shirt()).await.unwrap();
        fx.cart
            .add(&fx.user, &product_id, 2, Some("M".into()))
            .await
            .unwrap();
        fx.cart
            .add(&fx.user, &product_id, 3, Some("S".into()))
            .await
            .unwrap();

        let lines = fx.cart.lines(&fx.user).await.unwrap();
        let subtotal = compute_subtotal(lines.iter().map(|(_, line)| line));
        assert_eq!(subtotal, dec!(2000));
    }

    #[tokio::test]
    async fn test_subtotal_is_exact_over_many_small_lines() {
        // 30 × 3 × 0.10 must be exactly 9.00, never 8.999… or 9.000000…1
        let lines: Vec<CartLine> = (0..30)
            .map(|i| CartLine {
                product_key: ProductId::new(format!("p-{i}")),
                product_name: "Sticker".into(),
                quantity: 3,
                price: dec!(0.10),
                size: None,
                added_at: Utc::now(),
            })
            .collect();
        assert_eq!(compute_subtotal(lines.iter()), dec!(9.00));
    }

    #[tokio::test]
    async fn test_lines_with_images_is_live_join() {
        let fx = fixture();
        let product_id = fx.writer.create(shirt()).await.unwrap();
        fx.cart
            .add(&fx.user, &product_id, 1, Some("M".into()))
            .await
            .unwrap();

        let views = fx.cart.lines_with_images(&fx.user).await.unwrap();
        assert_eq!(
            views[0].product_image.as_deref(),
            Some("https://img.example/shirt.jpg")
        );

        // Deleting the product leaves the snapshot but drops the image
        fx.writer.delete(&product_id).await.unwrap();
        let views = fx.cart.lines_with_images(&fx.user).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].product_image, None);
        assert_eq!(views[0].line.price, dec!(400));
    }

    #[tokio::test]
    async fn test_lines_empty_cart() {
        let fx = fixture();
        assert!(fx.cart.lines(&fx.user).await.unwrap().is_empty());
    }
}
