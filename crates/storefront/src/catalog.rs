//! Catalog reading and administration.
//!
//! [`CatalogReader`] is the storefront's view: availability, effective
//! price, and image resolution. [`CatalogWriter`] is the admin side:
//! product creation, the managed edit set, deletion, and image uploads.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value, json};
use tracing::instrument;
use uuid::Uuid;
use velvet_fig_core::ProductId;

use crate::blob::BlobStore;
use crate::error::{Result, StorefrontError, ValidationError};
use crate::models::Product;
use crate::store::{SharedStore, Subscription, paths};

/// Percentage saved against the list price, as shown on product pages.
///
/// `round((list − discount) / list × 100)`, half away from zero. Returns 0
/// when the list price is zero (no division by zero) or the inputs would
/// yield a negative saving.
#[must_use]
pub fn discount_percentage(list: Decimal, discount: Decimal) -> u32 {
    if list.is_zero() {
        return 0;
    }
    let percentage = (list - discount) / list * Decimal::ONE_HUNDRED;
    percentage
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

// =============================================================================
// Reader
// =============================================================================

/// Read-side access to the product catalog.
#[derive(Clone)]
pub struct CatalogReader {
    store: SharedStore,
}

impl CatalogReader {
    /// Create a reader over a store.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Fetch one product; absence is an error.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the product does not exist and
    /// `DataCorruption` when the stored document is malformed.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &ProductId) -> Result<Product> {
        self.try_get(id)
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("product {id}")))
    }

    /// Fetch one product; absence is `None` (display paths show a
    /// placeholder instead of failing).
    ///
    /// # Errors
    ///
    /// Returns `DataCorruption` when the stored document is malformed.
    pub async fn try_get(&self, id: &ProductId) -> Result<Option<Product>> {
        match self.store.read(&paths::product(id)).await? {
            Some(value) => Ok(Some(
                Product::from_value(&value)
                    .map_err(|e| StorefrontError::corrupt("product", &e))?,
            )),
            None => Ok(None),
        }
    }

    /// All products, newest first. Malformed documents are skipped with a
    /// warning rather than taking the whole listing down.
    ///
    /// # Errors
    ///
    /// Returns a store error when the catalog cannot be read.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<(ProductId, Product)>> {
        let Some(value) = self.store.read(&paths::products()).await? else {
            return Ok(Vec::new());
        };
        let Some(entries) = value.as_object() else {
            return Ok(Vec::new());
        };

        let mut products = Vec::with_capacity(entries.len());
        for (key, doc) in entries {
            match Product::from_value(doc) {
                Ok(product) => products.push((ProductId::new(key.clone()), product)),
                Err(err) => {
                    tracing::warn!(product = %key, error = %err, "skipping malformed product");
                }
            }
        }
        products.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(products)
    }

    /// Resolve a product's current first image for display.
    ///
    /// A live join, not a snapshot: a deleted or changed product yields
    /// `None` and the caller shows a placeholder.
    pub async fn first_image(&self, id: &ProductId) -> Option<String> {
        match self.try_get(id).await {
            Ok(product) => product.and_then(|p| p.first_image().map(str::to_owned)),
            Err(err) => {
                tracing::warn!(product = %id, error = %err, "failed to resolve product image");
                None
            }
        }
    }

    /// Subscribe to catalog changes.
    #[must_use]
    pub fn watch(&self) -> Subscription {
        self.store.subscribe(&paths::products())
    }
}

// =============================================================================
// Writer (catalog administration)
// =============================================================================

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_name: String,
    pub category: String,
    pub price: Decimal,
    pub discount: Option<Decimal>,
    pub stock: u32,
    pub description: String,
    pub image_urls: Vec<String>,
    pub sizes: Option<Vec<String>>,
}

/// Partial update for a product: the fields the admin edit screen manages.
/// `discount: Some(None)` clears the discount.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub discount: Option<Option<Decimal>>,
    pub stock: Option<u32>,
    pub description: Option<String>,
}

/// Admin-side catalog mutations.
#[derive(Clone)]
pub struct CatalogWriter {
    store: SharedStore,
    blobs: std::sync::Arc<dyn BlobStore>,
    reader: CatalogReader,
}

impl CatalogWriter {
    /// Create a writer over a store and blob store.
    #[must_use]
    pub fn new(store: SharedStore, blobs: std::sync::Arc<dyn BlobStore>) -> Self {
        let reader = CatalogReader::new(store.clone());
        Self {
            store,
            blobs,
            reader,
        }
    }

    /// Create a product, stamping its creation time.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the pricing invariants are violated,
    /// or a store error when the write fails.
    #[instrument(skip(self, new), fields(name = %new.product_name))]
    pub async fn create(&self, new: NewProduct) -> Result<ProductId> {
        let product = Product {
            product_name: new.product_name,
            category: new.category,
            price: new.price,
            discount: new.discount,
            stock: new.stock,
            description: new.description,
            image_urls: new.image_urls,
            sizes: new.sizes,
            created_at: Utc::now(),
        };
        product
            .validate()
            .map_err(|e| ValidationError::InvalidProduct(e.to_string()))?;

        let id = ProductId::generate();
        let value = product.to_value().map_err(crate::store::StoreError::from)?;
        self.store.write(&paths::product(&id), value).await?;
        tracing::info!(product = %id, "product created");
        Ok(id)
    }

    /// Apply the admin edit set to a product.
    ///
    /// Only the patched fields are written, so images and the creation
    /// timestamp are untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the product does not exist, a validation
    /// error when the patched result violates the pricing invariants, or a
    /// store error when the write fails.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &ProductId, patch: ProductPatch) -> Result<()> {
        let mut product = self.reader.get(id).await?;

        let mut fields = Map::new();
        if let Some(name) = patch.product_name {
            fields.insert("productName".into(), json!(name.clone()));
            product.product_name = name;
        }
        if let Some(category) = patch.category {
            fields.insert("category".into(), json!(category.clone()));
            product.category = category;
        }
        if let Some(price) = patch.price {
            fields.insert("price".into(), json!(price.to_string()));
            product.price = price;
        }
        if let Some(discount) = patch.discount {
            let value = discount.map_or(Value::Null, |d| json!(d.to_string()));
            fields.insert("discount".into(), value);
            product.discount = discount;
        }
        if let Some(stock) = patch.stock {
            fields.insert("stock".into(), json!(stock));
            product.stock = stock;
        }
        if let Some(description) = patch.description {
            fields.insert("description".into(), json!(description.clone()));
            product.description = description;
        }

        if fields.is_empty() {
            return Ok(());
        }
        product
            .validate()
            .map_err(|e| ValidationError::InvalidProduct(e.to_string()))?;

        self.store.update(&paths::product(id), fields).await?;
        Ok(())
    }

    /// Delete a product.
    ///
    /// Historical orders keep their denormalized snapshots; open cart lines
    /// referencing the product become display gaps.
    ///
    /// # Errors
    ///
    /// Returns a store error when the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &ProductId) -> Result<()> {
        self.store.delete(&paths::product(id)).await?;
        tracing::info!(product = %id, "product deleted");
        Ok(())
    }

    /// Upload a product image and return its stable public URL.
    ///
    /// # Errors
    ///
    /// Returns a blob error when the upload fails.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> Result<String> {
        let path = format!("product-images/{}-{filename}", Uuid::new_v4().simple());
        let handle = self.blobs.upload(&path, bytes).await?;
        Ok(self.blobs.public_url(&handle))
    }
}
