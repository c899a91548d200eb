//! Document store boundary.
//!
//! The hosted backend is consumed through the [`DocumentStore`] trait:
//! `read`/`write`/`update`/`delete` on slash-separated paths, change
//! subscriptions, and atomic multi-path [`WriteBatch`] commits. Checkout
//! depends on the batch primitive: the order write and the cart clear must
//! land together or not at all.
//!
//! Writing `Value::Null` to a path is equivalent to deleting it, matching
//! the backend's tree semantics.

mod memory;
mod timed;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

pub use memory::MemoryStore;
pub use timed::TimedStore;

/// A shared handle to any document store implementation.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Errors surfaced by document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The operation did not complete within the configured bound.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend rejected a mutation.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// A batch guard did not match the current value at its path.
    #[error("guard failed at {path}")]
    GuardFailed {
        /// Path of the failed guard.
        path: String,
    },

    /// A document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A path string was structurally invalid.
    #[error("invalid store path: {0}")]
    InvalidPath(String),
}

// =============================================================================
// Paths
// =============================================================================

/// A slash-separated path into the document tree.
///
/// Paths are built through [`paths`] for every node the storefront touches;
/// [`StorePath::parse`] validates externally supplied strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath(String);

impl StorePath {
    /// Parse and validate a path string.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the string is empty or contains
    /// an empty segment (leading, trailing, or doubled slash).
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        if s.is_empty() || s.split('/').any(str::is_empty) {
            return Err(StoreError::InvalidPath(s.to_owned()));
        }
        Ok(Self(s.to_owned()))
    }

    fn from_segments(segments: &[&str]) -> Self {
        Self(segments.join("/"))
    }

    /// The path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path's segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Append one child segment.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}/{segment}", self.0))
    }
}

impl std::fmt::Display for StorePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path constructors for every node the storefront reads or writes.
pub mod paths {
    use velvet_fig_core::{CartLineId, OrderId, ProductId, UserId};

    use super::StorePath;

    /// The product catalog root.
    #[must_use]
    pub fn products() -> StorePath {
        StorePath::from_segments(&["products"])
    }

    /// One product document.
    #[must_use]
    pub fn product(id: &ProductId) -> StorePath {
        StorePath::from_segments(&["products", id.as_str()])
    }

    /// A product's stock counter (guarded during checkout).
    #[must_use]
    pub fn product_stock(id: &ProductId) -> StorePath {
        StorePath::from_segments(&["products", id.as_str(), "stock"])
    }

    /// The root of all user records.
    #[must_use]
    pub fn users() -> StorePath {
        StorePath::from_segments(&["users"])
    }

    /// One user's record (profile fields plus cart/orders children).
    #[must_use]
    pub fn user(id: &UserId) -> StorePath {
        StorePath::from_segments(&["users", id.as_str()])
    }

    /// One user's cart collection.
    #[must_use]
    pub fn user_cart(id: &UserId) -> StorePath {
        StorePath::from_segments(&["users", id.as_str(), "cart"])
    }

    /// One cart line.
    #[must_use]
    pub fn cart_line(user: &UserId, line: &CartLineId) -> StorePath {
        StorePath::from_segments(&["users", user.as_str(), "cart", line.as_str()])
    }

    /// One user's order collection.
    #[must_use]
    pub fn user_orders(id: &UserId) -> StorePath {
        StorePath::from_segments(&["users", id.as_str(), "orders"])
    }

    /// One order document.
    #[must_use]
    pub fn order(user: &UserId, order: &OrderId) -> StorePath {
        StorePath::from_segments(&["users", user.as_str(), "orders", order.as_str()])
    }
}

// =============================================================================
// Batches
// =============================================================================

/// A guard inside a [`WriteBatch`]: the batch commits only if the current
/// value at `path` equals `expected` (a missing node compares as `Null`).
#[derive(Debug, Clone)]
pub struct Guard {
    /// Guarded path.
    pub path: StorePath,
    /// Value the path must currently hold.
    pub expected: Value,
}

/// One mutation inside a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Set the value at a path.
    Put {
        /// Target path.
        path: StorePath,
        /// New value (`Null` deletes).
        value: Value,
    },
    /// Remove the subtree at a path.
    Delete {
        /// Target path.
        path: StorePath,
    },
}

/// An atomic multi-path write: all guards checked, then all ops applied,
/// under one commit. Either everything lands or nothing does.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    guards: Vec<Guard>,
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a guard on the current value at `path`.
    #[must_use]
    pub fn guard(mut self, path: StorePath, expected: Value) -> Self {
        self.guards.push(Guard { path, expected });
        self
    }

    /// Add a put of `value` at `path`.
    #[must_use]
    pub fn put(mut self, path: StorePath, value: Value) -> Self {
        self.ops.push(BatchOp::Put { path, value });
        self
    }

    /// Add a delete of the subtree at `path`.
    #[must_use]
    pub fn delete(mut self, path: StorePath) -> Self {
        self.ops.push(BatchOp::Delete { path });
        self
    }

    /// Whether the batch contains no mutations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The batch's guards.
    #[must_use]
    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    /// The batch's mutations, in application order.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }
}

// =============================================================================
// Subscriptions
// =============================================================================

/// A change notification delivered to a [`Subscription`].
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Path that was written.
    pub path: String,
    /// New value at that path, `None` for a delete.
    pub value: Option<Value>,
}

/// A live interest in one subtree of the document tree.
///
/// Delivery is prefix-filtered in both directions: a write below the watched
/// node is relevant, and so is an overwrite of one of its ancestors. Call
/// [`Subscription::unsubscribe`] on disposal; dropping the handle tears the
/// registration down as well.
#[derive(Debug)]
pub struct Subscription {
    prefix: String,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub(crate) fn new(prefix: String, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { prefix, rx }
    }

    /// Await the next relevant change, or `None` once the store is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.is_relevant(&event.path) => return Some(event),
                Ok(_) => {}
                // A slow consumer only misses intermediate states; keep going.
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Explicitly end this subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }

    fn is_relevant(&self, path: &str) -> bool {
        let prefix = self.prefix.as_str();
        path == prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
            || prefix
                .strip_prefix(path)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

// =============================================================================
// The store trait
// =============================================================================

/// The document store capability set the storefront core consumes.
///
/// Implementations must apply a [`WriteBatch`] atomically: no observer may
/// see a state in which some of the batch's ops have landed and others have
/// not.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the value at a path. `None` when the node does not exist.
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Set the value at a path. Writing `Null` deletes the node.
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Shallow-merge `fields` into the object at a path, creating it if
    /// absent. A `Null` field value removes that key.
    async fn update(&self, path: &StorePath, fields: Map<String, Value>)
    -> Result<(), StoreError>;

    /// Remove the subtree at a path. Removing an absent node is not an error.
    async fn delete(&self, path: &StorePath) -> Result<(), StoreError>;

    /// Atomically apply a guarded multi-path batch.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Register interest in changes at and below a path.
    fn subscribe(&self, path: &StorePath) -> Subscription;
}
