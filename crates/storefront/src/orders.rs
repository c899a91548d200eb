//! Order queries and the status lifecycle.
//!
//! Orders are immutable snapshots; the only mutation this module performs
//! is the admin-facing status update, and only along the strict
//! `pending → delivered → completed` graph.

use serde_json::{Map, json};
use tracing::instrument;
use velvet_fig_core::{OrderId, OrderStatus, UserId};

use crate::error::{Result, StorefrontError};
use crate::identity::UserIdentity;
use crate::models::Order;
use crate::store::{SharedStore, Subscription, paths};

/// Order reads and status transitions.
#[derive(Clone)]
pub struct OrderService {
    store: SharedStore,
}

impl OrderService {
    /// Create an order service over a store.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error when the collection cannot be read, or
    /// `DataCorruption` when a stored order is malformed.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn list(&self, user: &UserIdentity) -> Result<Vec<(OrderId, Order)>> {
        let mut orders = self.orders_of(&user.id).await?;
        orders.sort_by(|a, b| b.1.order_time.cmp(&a.1.order_time));
        Ok(orders)
    }

    /// One order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the order does not exist and
    /// `DataCorruption` when the stored document is malformed.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn get(&self, user: &UserIdentity, order_id: &OrderId) -> Result<Order> {
        self.load(&user.id, order_id).await
    }

    /// Admin-facing status update.
    ///
    /// Writes only the status field, and only when the lifecycle permits
    /// the move.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the order does not exist,
    /// `InvalidTransition` when the lifecycle forbids the move, or a store
    /// error when the write fails.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
        new_status: OrderStatus,
    ) -> Result<()> {
        let order = self.load(user_id, order_id).await?;
        if !order.status.can_transition_to(new_status) {
            return Err(StorefrontError::InvalidTransition {
                from: order.status,
                to: new_status,
            });
        }

        let mut fields = Map::new();
        fields.insert("status".into(), json!(new_status.as_str()));
        self.store
            .update(&paths::order(user_id, order_id), fields)
            .await?;
        tracing::info!(user = %user_id, order = %order_id, status = %new_status, "order status updated");
        Ok(())
    }

    /// Every order across every user, newest first — the admin order board.
    ///
    /// Malformed documents are skipped with a warning rather than taking
    /// the whole board down.
    ///
    /// # Errors
    ///
    /// Returns a store error when the user tree cannot be read.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<(UserId, OrderId, Order)>> {
        let Some(value) = self.store.read(&paths::users()).await? else {
            return Ok(Vec::new());
        };
        let Some(users) = value.as_object() else {
            return Ok(Vec::new());
        };

        let mut all = Vec::new();
        for (user_key, user_node) in users {
            let Some(orders) = user_node.get("orders").and_then(|v| v.as_object()) else {
                continue;
            };
            for (order_key, doc) in orders {
                match Order::from_value(doc) {
                    Ok(order) => all.push((
                        UserId::new(user_key.clone()),
                        OrderId::new(order_key.clone()),
                        order,
                    )),
                    Err(err) => {
                        tracing::warn!(user = %user_key, order = %order_key, error = %err,
                            "skipping malformed order");
                    }
                }
            }
        }
        all.sort_by(|a, b| b.2.order_time.cmp(&a.2.order_time));
        Ok(all)
    }

    /// Subscribe to changes of the user's order collection.
    #[must_use]
    pub fn watch(&self, user: &UserIdentity) -> Subscription {
        self.store.subscribe(&paths::user_orders(&user.id))
    }

    async fn load(&self, user_id: &UserId, order_id: &OrderId) -> Result<Order> {
        let value = self
            .store
            .read(&paths::order(user_id, order_id))
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("order {order_id}")))?;
        Order::from_value(&value).map_err(|e| StorefrontError::corrupt("order", &e))
    }

    async fn orders_of(&self, user_id: &UserId) -> Result<Vec<(OrderId, Order)>> {
        let Some(value) = self.store.read(&paths::user_orders(user_id)).await? else {
            return Ok(Vec::new());
        };
        let Some(entries) = value.as_object() else {
            return Ok(Vec::new());
        };

        let mut orders = Vec::with_capacity(entries.len());
        for (key, doc) in entries {
            let order =
                Order::from_value(doc).map_err(|e| StorefrontError::corrupt("order", &e))?;
            orders.push((OrderId::new(key.clone()), order));
        }
        Ok(orders)
    }
}
