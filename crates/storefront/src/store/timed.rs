//! Bounded-timeout store decorator.
//!
//! The hosted backend gives no completion guarantee, so every operation the
//! core issues goes through `TimedStore`, which converts an overdue await
//! into [`StoreError::Timeout`] instead of hanging the calling flow.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::time::timeout;

use super::{DocumentStore, StoreError, StorePath, Subscription, WriteBatch};

/// Wraps any [`DocumentStore`], imposing one timeout on every operation.
///
/// Subscriptions are exempt: they are long-lived registrations, not
/// request/response round trips.
pub struct TimedStore<S> {
    inner: S,
    limit: Duration,
}

impl<S> TimedStore<S> {
    /// Wrap `inner` with the given per-operation limit.
    pub const fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

impl<S> TimedStore<S> {
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>> + Send,
    ) -> Result<T, StoreError> {
        timeout(self.limit, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.limit))?
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for TimedStore<S> {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.bounded(self.inner.read(path)).await
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.bounded(self.inner.write(path, value)).await
    }

    async fn update(
        &self,
        path: &StorePath,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.bounded(self.inner.update(path, fields)).await
    }

    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        self.bounded(self.inner.delete(path)).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.bounded(self.inner.commit(batch)).await
    }

    fn subscribe(&self, path: &StorePath) -> Subscription {
        self.inner.subscribe(path)
    }
}
