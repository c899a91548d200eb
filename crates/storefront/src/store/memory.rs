//! In-process document store.
//!
//! `MemoryStore` keeps the whole document tree as one JSON object guarded by
//! an async `RwLock`, and fans change events out over a broadcast channel.
//! It backs the test suites and local development; the trait contract it
//! implements (atomic batches, null-write-deletes, empty-node pruning) is
//! the one a hosted backend adapter must also honor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{RwLock, broadcast};

use super::{
    BatchOp, ChangeEvent, DocumentStore, StoreError, StorePath, Subscription, WriteBatch,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// In-memory [`DocumentStore`] implementation.
///
/// Cheaply cloneable; clones share the same tree and event channel.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

struct MemoryStoreInner {
    root: RwLock<Value>,
    events: broadcast::Sender<ChangeEvent>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryStoreInner {
                root: RwLock::new(Value::Object(Map::new())),
                events,
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Make every subsequent mutation fail with `WriteFailed`.
    ///
    /// Test support for the checkout `Placing -> Failed` path; reads are
    /// unaffected.
    pub fn inject_write_failure(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot the entire tree. Test support.
    pub async fn dump(&self) -> Value {
        self.inner.root.read().await.clone()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed("injected write failure".into()));
        }
        Ok(())
    }

    fn emit(&self, events: Vec<ChangeEvent>) {
        for event in events {
            // No receivers is fine.
            let _ = self.inner.events.send(event);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let root = self.inner.root.read().await;
        Ok(node_at(&root, path).cloned())
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.check_writable()?;
        let event = {
            let mut root = self.inner.root.write().await;
            apply_put(&mut root, path, value)
        };
        self.emit(vec![event]);
        Ok(())
    }

    async fn update(
        &self,
        path: &StorePath,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let event = {
            let mut root = self.inner.root.write().await;
            merge_fields(&mut root, path, fields);
            ChangeEvent {
                path: path.as_str().to_owned(),
                value: node_at(&root, path).cloned(),
            }
        };
        self.emit(vec![event]);
        Ok(())
    }

    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        self.check_writable()?;
        let event = {
            let mut root = self.inner.root.write().await;
            remove_at(&mut root, path);
            ChangeEvent {
                path: path.as_str().to_owned(),
                value: None,
            }
        };
        self.emit(vec![event]);
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.check_writable()?;
        let events = {
            let mut root = self.inner.root.write().await;

            for guard in batch.guards() {
                let current = node_at(&root, &guard.path).cloned().unwrap_or(Value::Null);
                if current != guard.expected {
                    return Err(StoreError::GuardFailed {
                        path: guard.path.as_str().to_owned(),
                    });
                }
            }

            batch
                .ops()
                .iter()
                .map(|op| match op {
                    BatchOp::Put { path, value } => apply_put(&mut root, path, value.clone()),
                    BatchOp::Delete { path } => {
                        remove_at(&mut root, path);
                        ChangeEvent {
                            path: path.as_str().to_owned(),
                            value: None,
                        }
                    }
                })
                .collect::<Vec<_>>()
        };
        self.emit(events);
        Ok(())
    }

    fn subscribe(&self, path: &StorePath) -> Subscription {
        Subscription::new(path.as_str().to_owned(), self.inner.events.subscribe())
    }
}

// =============================================================================
// Tree navigation
// =============================================================================

fn node_at<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Put `value` at `path`, treating `Null` as a delete, and return the
/// resulting change event.
fn apply_put(root: &mut Value, path: &StorePath, value: Value) -> ChangeEvent {
    if value.is_null() {
        remove_at(root, path);
        return ChangeEvent {
            path: path.as_str().to_owned(),
            value: None,
        };
    }
    set_at(root, path, value.clone());
    ChangeEvent {
        path: path.as_str().to_owned(),
        value: Some(value),
    }
}

fn set_at(root: &mut Value, path: &StorePath, value: Value) {
    let mut current = root;
    let mut segments = path.segments().peekable();
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_owned(), value);
            return;
        }
        current = map
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

fn merge_fields(root: &mut Value, path: &StorePath, fields: Map<String, Value>) {
    for (key, value) in fields {
        let field_path = path.child(&key);
        if value.is_null() {
            remove_at(root, &field_path);
        } else {
            set_at(root, &field_path, value);
        }
    }
}

fn remove_at(root: &mut Value, path: &StorePath) {
    let segments: Vec<&str> = path.segments().collect();
    remove_segments(root, &segments);
}

/// Remove the node at `segments`, pruning ancestors that become empty:
/// an empty object and a missing node are the same thing in this tree.
fn remove_segments(node: &mut Value, segments: &[&str]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };
    let Some(map) = node.as_object_mut() else {
        return false;
    };
    if rest.is_empty() {
        return map.remove(*first).is_some();
    }
    let removed = match map.get_mut(*first) {
        Some(child) => remove_segments(child, rest),
        None => false,
    };
    if removed
        && map
            .get(*first)
            .is_some_and(|child| child.as_object().is_some_and(Map::is_empty))
    {
        map.remove(*first);
    }
    removed
}
