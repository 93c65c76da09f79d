use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod collections {
    pub const APPOINTMENTS: &str = "appointments";
    pub const PATIENTS: &str = "patients";
    pub const DOCTORS: &str = "doctors";
}

/// Children of a collection as `(key, record)` pairs, in store order.
pub type Snapshot = Vec<(String, Value)>;

pub type SnapshotCallback = Arc<dyn Fn(Snapshot) + Send + Sync>;

/// Handle to a live subscription. Dropping it leaves the subscription running.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Shared realtime document store holding the clinic collections.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn read_once(&self, collection: &str) -> Result<Snapshot>;

    /// Delivers the current state immediately and again after every change.
    async fn subscribe(&self, collection: &str, on_change: SnapshotCallback) -> Result<Subscription>;

    /// Stores a record under a generated key and returns that key.
    async fn create(&self, collection: &str, record: Value) -> Result<String>;

    /// Merges the top-level fields of `partial` into the record at `id`.
    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<()>;

    /// Replaces the record at a caller-chosen key.
    async fn set(&self, collection: &str, id: &str, record: Value) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Flattens a collection value as returned by the store into a snapshot.
pub fn snapshot_from_value(value: Value) -> Snapshot {
    match value {
        Value::Object(children) => children.into_iter().collect(),
        // Collections keyed by small integers come back as sparse arrays.
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        _ => Vec::new(),
    }
}
