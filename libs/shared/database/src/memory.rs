use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::store::{RemoteStore, Snapshot, SnapshotCallback, Subscription};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<(String, Value)>>,
    listeners: HashMap<String, Vec<(u64, SnapshotCallback)>>,
    next_listener: u64,
    failing: HashSet<String>,
}

/// In-process store. Subscribers are notified synchronously after each write,
/// so a write's effect is visible in every mirror by the time the write returns.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write to `collection` fail until switched back off.
    pub fn fail_writes_to(&self, collection: &str, failing: bool) {
        let mut inner = self.inner.lock();
        if failing {
            inner.failing.insert(collection.to_string());
        } else {
            inner.failing.remove(collection);
        }
    }

    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .collections
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn mutate<R>(
        &self,
        collection: &str,
        change: impl FnOnce(&mut Vec<(String, Value)>) -> Result<R>,
    ) -> Result<R> {
        let (result, snapshot, listeners) = {
            let mut inner = self.inner.lock();
            if inner.failing.contains(collection) {
                return Err(anyhow!("Write to {} rejected by store", collection));
            }

            let children = inner.collections.entry(collection.to_string()).or_default();
            let result = change(children)?;
            let snapshot = children.clone();
            let listeners: Vec<SnapshotCallback> = inner
                .listeners
                .get(collection)
                .map(|entries| entries.iter().map(|(_, callback)| callback.clone()).collect())
                .unwrap_or_default();
            (result, snapshot, listeners)
        };

        // Callbacks run outside the lock so they may read the store again.
        for listener in listeners {
            listener(snapshot.clone());
        }

        Ok(result)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn read_once(&self, collection: &str) -> Result<Snapshot> {
        Ok(self
            .inner
            .lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn subscribe(&self, collection: &str, on_change: SnapshotCallback) -> Result<Subscription> {
        let (listener_id, snapshot) = {
            let mut inner = self.inner.lock();
            let listener_id = inner.next_listener;
            inner.next_listener += 1;
            inner
                .listeners
                .entry(collection.to_string())
                .or_default()
                .push((listener_id, on_change.clone()));
            let snapshot = inner.collections.get(collection).cloned().unwrap_or_default();
            (listener_id, snapshot)
        };

        debug!("Subscribed listener {} to {}", listener_id, collection);
        on_change(snapshot);

        let inner = self.inner.clone();
        let collection = collection.to_string();
        Ok(Subscription::new(move || {
            if let Some(entries) = inner.lock().listeners.get_mut(&collection) {
                entries.retain(|(id, _)| *id != listener_id);
            }
        }))
    }

    async fn create(&self, collection: &str, record: Value) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.mutate(collection, |children| {
            children.push((id.clone(), record));
            Ok(())
        })?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<()> {
        let Value::Object(fields) = partial else {
            return Err(anyhow!("Update payload for {}/{} must be an object", collection, id));
        };

        self.mutate(collection, |children| {
            match children.iter_mut().find(|(key, _)| key == id) {
                Some((_, Value::Object(existing))) => existing.extend(fields),
                Some((_, other)) => *other = Value::Object(fields),
                None => children.push((id.to_string(), Value::Object(fields))),
            }
            Ok(())
        })
    }

    async fn set(&self, collection: &str, id: &str, record: Value) -> Result<()> {
        self.mutate(collection, |children| {
            match children.iter_mut().find(|(key, _)| key == id) {
                Some((_, existing)) => *existing = record,
                None => children.push((id.to_string(), record)),
            }
            Ok(())
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.mutate(collection, |children| {
            children.retain(|(key, _)| key != id);
            Ok(())
        })
    }
}
