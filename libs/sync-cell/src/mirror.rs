// libs/sync-cell/src/mirror.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, warn};

use shared_database::{Snapshot, SnapshotCallback};
use shared_models::Stored;

/// Published after every rebuild so dependent views can refresh.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MirrorEvent {
    pub collection: String,
    pub version: u64,
    pub records: usize,
}

/// Local replica of one remote collection, rebuilt wholesale from each snapshot.
pub struct Mirror<T> {
    collection: &'static str,
    records: RwLock<Vec<Stored<T>>>,
    version: AtomicU64,
    events: broadcast::Sender<MirrorEvent>,
    changed: Notify,
}

impl<T> Mirror<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(collection: &'static str, events: broadcast::Sender<MirrorEvent>) -> Self {
        Self {
            collection,
            records: RwLock::new(Vec::new()),
            version: AtomicU64::new(0),
            events,
            changed: Notify::new(),
        }
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    /// Replaces the whole mirror with `snapshot`, keeping snapshot order.
    /// Children that do not decode are skipped.
    pub fn apply_snapshot(&self, snapshot: Snapshot) -> usize {
        let total = snapshot.len();
        let rebuilt: Vec<Stored<T>> = snapshot
            .into_iter()
            .filter_map(|(key, value)| match decode_child(&key, value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed {} record {}: {}", self.collection, key, e);
                    None
                }
            })
            .collect();

        let count = rebuilt.len();
        *self.records.write() = rebuilt;
        let version = self.publish(count);

        debug!(
            "Rebuilt {} mirror v{} with {}/{} records",
            self.collection, version, count, total
        );

        count
    }

    /// Puts a record this desk just wrote into the mirror ahead of the
    /// store's own notification. The next snapshot replaces it as usual.
    pub fn upsert_local(&self, record: Stored<T>) {
        let count = {
            let mut records = self.records.write();
            match records.iter_mut().find(|existing| existing.id == record.id) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
            records.len()
        };
        self.publish(count);
    }

    pub fn remove_local(&self, id: &str) {
        let count = {
            let mut records = self.records.write();
            records.retain(|existing| existing.id != id);
            records.len()
        };
        self.publish(count);
    }

    /// Waits until `condition` holds for the mirror contents, re-checking
    /// after every change. Returns false if `timeout` passes first.
    pub async fn wait_for(&self, condition: impl Fn(&[Stored<T>]) -> bool, timeout: Duration) -> bool {
        let settled = async {
            loop {
                let notified = self.changed.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if self.read(|records| condition(records)) {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, settled).await.is_ok()
    }

    fn publish(&self, count: usize) -> u64 {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;

        // No receivers is fine: nothing is displaying this collection yet.
        let _ = self.events.send(MirrorEvent {
            collection: self.collection.to_string(),
            version,
            records: count,
        });
        self.changed.notify_waiters();

        version
    }

    /// Callback to hand to the store's `subscribe`.
    pub fn callback(self: &Arc<Self>) -> SnapshotCallback {
        let mirror = Arc::clone(self);
        Arc::new(move |snapshot: Snapshot| {
            mirror.apply_snapshot(snapshot);
        })
    }

    pub fn all(&self) -> Vec<Stored<T>> {
        self.records.read().clone()
    }

    /// Runs `view` against the current records without cloning them.
    pub fn read<R>(&self, view: impl FnOnce(&[Stored<T>]) -> R) -> R {
        view(&self.records.read())
    }

    pub fn get(&self, id: &str) -> Option<Stored<T>> {
        self.records.read().iter().find(|record| record.id == id).cloned()
    }

    pub fn find(&self, predicate: impl Fn(&Stored<T>) -> bool) -> Option<Stored<T>> {
        self.records.read().iter().find(|record| predicate(record)).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

fn decode_child<T: DeserializeOwned>(key: &str, value: Value) -> Result<Stored<T>> {
    let mut value = value;
    if let Value::Object(fields) = &mut value {
        fields.insert("id".to_string(), Value::String(key.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}
