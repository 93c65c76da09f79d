pub mod kv;
pub mod memory;
pub mod realtime;
pub mod store;

pub use kv::{FileKvStore, KeyValueStore, MemoryKvStore};
pub use memory::MemoryStore;
pub use realtime::RealtimeDbClient;
pub use store::{collections, RemoteStore, Snapshot, SnapshotCallback, Subscription};
