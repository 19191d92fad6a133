// Local persistence: a small key/value store plus a JSON adapter on top.
// Everything that has to survive a restart (analytics, saved filters,
// session values) goes through here.

pub mod adapter;
pub mod keys;
pub mod store;

pub use adapter::StorageAdapter;
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};
