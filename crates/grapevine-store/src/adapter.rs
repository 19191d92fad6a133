use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::store::{KeyValueStore, StoreError};

/// JSON view over a [`KeyValueStore`].
///
/// Storage problems (disk full, corrupt blob, poisoned lock) never reach the
/// caller: reads degrade to "no data" and writes are dropped, both with a
/// warning in the log.
#[derive(Clone)]
pub struct StorageAdapter {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl StorageAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Decode the JSON value under `key`, or `None` if it is missing or unreadable
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_load(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read '{}' from storage: {}", key, e);
                None
            }
        }
    }

    pub fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.load(key).unwrap_or_default()
    }

    /// Store `value` as JSON. Returns whether the write landed.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping write of '{}': {}", key, e);
                false
            }
        }
    }

    /// Plain string values (tokens, usernames) are stored verbatim
    pub fn load_string(&self, key: &str) -> Option<String> {
        match self.store.get_raw(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read '{}' from storage: {}", key, e);
                None
            }
        }
    }

    pub fn save_string(&self, key: &str, value: &str) -> bool {
        match self.store.set_raw(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping write of '{}': {}", key, e);
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.store.remove(key) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove '{}' from storage: {}", key, e);
                false
            }
        }
    }

    /// Read-modify-write of the value under `key`.
    ///
    /// The whole cycle holds the adapter's write lock, so two writers sharing
    /// this adapter cannot lose each other's updates. Only a missing key
    /// starts from the default. If the stored value cannot be read, the
    /// closure still runs against a default but nothing is written back, so
    /// the data already on disk survives.
    pub fn update<T, F, R>(&self, key: &str, f: F) -> R
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> R,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        match self.try_load::<T>(key) {
            Ok(stored) => {
                let mut value = stored.unwrap_or_default();
                let result = f(&mut value);
                self.save(key, &value);
                result
            }
            Err(e) => {
                warn!("Skipping update of '{}', stored value unreadable: {}", key, e);
                let mut scratch = T::default();
                f(&mut scratch)
            }
        }
    }

    fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn try_save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.store.set_raw(key, &raw)
    }
}
