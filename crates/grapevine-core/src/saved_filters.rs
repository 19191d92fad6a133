use grapevine_store::{keys, StorageAdapter};
use tracing::info;
use uuid::Uuid;

use crate::{models::SearchFilter, Error, Result};

/// Named filters kept across sessions, stored as one JSON array
#[derive(Clone)]
pub struct SavedFilterStore {
    storage: StorageAdapter,
}

impl SavedFilterStore {
    pub fn new(storage: StorageAdapter) -> Self {
        Self { storage }
    }

    pub fn list(&self) -> Vec<SearchFilter> {
        self.storage.load_or_default(keys::SAVED_FILTERS)
    }

    pub fn get(&self, id: &str) -> Option<SearchFilter> {
        self.list()
            .into_iter()
            .find(|f| f.id.as_deref() == Some(id))
    }

    /// Store `filter` under `name` with a fresh id and return the stored copy
    pub fn save(&self, name: &str, filter: SearchFilter) -> Result<SearchFilter> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Saved filters need a name".into()));
        }

        let saved = SearchFilter {
            id: Some(Uuid::new_v4().to_string()),
            name: Some(name.to_string()),
            ..filter
        };
        self.storage
            .update(keys::SAVED_FILTERS, |filters: &mut Vec<SearchFilter>| {
                filters.push(saved.clone());
            });
        info!("Saved filter '{}'", name);
        Ok(saved)
    }

    /// Remove the filter with `id`. Returns whether one was removed.
    pub fn delete(&self, id: &str) -> bool {
        self.storage
            .update(keys::SAVED_FILTERS, |filters: &mut Vec<SearchFilter>| {
                let before = filters.len();
                filters.retain(|f| f.id.as_deref() != Some(id));
                filters.len() != before
            })
    }
}
