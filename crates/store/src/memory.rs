//! In-memory queue store.
//!
//! Lists and hashes live in [`DashMap`]s; each operation takes the shard lock
//! for one key, which gives the same per-key atomicity Redis provides. Nothing
//! survives a restart, so this backend is for development and tests.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use dashmap::DashMap;
use dispatch::{QueueStore, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryQueueStore {
    lists: DashMap<String, VecDeque<String>>,
    hashes: DashMap<String, BTreeMap<String, String>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn push_back(&self, list: &str, item: String) -> Result<(), StoreError> {
        self.lists
            .entry(list.to_string())
            .or_default()
            .push_back(item);
        Ok(())
    }

    async fn pop_front(&self, list: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .lists
            .get_mut(list)
            .and_then(|mut items| items.pop_front()))
    }

    async fn list_len(&self, list: &str) -> Result<u64, StoreError> {
        Ok(self.lists.get(list).map_or(0, |items| items.len() as u64))
    }

    async fn list_items(&self, list: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lists
            .get(list)
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn hash_set(&self, hash: &str, field: &str, value: String) -> Result<(), StoreError> {
        self.hashes
            .entry(hash.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hash_get(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .hashes
            .get(hash)
            .and_then(|entries| entries.get(field).cloned()))
    }

    async fn hash_entries(&self, hash: &str) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self
            .hashes
            .get(hash)
            .map(|entries| entries.value().clone())
            .unwrap_or_default())
    }
}
