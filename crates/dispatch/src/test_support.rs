//! In-crate fake [`QueueStore`] for unit tests.
//!
//! The real in-memory backend lives in the `store` crate, which depends on
//! this one; this fake keeps the domain tests self-contained.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{QueueStore, StoreError};

#[derive(Default)]
pub(crate) struct FakeStore {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    hashes: Mutex<HashMap<String, BTreeMap<String, String>>>,
    offline: AtomicBool,
    pops: Mutex<u64>,
}

impl FakeStore {
    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn pop_count(&self) -> u64 {
        *self.pops.lock().unwrap()
    }

    fn check(&self, operation: &'static str) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable {
                operation,
                message: "connection refused".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl QueueStore for FakeStore {
    async fn push_back(&self, list: &str, item: String) -> Result<(), StoreError> {
        self.check("push_back")?;
        self.lists
            .lock()
            .unwrap()
            .entry(list.to_string())
            .or_default()
            .push_back(item);
        Ok(())
    }

    async fn pop_front(&self, list: &str) -> Result<Option<String>, StoreError> {
        self.check("pop_front")?;
        *self.pops.lock().unwrap() += 1;
        Ok(self
            .lists
            .lock()
            .unwrap()
            .get_mut(list)
            .and_then(VecDeque::pop_front))
    }

    async fn list_len(&self, list: &str) -> Result<u64, StoreError> {
        self.check("list_len")?;
        Ok(self
            .lists
            .lock()
            .unwrap()
            .get(list)
            .map_or(0, |l| l.len() as u64))
    }

    async fn list_items(&self, list: &str) -> Result<Vec<String>, StoreError> {
        self.check("list_items")?;
        Ok(self
            .lists
            .lock()
            .unwrap()
            .get(list)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn hash_set(&self, hash: &str, field: &str, value: String) -> Result<(), StoreError> {
        self.check("hash_set")?;
        self.hashes
            .lock()
            .unwrap()
            .entry(hash.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hash_get(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.check("hash_get")?;
        Ok(self
            .hashes
            .lock()
            .unwrap()
            .get(hash)
            .and_then(|h| h.get(field).cloned()))
    }

    async fn hash_entries(&self, hash: &str) -> Result<BTreeMap<String, String>, StoreError> {
        self.check("hash_entries")?;
        Ok(self
            .hashes
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .unwrap_or_default())
    }
}
