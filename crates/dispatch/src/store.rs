//! Queue-store port.
//!
//! The gateway treats its store as an opaque service of named ordered lists
//! and hash maps. [`QueueStore`] is the whole contract: each method is a single
//! atomic primitive on the backend, so no application-level locking is needed
//! and concurrent requests are linearised by the store itself.
//!
//! Implementations live in the `store` crate (Redis and in-memory).
//!
//! ## Key layout
//!
//! All keys share one namespace prefix ([`KeySpace`]):
//!
//! | Key | Type | Contents |
//! |-----|------|----------|
//! | `{ns}:queue:{name}` | list | serialised jobs, pushed at the back, popped from the front |
//! | `{ns}:webhooks` | list | serialised webhook envelopes in arrival order |
//! | `{ns}:last-seen` | hash | host identifier → RFC 3339 timestamp |

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{QueueName, StoreError};

/// Narrow contract over an external ordered-list / hash-map store.
///
/// Lists are FIFO: [`QueueStore::push_back`] appends at the tail and
/// [`QueueStore::pop_front`] removes from the head.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Appends `item` at the tail of `list`.
    async fn push_back(&self, list: &str, item: String) -> Result<(), StoreError>;

    /// Atomically removes and returns the head of `list`; `None` if empty.
    async fn pop_front(&self, list: &str) -> Result<Option<String>, StoreError>;

    /// Number of items in `list`.
    async fn list_len(&self, list: &str) -> Result<u64, StoreError>;

    /// Every item of `list`, head first, without removing anything.
    async fn list_items(&self, list: &str) -> Result<Vec<String>, StoreError>;

    /// Sets `field` of `hash` to `value`, overwriting any previous value.
    async fn hash_set(&self, hash: &str, field: &str, value: String) -> Result<(), StoreError>;

    /// Reads `field` of `hash`.
    async fn hash_get(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Reads every field of `hash`.
    async fn hash_entries(&self, hash: &str) -> Result<BTreeMap<String, String>, StoreError>;
}

/// Builds store keys under a shared namespace prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    /// Namespace used when none is configured.
    pub const DEFAULT_NAMESPACE: &'static str = "dispatch";

    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if namespace.is_empty() {
            Self::default()
        } else {
            Self { namespace }
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// List holding the jobs of `queue`.
    pub fn queue(&self, queue: &QueueName) -> String {
        format!("{}:queue:{}", self.namespace, queue)
    }

    /// List holding webhook envelopes.
    pub fn webhooks(&self) -> String {
        format!("{}:webhooks", self.namespace)
    }

    /// Hash holding last-seen timestamps.
    pub fn last_seen(&self) -> String {
        format!("{}:last-seen", self.namespace)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self {
            namespace: Self::DEFAULT_NAMESPACE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_share_the_namespace() {
        let keys = KeySpace::new("ci");
        assert_eq!(keys.queue(&QueueName::default_queue()), "ci:queue:default");
        assert_eq!(keys.queue(&QueueName::new("gpu").unwrap()), "ci:queue:gpu");
        assert_eq!(keys.webhooks(), "ci:webhooks");
        assert_eq!(keys.last_seen(), "ci:last-seen");
    }

    #[test]
    fn empty_namespace_falls_back_to_default() {
        assert_eq!(KeySpace::new("").namespace(), "dispatch");
    }
}
