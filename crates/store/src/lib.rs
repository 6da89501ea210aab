//! Queue-store backends for the dispatch gateway.
//!
//! Implements the [`dispatch::QueueStore`] port twice:
//!
//! - [`RedisQueueStore`]: production backend. Queues and the webhook list
//!   are Redis lists, the last-seen map is a Redis hash.
//! - [`InMemoryQueueStore`]: process-local backend for development and
//!   tests, with the same per-key atomicity.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection handling, command selection and error
//! classification live here. The [`dispatch`] crate sees only
//! [`dispatch::QueueStore`] and [`dispatch::StoreError`].

pub mod memory;
pub mod redis_store;

pub use memory::InMemoryQueueStore;
pub use redis_store::{ConnectError, RedisQueueStore};
