//! Core domain of the CI dispatch gateway.
//!
//! This crate holds every rule of the gateway: how workers are admitted, how
//! jobs are handed off, how liveness is recorded and how webhook deliveries
//! are normalised. Infrastructure crates implement the [`QueueStore`] and
//! [`ConfigSource`] ports defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; the `store` and `gateway` crates define *how*
//! to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`QueueName`, `HostId`, `ServiceName`, `EventType`) |
//! | [`types`] | Value types (`Job`, `WebhookEnvelope`, `ReportedVersions`, `Timestamp`) |
//! | [`errors`] | `DispatchError`, `StoreError`, `RequirementError` |
//! | [`version`] | Version requirement parsing and satisfaction |
//! | [`config`] | Worker token, requirements and the `ConfigSource` port |
//! | [`gate`] | The version gate |
//! | [`store`] | The `QueueStore` port and key layout |
//! | [`liveness`] | Host resolution and the last-seen tracker |
//! | [`jobs`] | Job queues and the fetch flow |
//! | [`webhooks`] | Webhook envelope ingestion |

pub mod config;
pub mod errors;
pub mod gate;
pub mod identifiers;
pub mod jobs;
pub mod liveness;
pub mod store;
pub mod types;
pub mod version;
pub mod webhooks;

#[cfg(test)]
mod test_support;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{
    authorize, CompatibilityRequirements, ConfigSource, GateConfig, StaticConfigSource,
    WorkerToken,
};
pub use errors::{DispatchError, RequirementError, StoreError};
pub use gate::check_compatibility;
pub use identifiers::{EventType, HostId, QueueName, ServiceName};
pub use jobs::{Dispatcher, JobQueue};
pub use liveness::{resolve_host, LastSeenTracker};
pub use store::{KeySpace, QueueStore};
pub use types::{Capability, Job, ReportedVersions, Timestamp, WebhookEnvelope, WorkerIdentity};
pub use version::VersionRequirement;
pub use webhooks::{parse_payload, WebhookQueue};
