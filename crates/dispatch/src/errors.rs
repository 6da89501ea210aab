//! Error types for the dispatch domain.
//!
//! [`DispatchError`] is the request-level taxonomy: every failure a fetch or
//! webhook request can end in. The HTTP layer maps each variant to a status
//! code; nothing here is retried, since polling workers and webhook senders
//! retry on their own schedule.
//!
//! [`StoreError`] is produced by [`crate::QueueStore`] backends and
//! [`RequirementError`] by [`crate::VersionRequirement`] parsing.

use thiserror::Error;

use crate::{Capability, QueueName};

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Failure reported by a queue-store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached (connection refused, dropped, timed out).
    #[error("store unavailable during {operation}: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    /// The store answered, but not with what the operation expected.
    #[error("store protocol error during {operation}: {message}")]
    Protocol {
        operation: &'static str,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Requirement errors
// ---------------------------------------------------------------------------

/// A compatibility requirement expression could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version requirement '{expression}': {reason}")]
pub struct RequirementError {
    pub expression: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Request-level errors
// ---------------------------------------------------------------------------

/// Every way a dispatch request can fail.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The worker token header was missing or did not match.
    #[error("worker token missing or invalid")]
    AuthRejected,

    /// The worker failed a compatibility requirement.
    ///
    /// `capability` is the first requirement violated in gate order; the
    /// message shown to the worker does not depend on it.
    #[error("worker is outdated: {capability} requirement not met")]
    Outdated { capability: Capability },

    /// The queue store failed; fatal to the request.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    /// A popped item was not a valid job. The item has already been consumed.
    #[error("malformed item popped from queue '{queue}': {reason}")]
    MalformedQueuedItem { queue: QueueName, reason: String },

    /// A webhook body could not be parsed; nothing was enqueued.
    #[error("malformed webhook body: {reason}")]
    MalformedWebhookBody { reason: String },

    /// A configured requirement is not a valid version expression.
    #[error("{capability} requirement is invalid: {source}")]
    InvalidRequirement {
        capability: Capability,
        #[source]
        source: RequirementError,
    },

    /// A value could not be serialised for the store.
    #[error("failed to serialise {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl DispatchError {
    /// Returns `true` for failures caused by the caller rather than by the
    /// gateway or its store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DispatchError::AuthRejected
                | DispatchError::Outdated { .. }
                | DispatchError::MalformedWebhookBody { .. }
        )
    }
}
