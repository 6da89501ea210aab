//! Shared value types for the dispatch domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! structured values: queued jobs, webhook envelopes, the versions a worker
//! reports about itself, and timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{EventType, HostId, ServiceName};

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// A queued build job.
///
/// The gateway does not own the job schema. Any JSON object is a valid job
/// and every field is carried through unchanged; [`Job::branch`] and
/// [`Job::clone_url`] are conveniences for the two fields every producer sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Job(Map<String, Value>);

impl Job {
    /// Creates a job carrying only a source branch and a clone location.
    pub fn new(branch: impl Into<String>, clone_url: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("branch".to_string(), Value::String(branch.into()));
        fields.insert("clone_url".to_string(), Value::String(clone_url.into()));
        Self(fields)
    }

    /// Source branch to build, if the producer set one.
    pub fn branch(&self) -> Option<&str> {
        self.0.get("branch").and_then(Value::as_str)
    }

    /// Location the worker clones from, if the producer set one.
    pub fn clone_url(&self) -> Option<&str> {
        self.0.get("clone_url").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

/// A webhook delivery normalised for the shared webhook queue.
///
/// Envelopes are appended in arrival order and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    /// Route slug, or the fixed provider name for a dedicated route.
    pub service: ServiceName,

    /// Provider event name, or `"unknown"` when the provider sent none.
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// The request body, stored verbatim.
    pub payload: Value,
}

// ---------------------------------------------------------------------------
// Worker identity
// ---------------------------------------------------------------------------

/// One of the independently versioned concerns a worker must be compatible
/// with before it is handed a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// The worker binary itself.
    Worker,
    /// The settings schema the worker understands.
    Settings,
    /// The coverage tooling bundled with the worker.
    Coverage,
}

impl Capability {
    /// Evaluation order of the compatibility gate.
    pub const ALL: [Capability; 3] = [
        Capability::Worker,
        Capability::Settings,
        Capability::Coverage,
    ];
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::Worker => "worker",
            Capability::Settings => "settings",
            Capability::Coverage => "coverage",
        };
        f.write_str(name)
    }
}

/// Versions a worker reported about itself. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportedVersions {
    pub worker: Option<String>,
    pub settings: Option<String>,
    pub coverage: Option<String>,
}

impl ReportedVersions {
    /// Returns the reported version for `capability`, ignoring blank values.
    pub fn get(&self, capability: Capability) -> Option<&str> {
        let value = match capability {
            Capability::Worker => &self.worker,
            Capability::Settings => &self.settings,
            Capability::Coverage => &self.coverage,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Who is asking for work: what the worker reported plus where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    pub versions: ReportedVersions,
    pub host: HostId,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly. Stored in the last-seen hash in RFC 3339 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parses an RFC 3339 timestamp, normalising it to UTC.
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
