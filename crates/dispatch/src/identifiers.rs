//! Newtype identifiers for the dispatch domain.
//!
//! Queue names, host identifiers, webhook services and event types all travel
//! as strings on the wire. Wrapping each in its own newtype keeps a queue name
//! from being handed where a host identifier is expected, even though both are
//! `String` under the hood.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Names one job channel.
    ///
    /// Names are opaque: any non-empty string is accepted and no character is
    /// reserved. Each name maps to an independent list in the store.
    QueueName
}

impl QueueName {
    /// Name of the channel served by `GET /fetch`.
    pub const DEFAULT: &'static str = "default";

    /// Returns the default channel.
    pub fn default_queue() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    /// Resolves an optional path segment to a channel; absent or empty means
    /// the default channel.
    pub fn from_segment(segment: Option<&str>) -> Self {
        segment
            .and_then(|s| Self::new(s))
            .unwrap_or_else(Self::default_queue)
    }
}

impl Default for QueueName {
    fn default() -> Self {
        Self::default_queue()
    }
}

string_id! {
    /// Key under which a worker's liveness is tracked.
    ///
    /// Produced by [`crate::liveness::resolve_host`]: either the worker's
    /// self-declared host name or its observed network address.
    HostId
}

impl HostId {
    /// Placeholder used when neither a host header nor a peer address is
    /// available.
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }
}

string_id! {
    /// The `service` of a webhook envelope: the route slug, or the fixed
    /// provider name for a dedicated provider route (e.g. `"github"`).
    ServiceName
}

impl ServiceName {
    /// Service recorded for deliveries on the dedicated GitHub route.
    pub const GITHUB: &'static str = "github";

    pub fn github() -> Self {
        Self(Self::GITHUB.to_string())
    }
}

string_id! {
    /// The `type` of a webhook envelope, taken from the provider's event-name
    /// header (e.g. `"push"`, `"pull_request"`).
    EventType
}

impl EventType {
    /// Value recorded when the provider sent no event-name header.
    pub const UNKNOWN: &'static str = "unknown";

    /// Classifies an optional header value; absent or blank means
    /// [`EventType::UNKNOWN`].
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .map(str::trim)
            .and_then(|v| Self::new(v))
            .unwrap_or_else(|| Self(Self::UNKNOWN.to_string()))
    }

    /// Returns `true` if no event-name header was available.
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_identifiers_are_rejected() {
        assert!(QueueName::new("").is_none());
        assert!(HostId::new(String::new()).is_none());
        assert!(ServiceName::new("").is_none());
    }

    #[test]
    fn missing_segment_resolves_to_default_queue() {
        assert_eq!(QueueName::from_segment(None).as_str(), "default");
        assert_eq!(QueueName::from_segment(Some("")).as_str(), "default");
        assert_eq!(QueueName::from_segment(Some("custom")).as_str(), "custom");
    }

    #[test]
    fn queue_names_keep_arbitrary_characters() {
        let name = QueueName::new("team:a/b c").unwrap();
        assert_eq!(name.as_str(), "team:a/b c");
    }

    #[test]
    fn event_type_defaults_to_unknown() {
        assert!(EventType::from_header(None).is_unknown());
        assert!(EventType::from_header(Some("   ")).is_unknown());
        assert_eq!(EventType::from_header(Some("push")).as_str(), "push");
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let service = ServiceName::new("gitlab").unwrap();
        assert_eq!(serde_json::to_string(&service).unwrap(), "\"gitlab\"");
    }
}
