//! Worker liveness: host resolution and the last-seen tracker.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use tracing::warn;

use crate::{HostId, KeySpace, QueueStore, StoreError, Timestamp};

/// Resolves the key a worker's liveness is tracked under.
///
/// An explicit host value wins when it is present and not blank. Otherwise
/// the observed peer address is used, with IPv4-mapped IPv6 addresses shown
/// in their IPv4 form. With neither, the host is [`HostId::unknown`].
pub fn resolve_host(explicit: Option<&str>, peer: Option<IpAddr>) -> HostId {
    if let Some(host) = explicit.map(str::trim).and_then(|h| HostId::new(h)) {
        return host;
    }

    peer.and_then(|ip| HostId::new(ip.to_canonical().to_string()))
        .unwrap_or_else(HostId::unknown)
}

/// Records when each worker host last fetched.
///
/// One hash entry per host, overwritten on every accepted fetch.
#[derive(Clone)]
pub struct LastSeenTracker {
    store: Arc<dyn QueueStore>,
    key: String,
}

impl LastSeenTracker {
    pub fn new(store: Arc<dyn QueueStore>, keys: &KeySpace) -> Self {
        Self {
            store,
            key: keys.last_seen(),
        }
    }

    /// Upserts the last-seen entry for `host`.
    pub async fn record(&self, host: &HostId, at: Timestamp) -> Result<(), StoreError> {
        self.store
            .hash_set(&self.key, host.as_str(), at.to_string())
            .await
    }

    /// When `host` last fetched, if ever.
    pub async fn get(&self, host: &HostId) -> Result<Option<Timestamp>, StoreError> {
        let Some(raw) = self.store.hash_get(&self.key, host.as_str()).await? else {
            return Ok(None);
        };

        Timestamp::parse_rfc3339(&raw)
            .map(Some)
            .ok_or_else(|| StoreError::Protocol {
                operation: "last_seen_get",
                message: format!("unparseable timestamp for host {host}"),
            })
    }

    /// Every tracked host. Entries whose timestamp cannot be parsed are
    /// skipped.
    pub async fn all(&self) -> Result<BTreeMap<HostId, Timestamp>, StoreError> {
        let entries = self.store.hash_entries(&self.key).await?;

        Ok(entries
            .into_iter()
            .filter_map(|(host, raw)| {
                let parsed = HostId::new(host.clone()).zip(Timestamp::parse_rfc3339(&raw));
                if parsed.is_none() {
                    warn!(host = %host, value = %raw, "Skipping malformed last-seen entry");
                }
                parsed
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeStore;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn explicit_host_wins() {
        let peer = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(resolve_host(Some("builder-3"), peer).as_str(), "builder-3");
    }

    #[test]
    fn blank_host_falls_back_to_peer() {
        let peer = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(resolve_host(Some("  "), peer).as_str(), "10.0.0.7");
        assert_eq!(resolve_host(None, peer).as_str(), "10.0.0.7");
    }

    #[test]
    fn mapped_ipv6_peer_is_shown_as_ipv4() {
        let mapped = Ipv4Addr::new(192, 168, 1, 20).to_ipv6_mapped();
        assert_eq!(
            resolve_host(None, Some(IpAddr::V6(mapped))).as_str(),
            "192.168.1.20"
        );
        assert_eq!(
            resolve_host(None, Some(IpAddr::V6(Ipv6Addr::LOCALHOST))).as_str(),
            "::1"
        );
    }

    #[test]
    fn nothing_to_resolve_is_unknown() {
        assert_eq!(resolve_host(None, None), HostId::unknown());
    }

    #[tokio::test]
    async fn record_overwrites_previous_entry() {
        let store = Arc::new(FakeStore::default());
        let tracker = LastSeenTracker::new(store, &KeySpace::default());
        let host = HostId::new("builder-1").unwrap();

        let first = Timestamp::parse_rfc3339("2024-01-01T00:00:00Z").unwrap();
        let second = Timestamp::parse_rfc3339("2024-01-01T00:05:00Z").unwrap();
        tracker.record(&host, first).await.unwrap();
        tracker.record(&host, second).await.unwrap();

        assert_eq!(tracker.get(&host).await.unwrap(), Some(second));
        assert_eq!(tracker.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unseen_host_has_no_entry() {
        let tracker = LastSeenTracker::new(Arc::new(FakeStore::default()), &KeySpace::default());
        assert_eq!(tracker.get(&HostId::new("ghost").unwrap()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_entries_are_skipped_in_listing() {
        let store = Arc::new(FakeStore::default());
        let keys = KeySpace::default();
        store
            .hash_set(&keys.last_seen(), "broken", "not a time".to_string())
            .await
            .unwrap();
        let tracker = LastSeenTracker::new(store, &keys);
        tracker
            .record(&HostId::new("ok").unwrap(), Timestamp::now())
            .await
            .unwrap();

        let all = tracker.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key(&HostId::new("ok").unwrap()));
        assert!(tracker.get(&HostId::new("broken").unwrap()).await.is_err());
    }
}
