//! Webhook ingestion.
//!
//! Every delivery, whatever its provider, is wrapped in a
//! [`WebhookEnvelope`] and appended to one shared list. The append completes
//! before the caller acknowledges the delivery, so an accepted webhook is a
//! stored webhook.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::{
    DispatchError, EventType, KeySpace, QueueStore, ServiceName, StoreError, WebhookEnvelope,
};

/// Parses a raw request body into an envelope payload.
///
/// Any JSON value is accepted; the payload is not validated against a
/// provider schema.
pub fn parse_payload(body: &[u8]) -> Result<Value, DispatchError> {
    serde_json::from_slice(body).map_err(|e| DispatchError::MalformedWebhookBody {
        reason: e.to_string(),
    })
}

/// Append-only queue of webhook envelopes.
#[derive(Clone)]
pub struct WebhookQueue {
    store: Arc<dyn QueueStore>,
    key: String,
}

impl WebhookQueue {
    pub fn new(store: Arc<dyn QueueStore>, keys: &KeySpace) -> Self {
        Self {
            store,
            key: keys.webhooks(),
        }
    }

    /// Wraps a delivery in an envelope and appends it.
    pub async fn ingest(
        &self,
        service: ServiceName,
        event_type: EventType,
        payload: Value,
    ) -> Result<WebhookEnvelope, DispatchError> {
        let envelope = WebhookEnvelope {
            service,
            event_type,
            payload,
        };
        self.append(&envelope).await?;

        info!(
            service = %envelope.service,
            event_type = %envelope.event_type,
            "Webhook queued"
        );
        Ok(envelope)
    }

    async fn append(&self, envelope: &WebhookEnvelope) -> Result<(), DispatchError> {
        let item = serde_json::to_string(envelope).map_err(|source| {
            DispatchError::Serialization {
                what: "webhook envelope",
                source,
            }
        })?;
        self.store.push_back(&self.key, item).await?;
        Ok(())
    }

    /// Number of queued envelopes.
    pub async fn len(&self) -> Result<u64, StoreError> {
        self.store.list_len(&self.key).await
    }

    /// Every queued envelope, oldest first.
    pub async fn envelopes(&self) -> Result<Vec<WebhookEnvelope>, StoreError> {
        self.store
            .list_items(&self.key)
            .await?
            .iter()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| StoreError::Protocol {
                    operation: "webhook_envelopes",
                    message: e.to_string(),
                })
            })
            .collect()
    }
}
