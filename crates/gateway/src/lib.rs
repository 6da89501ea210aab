//! HTTP surface of the dispatch gateway.
//!
//! Wires the [`dispatch`] domain to axum:
//!
//! - Workers poll `GET /fetch` or `GET /fetch/{queue}` for one job at a time
//! - Code hosts deliver webhooks to `POST /webhooks/{slug}` (or the dedicated
//!   `POST /webhooks/github`), which are queued for a downstream consumer
//! - Operators inspect the fleet through `GET /workers`
//!
//! # Endpoints
//!
//! | Method & Path | Auth | Success |
//! |---|---|---|
//! | `GET /` | no | 302 to the documentation URL |
//! | `GET /health` | no | 200 `OK` |
//! | `GET /fetch` | token | 200 `{"job": ...}` |
//! | `GET /fetch/{queue}` | token | 200 `{"job": ...}` |
//! | `GET /workers` | token | 200 `{"workers": {...}}` |
//! | `POST /webhooks/{slug}` | no | 202, empty body |
//! | `POST /webhooks/github` | no | 202, empty body |
//!
//! Token-protected routes sit behind [`auth::require_worker_token`], which
//! reads only the current worker token. Fetch handlers load the compatibility
//! requirements themselves, after authentication has passed.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use dispatch::{ConfigSource, Dispatcher, KeySpace, QueueStore, WebhookQueue};

pub mod auth;
pub mod error;
pub mod fetch;
pub mod health;
pub mod identity;
pub mod webhook;
pub mod workers;

pub use auth::require_worker_token;
pub use error::ApiError;
pub use identity::Worker;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    dispatcher: Dispatcher,
    webhooks: WebhookQueue,
    config: Arc<dyn ConfigSource>,
    docs_url: Option<String>,
}

impl AppState {
    /// Creates the state for one gateway instance.
    ///
    /// `docs_url` is the redirect target of `GET /`; without one the root
    /// route answers 404.
    pub fn new(
        store: Arc<dyn QueueStore>,
        keys: KeySpace,
        config: Arc<dyn ConfigSource>,
        docs_url: Option<String>,
    ) -> Self {
        let webhooks = WebhookQueue::new(store.clone(), &keys);
        let dispatcher = Dispatcher::new(store, keys);
        Self {
            inner: Arc::new(AppStateInner {
                dispatcher,
                webhooks,
                config,
                docs_url,
            }),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn webhooks(&self) -> &WebhookQueue {
        &self.inner.webhooks
    }

    pub fn config_source(&self) -> &dyn ConfigSource {
        self.inner.config.as_ref()
    }

    pub fn docs_url(&self) -> Option<&str> {
        self.inner.docs_url.as_deref()
    }
}

/// Builds the axum Router with all endpoints.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so
/// workers without an `x-worker-host` header are tracked by address.
pub fn build_router(state: AppState) -> Router {
    let worker_routes = Router::new()
        .route("/fetch", get(fetch::fetch_default))
        .route("/fetch/{queue}", get(fetch::fetch_named))
        .route("/workers", get(workers::workers_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_worker_token,
        ));

    Router::new()
        .route("/", get(health::root_redirect))
        .route("/health", get(health::health_handler))
        .route("/webhooks/github", post(webhook::github_webhook))
        .route("/webhooks/{slug}", post(webhook::service_webhook))
        .merge(worker_routes)
        .with_state(state)
}
