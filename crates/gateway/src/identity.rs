//! Worker identity extraction.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use dispatch::{resolve_host, ReportedVersions, WorkerIdentity};

/// Header carrying the worker binary version.
pub const WORKER_VERSION_HEADER: &str = "x-worker-version";
/// Header carrying the settings schema version the worker understands.
pub const SETTINGS_VERSION_HEADER: &str = "x-settings-version";
/// Header carrying the bundled coverage tooling version.
pub const COVERAGE_VERSION_HEADER: &str = "x-coverage-version";
/// Header overriding the host key used for liveness tracking.
pub const WORKER_HOST_HEADER: &str = "x-worker-host";

/// Extractor for the [`WorkerIdentity`] of the calling worker.
///
/// The peer address comes from [`ConnectInfo`], which is present when the
/// router is served with `into_make_service_with_connect_info`.
#[derive(Debug, Clone)]
pub struct Worker(pub WorkerIdentity);

impl<S> FromRequestParts<S> for Worker
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Worker(identity_from_headers(&parts.headers, peer)))
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn identity_from_headers(headers: &HeaderMap, peer: Option<std::net::IpAddr>) -> WorkerIdentity {
    WorkerIdentity {
        versions: ReportedVersions {
            worker: header_string(headers, WORKER_VERSION_HEADER),
            settings: header_string(headers, SETTINGS_VERSION_HEADER),
            coverage: header_string(headers, COVERAGE_VERSION_HEADER),
        },
        host: resolve_host(
            headers
                .get(WORKER_HOST_HEADER)
                .and_then(|v| v.to_str().ok()),
            peer,
        ),
    }
}
