//! Environment-driven configuration.
//!
//! Two kinds of settings live in the environment:
//!
//! - Start-up settings ([`ServerConfig`]), read once and validated before the
//!   listener binds.
//! - Gate settings (worker token and compatibility requirements), read by
//!   [`EnvConfigSource`] on every request so they can change without a
//!   restart.
//!
//! Both take a lookup function so tests never touch the process environment.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dispatch::{
    Capability, CompatibilityRequirements, ConfigSource, DispatchError, KeySpace, WorkerToken,
};
use thiserror::Error;

pub const HOST_VAR: &str = "DISPATCH_HOST";
pub const PORT_VAR: &str = "DISPATCH_PORT";
pub const REDIS_URL_VAR: &str = "REDIS_URL";
pub const STORE_VAR: &str = "DISPATCH_STORE";
pub const NAMESPACE_VAR: &str = "DISPATCH_NAMESPACE";
pub const DOCS_URL_VAR: &str = "DISPATCH_DOCS_URL";
pub const REDIS_TIMEOUT_VAR: &str = "REDIS_CONNECTION_TIMEOUT_MS";
pub const LOG_FORMAT_VAR: &str = "DISPATCH_LOG_FORMAT";

pub const WORKER_TOKEN_VAR: &str = "WORKER_TOKEN";
pub const WORKER_REQUIREMENT_VAR: &str = "WORKER_REQUIREMENT";
pub const SETTINGS_REQUIREMENT_VAR: &str = "SETTINGS_REQUIREMENT";
pub const COVERAGE_REQUIREMENT_VAR: &str = "COVERAGE_REQUIREMENT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REDIS_TIMEOUT_MS: u64 = 5000;

/// Reads one variable; `None` when unset.
pub type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lookup backed by the process environment.
pub fn process_env() -> Lookup {
    Arc::new(|key| std::env::var(key).ok())
}

/// Invalid start-up configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is required when DISPATCH_STORE=redis")]
    Missing { var: &'static str },

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which queue-store backend to run against.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Redis { url: String, connect_timeout: Duration },
    Memory,
}

impl fmt::Debug for StoreBackend {
    // Redis URLs may carry a password.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Redis {
                connect_timeout, ..
            } => f
                .debug_struct("Redis")
                .field("connect_timeout", connect_timeout)
                .finish_non_exhaustive(),
            StoreBackend::Memory => f.write_str("Memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Start-up settings of the gateway process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub store: StoreBackend,
    pub keys: KeySpace,
    pub docs_url: Option<String>,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Defaults
    ///
    /// - `DISPATCH_HOST` defaults to `"0.0.0.0"`.
    /// - `DISPATCH_PORT` defaults to `8080`.
    /// - `DISPATCH_STORE` defaults to `redis`, which requires `REDIS_URL`.
    /// - `DISPATCH_NAMESPACE` defaults to `"dispatch"`.
    /// - `REDIS_CONNECTION_TIMEOUT_MS` defaults to `5000`.
    /// - `DISPATCH_LOG_FORMAT` defaults to `json`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&*process_env())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let host = get(HOST_VAR).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host.trim().parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                var: HOST_VAR,
                value: host.clone(),
                reason: e.to_string(),
            }
        })?;
        let port = parse_number(get(PORT_VAR), PORT_VAR, DEFAULT_PORT)?;

        let store = match get(STORE_VAR).as_deref().map(str::trim) {
            None | Some("redis") => StoreBackend::Redis {
                url: get(REDIS_URL_VAR).ok_or(ConfigError::Missing {
                    var: REDIS_URL_VAR,
                })?,
                connect_timeout: Duration::from_millis(parse_number(
                    get(REDIS_TIMEOUT_VAR),
                    REDIS_TIMEOUT_VAR,
                    DEFAULT_REDIS_TIMEOUT_MS,
                )?),
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: STORE_VAR,
                    value: other.to_string(),
                    reason: "expected 'redis' or 'memory'".to_string(),
                })
            }
        };

        let log_format = match get(LOG_FORMAT_VAR).as_deref().map(str::trim) {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_VAR,
                    value: other.to_string(),
                    reason: "expected 'json' or 'pretty'".to_string(),
                })
            }
        };

        Ok(Self {
            bind: SocketAddr::new(ip, port),
            store,
            keys: KeySpace::new(get(NAMESPACE_VAR).unwrap_or_default()),
            docs_url: get(DOCS_URL_VAR),
            log_format,
        })
    }
}

fn parse_number<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

/// [`ConfigSource`] that re-reads the gate variables on every request.
///
/// An empty or unset variable means "not configured". An unparseable
/// requirement fails the request rather than silently admitting workers.
#[derive(Clone)]
pub struct EnvConfigSource {
    lookup: Lookup,
}

impl EnvConfigSource {
    pub fn new(lookup: Lookup) -> Self {
        Self { lookup }
    }

    fn requirement_var(capability: Capability) -> &'static str {
        match capability {
            Capability::Worker => WORKER_REQUIREMENT_VAR,
            Capability::Settings => SETTINGS_REQUIREMENT_VAR,
            Capability::Coverage => COVERAGE_REQUIREMENT_VAR,
        }
    }
}

impl fmt::Debug for EnvConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvConfigSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl ConfigSource for EnvConfigSource {
    async fn worker_token(&self) -> Result<Option<WorkerToken>, DispatchError> {
        Ok((self.lookup)(WORKER_TOKEN_VAR).and_then(WorkerToken::new))
    }

    async fn requirements(&self) -> Result<CompatibilityRequirements, DispatchError> {
        let mut requirements = CompatibilityRequirements::default();
        for capability in Capability::ALL {
            let expression = (self.lookup)(Self::requirement_var(capability)).unwrap_or_default();
            requirements = requirements.with_expression(capability, &expression)?;
        }
        Ok(requirements)
    }
}
