//! Per-request gate configuration.
//!
//! The worker token and the three compatibility requirements are owned by an
//! external source and may change while the gateway runs. Handlers therefore
//! never hold a long-lived copy: each request reads what it needs from a
//! [`ConfigSource`] and passes the value explicitly to the gates. The token
//! and the requirements are read separately, so a broken requirement never
//! affects authentication.

use std::sync::RwLock;

use async_trait::async_trait;
use subtle::ConstantTimeEq;

use crate::{Capability, DispatchError, VersionRequirement};

// ---------------------------------------------------------------------------
// Worker token
// ---------------------------------------------------------------------------

/// Shared secret every worker presents when fetching jobs.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct WorkerToken(String);

impl WorkerToken {
    /// Creates a token, returning `None` for an empty value.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Compares a presented token in constant time.
    pub fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        expected.len() == presented.len() && bool::from(expected.ct_eq(presented))
    }
}

impl std::fmt::Debug for WorkerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WorkerToken(REDACTED)")
    }
}

// ---------------------------------------------------------------------------
// Requirements
// ---------------------------------------------------------------------------

/// Minimum versions (or ranges) a worker must meet, one per [`Capability`].
///
/// `None` means the capability is not gated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatibilityRequirements {
    pub worker: Option<VersionRequirement>,
    pub settings: Option<VersionRequirement>,
    pub coverage: Option<VersionRequirement>,
}

impl CompatibilityRequirements {
    /// Returns the requirement configured for `capability`, if any.
    pub fn get(&self, capability: Capability) -> Option<&VersionRequirement> {
        match capability {
            Capability::Worker => self.worker.as_ref(),
            Capability::Settings => self.settings.as_ref(),
            Capability::Coverage => self.coverage.as_ref(),
        }
    }

    /// Sets or clears the requirement for `capability`.
    pub fn set(&mut self, capability: Capability, requirement: Option<VersionRequirement>) {
        let slot = match capability {
            Capability::Worker => &mut self.worker,
            Capability::Settings => &mut self.settings,
            Capability::Coverage => &mut self.coverage,
        };
        *slot = requirement;
    }

    /// Parses and installs a requirement expression for `capability`.
    ///
    /// A blank expression clears the requirement.
    pub fn with_expression(
        mut self,
        capability: Capability,
        expression: &str,
    ) -> Result<Self, DispatchError> {
        let requirement = if expression.trim().is_empty() {
            None
        } else {
            Some(
                VersionRequirement::parse(expression)
                    .map_err(|source| DispatchError::InvalidRequirement { capability, source })?,
            )
        };
        self.set(capability, requirement);
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Gate configuration
// ---------------------------------------------------------------------------

/// Everything the authentication and version gates need for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateConfig {
    /// Expected worker token. With no token configured every privileged
    /// request is rejected.
    pub worker_token: Option<WorkerToken>,
    pub requirements: CompatibilityRequirements,
}

impl GateConfig {
    /// Creates a configuration with the given token and no requirements.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            worker_token: WorkerToken::new(token),
            requirements: CompatibilityRequirements::default(),
        }
    }

    /// Parses and installs a requirement expression for `capability`.
    ///
    /// A blank expression clears the requirement.
    pub fn with_requirement(
        mut self,
        capability: Capability,
        expression: &str,
    ) -> Result<Self, DispatchError> {
        self.requirements = self.requirements.with_expression(capability, expression)?;
        Ok(self)
    }

    /// Authentication gate: checks the presented worker token.
    pub fn authorize(&self, presented: Option<&str>) -> Result<(), DispatchError> {
        authorize(self.worker_token.as_ref(), presented)
    }
}

/// Authentication gate against an expected token. With no token configured
/// every request is rejected.
pub fn authorize(
    expected: Option<&WorkerToken>,
    presented: Option<&str>,
) -> Result<(), DispatchError> {
    match (expected, presented) {
        (Some(expected), Some(presented)) if expected.matches(presented) => Ok(()),
        _ => Err(DispatchError::AuthRejected),
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Supplies fresh gate values for each request.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// The expected worker token, `None` when unset.
    async fn worker_token(&self) -> Result<Option<WorkerToken>, DispatchError>;

    /// The compatibility requirements. Fails with
    /// [`DispatchError::InvalidRequirement`] when an expression does not parse.
    async fn requirements(&self) -> Result<CompatibilityRequirements, DispatchError>;
}

/// A [`ConfigSource`] backed by an in-process value that can be replaced at
/// runtime. Used when embedding the gateway and in tests.
#[derive(Debug, Default)]
pub struct StaticConfigSource {
    current: RwLock<GateConfig>,
}

impl StaticConfigSource {
    pub fn new(config: GateConfig) -> Self {
        Self {
            current: RwLock::new(config),
        }
    }

    /// Replaces the configuration seen by subsequent requests.
    pub fn replace(&self, config: GateConfig) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = config;
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn worker_token(&self) -> Result<Option<WorkerToken>, DispatchError> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        Ok(current.worker_token.clone())
    }

    async fn requirements(&self) -> Result<CompatibilityRequirements, DispatchError> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        Ok(current.requirements.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_comparison() {
        let token = WorkerToken::new("s3cret").unwrap();
        assert!(token.matches("s3cret"));
        assert!(!token.matches("s3cre"));
        assert!(!token.matches("s3cret!"));
        assert!(!token.matches(""));
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = WorkerToken::new("s3cret").unwrap();
        assert!(!format!("{token:?}").contains("s3cret"));
    }

    #[test]
    fn authorize_requires_matching_token() {
        let config = GateConfig::with_token("abc");
        assert!(config.authorize(Some("abc")).is_ok());
        assert!(matches!(
            config.authorize(Some("abd")),
            Err(DispatchError::AuthRejected)
        ));
        assert!(matches!(
            config.authorize(None),
            Err(DispatchError::AuthRejected)
        ));
    }

    #[test]
    fn authorize_rejects_everything_without_configured_token() {
        let config = GateConfig::default();
        assert!(config.authorize(Some("")).is_err());
        assert!(config.authorize(Some("anything")).is_err());
    }

    #[test]
    fn with_requirement_parses_and_clears() {
        let config = GateConfig::with_token("t")
            .with_requirement(Capability::Coverage, ">=2.0.0")
            .unwrap();
        assert_eq!(
            config.requirements.get(Capability::Coverage).map(|r| r.as_str()),
            Some(">=2.0.0")
        );

        let cleared = config.with_requirement(Capability::Coverage, "  ").unwrap();
        assert!(cleared.requirements.get(Capability::Coverage).is_none());
    }

    #[test]
    fn with_requirement_reports_the_capability() {
        let err = GateConfig::default()
            .with_requirement(Capability::Settings, ">=nope")
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InvalidRequirement {
                capability: Capability::Settings,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn static_source_serves_replaced_value() {
        let source = StaticConfigSource::new(GateConfig::with_token("first"));
        let token = source.worker_token().await.unwrap();
        assert!(authorize(token.as_ref(), Some("first")).is_ok());

        let replacement = GateConfig::with_token("second")
            .with_requirement(Capability::Worker, "2.0.0")
            .unwrap();
        source.replace(replacement);
        let token = source.worker_token().await.unwrap();
        assert!(authorize(token.as_ref(), Some("first")).is_err());
        assert!(authorize(token.as_ref(), Some("second")).is_ok());

        let requirements = source.requirements().await.unwrap();
        assert!(requirements.get(Capability::Worker).is_some());
    }

    #[test]
    fn with_expression_builds_requirements_directly() {
        let requirements = CompatibilityRequirements::default()
            .with_expression(Capability::Worker, "^1.2")
            .unwrap()
            .with_expression(Capability::Settings, "")
            .unwrap();
        assert!(requirements.get(Capability::Worker).is_some());
        assert!(requirements.get(Capability::Settings).is_none());
    }
}
