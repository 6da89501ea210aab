//! Version gate.
//!
//! Runs after authentication and before any queue access, so an outdated
//! worker is turned away without consuming a job or being recorded as seen.

use tracing::debug;

use crate::{Capability, CompatibilityRequirements, DispatchError, ReportedVersions};

/// Checks reported versions against the configured requirements.
///
/// Requirements are evaluated in [`Capability::ALL`] order and the first
/// violation is returned:
///
/// - an unset requirement is always satisfied;
/// - a set requirement fails if the worker did not report that capability;
/// - otherwise the reported version must satisfy the requirement.
pub fn check_compatibility(
    requirements: &CompatibilityRequirements,
    reported: &ReportedVersions,
) -> Result<(), DispatchError> {
    for capability in Capability::ALL {
        let Some(requirement) = requirements.get(capability) else {
            continue;
        };

        let satisfied = reported
            .get(capability)
            .is_some_and(|version| requirement.is_satisfied_by(version));

        if !satisfied {
            debug!(
                capability = %capability,
                requirement = %requirement,
                reported = reported.get(capability).unwrap_or("<none>"),
                "Compatibility requirement not met"
            );
            return Err(DispatchError::Outdated { capability });
        }
    }

    Ok(())
}
