//! Version requirement parsing and satisfaction.
//!
//! A requirement is configured as a string in one of two shapes:
//!
//! - **Minimum bound**: a bare version such as `1.0.0`, `1.2` or `v2`. The
//!   reported version satisfies it if it is greater than or equal to the bound.
//! - **Range**: anything else, written the way package managers write ranges:
//!   `>=1.2.0 <2.0.0`, `^1.4`, `~1.2.3`, `1.x`, `1.0.0 - 1.4.0`, and
//!   alternatives joined with `||`. The reported version satisfies it if it
//!   matches any alternative.
//!
//! Reported versions are parsed leniently: a leading `v` or `=` is ignored and
//! missing minor or patch components are zero, so `1.2` is `1.2.0`. A reported
//! version that still cannot be parsed satisfies nothing.

use semver::{BuildMetadata, Version, VersionReq};

use crate::RequirementError;

/// A configured compatibility requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequirement {
    expression: String,
    rule: Rule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    Minimum(Version),
    Range(Vec<VersionReq>),
}

impl VersionRequirement {
    /// Parses a requirement expression.
    pub fn parse(expression: &str) -> Result<Self, RequirementError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(RequirementError {
                expression: expression.to_string(),
                reason: "expression is empty".to_string(),
            });
        }

        let rule = if is_bare_version(trimmed) {
            // is_bare_version only accepts strings parse_lenient understands.
            match parse_lenient(trimmed) {
                Some(minimum) => Rule::Minimum(minimum),
                None => Rule::Range(parse_range(trimmed)?),
            }
        } else {
            Rule::Range(parse_range(trimmed)?)
        };

        Ok(Self {
            expression: trimmed.to_string(),
            rule,
        })
    }

    /// Returns the expression as configured.
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Checks a reported version against this requirement.
    pub fn is_satisfied_by(&self, reported: &str) -> bool {
        let Some(version) = parse_lenient(reported) else {
            return false;
        };

        match &self.rule {
            Rule::Minimum(minimum) => without_build(&version) >= without_build(minimum),
            Rule::Range(alternatives) => alternatives.iter().any(|req| req.matches(&version)),
        }
    }
}

impl std::str::FromStr for VersionRequirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Parses a version, tolerating a `v`/`=` prefix and missing components.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('=').unwrap_or(trimmed).trim_start();
    let trimmed = trimmed
        .strip_prefix(|c: char| c == 'v' || c == 'V')
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }

    let split = trimmed
        .find(|c: char| c == '-' || c == '+')
        .unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split);

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return None;
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }

    Version::parse(&format!("{}.{}.{}{suffix}", numbers[0], numbers[1], numbers[2])).ok()
}

fn without_build(version: &Version) -> Version {
    let mut v = version.clone();
    v.build = BuildMetadata::EMPTY;
    v
}

fn is_bare_version(expression: &str) -> bool {
    let has_operator = expression.contains("||")
        || expression.contains(|c: char| {
            matches!(c, '<' | '>' | '=' | '^' | '~' | '*' | ',') || c.is_whitespace()
        });
    !has_operator && parse_lenient(expression).is_some()
}

fn parse_range(expression: &str) -> Result<Vec<VersionReq>, RequirementError> {
    expression
        .split("||")
        .map(|alternative| {
            let translated = translate_alternative(alternative);
            VersionReq::parse(&translated).map_err(|e| RequirementError {
                expression: expression.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Rewrites one space-separated alternative into the comma-separated syntax
/// `semver` parses. Bare versions inside a range mean an exact match.
fn translate_alternative(alternative: &str) -> String {
    let tokens: Vec<&str> = alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return "*".to_string();
    }

    // Hyphen range: `1.0.0 - 2.0.0`.
    if tokens.len() == 3 && tokens[1] == "-" {
        return format!(">={}, <={}", strip_v(tokens[0]), strip_v(tokens[2]));
    }

    let mut comparators = Vec::with_capacity(tokens.len());
    let mut pending_op = String::new();
    for token in tokens {
        let split = token
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
            .unwrap_or(token.len());
        let (op, version) = token.split_at(split);

        // Operator written apart from its version: `>= 1.2.0`.
        if version.is_empty() {
            pending_op.push_str(op);
            continue;
        }

        let op = if pending_op.is_empty() {
            op.to_string()
        } else {
            std::mem::take(&mut pending_op) + op
        };
        let version = strip_v(version);

        if is_wildcard(version) {
            comparators.push(wildcard_comparator(&op, version));
        } else if op.is_empty() {
            comparators.push(format!("={version}"));
        } else {
            comparators.push(format!("{op}{version}"));
        }
    }

    if comparators.is_empty() {
        return "*".to_string();
    }
    comparators.join(", ")
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix(|c: char| c == 'v' || c == 'V')
        .unwrap_or(version)
}

fn is_wildcard(version: &str) -> bool {
    version.split('.').any(is_wildcard_part)
}

fn is_wildcard_part(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

/// Translates a wildcard token. With an operator the wildcard components are
/// dropped and the operator applies to the remaining partial version, which
/// `semver` reads as a whole major or minor line: `<2.x` is `<2`, `>1.x` is
/// `>1` (at least 2.0.0).
fn wildcard_comparator(op: &str, version: &str) -> String {
    let partial: Vec<&str> = version
        .split('.')
        .take_while(|part| !is_wildcard_part(part))
        .collect();

    if op.is_empty() {
        return version.replace(|c: char| c == 'x' || c == 'X', "*");
    }
    if partial.is_empty() {
        // `<*` and `>*` admit nothing, every other operator admits everything.
        return match op {
            "<" | ">" => "<0.0.0".to_string(),
            _ => "*".to_string(),
        };
    }
    format!("{op}{}", partial.join("."))
}
