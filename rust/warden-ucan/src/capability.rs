//! Capabilities and the matching rule.

use serde::{Deserialize, Serialize};

/// A `(resource, action)` pair a token claims to grant.
///
/// Both halves may be `"*"` (anything), end in `"*"` (prefix match), or
/// contain comma/pipe-separated alternatives within the one pattern string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// What the capability applies to, e.g. `webdav` or `app:example.com`.
    #[serde(rename = "with")]
    pub resource: String,

    /// What may be done with it, e.g. `read`.
    #[serde(rename = "can")]
    pub action: String,
}

impl Capability {
    /// Create a capability; empty halves widen to `"*"`.
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        let resource = resource.into();
        let action = action.into();
        Self {
            resource: if resource.is_empty() { "*".into() } else { resource },
            action: if action.is_empty() { "*".into() } else { action },
        }
    }

    /// Whether `available` satisfies this required capability.
    ///
    /// Matching is symmetric per half: the requirement is met if either
    /// side's pattern covers the other. A delegation declaring `app:*` thus
    /// satisfies a requirement for `app:foo`, and a requirement for `app:*`
    /// is satisfied by a grant of `app:foo`.
    pub fn satisfied_by(&self, available: &Capability) -> bool {
        half_matches(&self.resource, &available.resource)
            && half_matches(&self.action, &available.action)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.resource, self.action)
    }
}

/// Check that every capability in `required` finds at least one satisfying
/// entry in `available`, returning the first unmet requirement otherwise.
pub fn satisfies_all<'a>(
    required: &'a [Capability],
    available: &[Capability],
) -> Result<(), &'a Capability> {
    for requirement in required {
        if !available.iter().any(|cap| requirement.satisfied_by(cap)) {
            return Err(requirement);
        }
    }
    Ok(())
}

fn half_matches(required: &str, available: &str) -> bool {
    pattern_covers(required, available) || pattern_covers(available, required)
}

/// Whether `pattern` covers `value`: `"*"` covers anything, a trailing `*`
/// is a prefix match, comma/pipe alternation is OR, anything else must be
/// equal.
fn pattern_covers(pattern: &str, value: &str) -> bool {
    pattern.split([',', '|']).map(str::trim).any(|alternative| {
        if alternative == "*" {
            true
        } else if let Some(prefix) = alternative.strip_suffix('*') {
            value.starts_with(prefix)
        } else {
            alternative == value
        }
    })
}
