//! Application-scope extraction.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::Capability;

/// Default resource prefix marking an application-scoped capability.
pub const DEFAULT_APP_PREFIX: &str = "app:";

/// Per-request view of which applications a capability token may touch.
///
/// Attached to the request context after capability-token authentication so
/// downstream authorization can confine the request to an application's own
/// subtree. App identifiers that carry wildcards or characters outside
/// `[A-Za-z0-9._-]` are never granted — they land in `invalid` instead, so
/// an overly broad delegation like `app:*` cannot silently widen into
/// cross-application access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityScope {
    /// Granted app identifier → lowercase actions.
    pub apps: BTreeMap<String, BTreeSet<String>>,

    /// Whether *any* app-scoped resource appeared, valid or not. Lets
    /// callers tell "no app capability requested" from "requested but
    /// rejected".
    pub has_app_capabilities: bool,

    /// Rejected entries as `resource#action` strings, for logging.
    pub invalid: Vec<String>,
}

impl CapabilityScope {
    /// Actions granted for one application, if any.
    pub fn actions_for(&self, app_id: &str) -> Option<&BTreeSet<String>> {
        self.apps.get(app_id)
    }
}

/// Collect the app scope declared by `capabilities` under `prefix`.
pub fn extract_scope(capabilities: &[Capability], prefix: &str) -> CapabilityScope {
    let mut scope = CapabilityScope::default();
    for capability in capabilities {
        let Some(app_id) = capability.resource.strip_prefix(prefix) else {
            continue;
        };
        scope.has_app_capabilities = true;
        if is_valid_app_id(app_id) {
            scope
                .apps
                .entry(app_id.to_string())
                .or_default()
                .insert(capability.action.to_lowercase());
        } else {
            scope.invalid.push(capability.to_string());
        }
    }
    scope
}

fn is_valid_app_id(app_id: &str) -> bool {
    !app_id.is_empty()
        && app_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cap(resource: &str, action: &str) -> Capability {
        Capability::new(resource, action)
    }

    #[test]
    fn it_collects_actions_per_app() {
        let scope = extract_scope(
            &[
                cap("app:dapp.example.com", "write"),
                cap("app:dapp.example.com", "READ"),
                cap("app:other-app", "read"),
            ],
            DEFAULT_APP_PREFIX,
        );

        assert!(scope.has_app_capabilities);
        assert!(scope.invalid.is_empty());
        let actions = scope.actions_for("dapp.example.com").unwrap();
        assert_eq!(
            actions.iter().cloned().collect::<Vec<_>>(),
            vec!["read".to_string(), "write".to_string()]
        );
        assert!(scope.actions_for("other-app").is_some());
    }

    #[test]
    fn it_never_grants_wildcard_app_ids() {
        let scope = extract_scope(
            &[cap("app:*", "read"), cap("app:bad*", "write")],
            DEFAULT_APP_PREFIX,
        );

        assert!(scope.has_app_capabilities);
        assert!(scope.apps.is_empty());
        assert_eq!(
            scope.invalid,
            vec!["app:*#read".to_string(), "app:bad*#write".to_string()]
        );
    }

    #[test]
    fn it_rejects_disallowed_characters() {
        let scope = extract_scope(
            &[cap("app:has space", "read"), cap("app:", "read")],
            DEFAULT_APP_PREFIX,
        );
        assert!(scope.apps.is_empty());
        assert_eq!(scope.invalid.len(), 2);
    }

    #[test]
    fn it_ignores_non_app_resources() {
        let scope = extract_scope(&[cap("webdav", "read")], DEFAULT_APP_PREFIX);
        assert!(!scope.has_app_capabilities);
        assert!(scope.apps.is_empty());
        assert!(scope.invalid.is_empty());
    }
}
