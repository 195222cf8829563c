//! The path/operation permission engine.

use async_trait::async_trait;

use crate::{AccessError, Identity, PermissionSet, RepositoryError, Rule};

/// The abstract operation a request maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Bring a new resource into existence.
    Create,
    /// Read a resource or list a directory.
    Read,
    /// Modify a resource in place, or move/copy it.
    Update,
    /// Remove a resource.
    Delete,
}

impl Operation {
    /// Classify an HTTP-style method.
    ///
    /// Unrecognized methods classify as `Read` — failing open toward the
    /// least dangerous class rather than breaking unknown extension verbs.
    pub fn from_method(method: &str) -> Operation {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" | "OPTIONS" | "PROPFIND" => Operation::Read,
            "PUT" | "PATCH" | "PROPPATCH" | "LOCK" | "UNLOCK" => Operation::Update,
            "POST" | "MKCOL" => Operation::Create,
            "COPY" | "MOVE" => Operation::Update,
            "DELETE" => Operation::Delete,
            _ => Operation::Read,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

impl PermissionSet {
    /// Whether this set grants the operation.
    pub fn allows(&self, operation: Operation) -> bool {
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// The file layer's view of what exists, consulted for mutating
/// operations.
#[async_trait]
pub trait DirectoryProbe: Send + Sync {
    /// Whether `path` exists and is a directory.
    async fn is_directory(&self, path: &str) -> Result<bool, RepositoryError>;
}

/// Normalize a request path: leading slash, no trailing slash.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// The parent of a normalized path; the root is its own parent.
pub fn parent_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

/// Decide whether `identity` may perform `operation` on `path`.
///
/// Rules are evaluated in declared order and the **first** rule whose path
/// prefixes the request path decides — later, more specific rules are
/// never consulted. With no match, the identity's default permissions
/// apply. Create and Update additionally require the parent path to exist
/// as a directory; failing to confirm that is distinct from a permission
/// denial.
pub async fn check(
    identity: &Identity,
    path: &str,
    operation: Operation,
    probe: &dyn DirectoryProbe,
) -> Result<(), AccessError> {
    let path = normalize_path(path);
    let permissions = effective_permissions(identity, &path)?;
    if !permissions.allows(operation) {
        tracing::debug!(user = %identity.username, %path, %operation, "permission denied");
        return Err(AccessError::PermissionDenied { operation, path });
    }

    if matches!(operation, Operation::Create | Operation::Update) {
        let parent = parent_path(&path);
        if !probe.is_directory(&parent).await? {
            return Err(AccessError::ParentDirectoryMissing(parent));
        }
    }

    Ok(())
}

/// First-match-wins rule evaluation with the default set as fallback.
fn effective_permissions(identity: &Identity, path: &str) -> Result<PermissionSet, AccessError> {
    for rule in &identity.rules {
        match rule {
            Rule::Prefix { path: prefix, permissions } => {
                if path.starts_with(&normalize_path(prefix)) {
                    return Ok(*permissions);
                }
            }
            Rule::Regex { pattern, .. } => {
                return Err(AccessError::RegexRuleUnsupported(pattern.clone()));
            }
        }
    }
    Ok(identity.default_permissions)
}
