use crate::config::SafetyConfig;
use std::path::Path;

/// Returns true if path is allowed given allow/deny lists.
/// If allow list is non-empty, path must match at least one allowed prefix.
/// Deny list always overrides.
pub fn is_allowed(path: &Path, allow: &[String], deny: &[String]) -> bool {
    if deny.iter().any(|prefix| path.starts_with(prefix)) {
        return false;
    }
    if allow.is_empty() {
        return true;
    }
    allow.iter().any(|p| path.starts_with(p))
}

pub fn is_mutable(path: &Path, safety: &SafetyConfig) -> bool {
    is_allowed(path, &safety.allow_paths, &safety.deny_paths)
}
