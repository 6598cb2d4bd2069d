//! Resource identifier conventions shared by connectors.
//!
//! Team-scoped objects live under `teams/{team}/`, and key-value entries are
//! addressed as `{namespace}:{key}`.

use crate::error::{Error, Result};

/// `teams/{team}/{path}`
pub fn team_path(team: &str, path: &str) -> Result<String> {
    check_segment(team, "team")?;
    let path = path.trim_start_matches('/');
    check_path(path)?;
    Ok(format!("teams/{}/{}", team, path))
}

/// `{namespace}:{key}`
pub fn namespaced(namespace: &str, key: &str) -> Result<String> {
    check_segment(namespace, "namespace")?;
    if namespace.contains(':') {
        return Err(invalid(format!("namespace '{}' contains ':'", namespace)));
    }
    if key.is_empty() {
        return Err(invalid("key must not be empty".to_string()));
    }
    Ok(format!("{}:{}", namespace, key))
}

/// Split `{namespace}:{key}` at the first `:`.
pub fn split_namespaced(resource: &str) -> Result<(&str, &str)> {
    match resource.split_once(':') {
        Some((ns, key)) if !ns.is_empty() && !key.is_empty() => Ok((ns, key)),
        _ => Err(invalid(format!(
            "'{}' is not a namespaced resource",
            resource
        ))),
    }
}

fn check_segment(segment: &str, what: &str) -> Result<()> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains('/') {
        return Err(invalid(format!("invalid {} '{}'", what, segment)));
    }
    Ok(())
}

fn check_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid("path must not be empty".to_string()));
    }
    for part in path.split('/') {
        if part.is_empty() || part == ".." {
            return Err(invalid(format!("invalid path '{}'", path)));
        }
    }
    Ok(())
}

fn invalid(message: String) -> Error {
    Error::Configuration(format!("invalid resource identifier: {}", message))
}
