//! Mapping resource ids onto a directory tree.

use std::path::{Component, Path, PathBuf};

use warden_core::{BackendError, Error, Settings};

/// Directory holding ACL sidecars, relative to a connector's root.
pub const ACL_DIR: &str = ".acl";

/// Expand `~` in a configured path.
pub fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// `settings[key]` expanded, or `default_name` under the platform's local data
/// directory.
pub fn configured_path(
    settings: &Settings,
    key: &str,
    default_name: &str,
) -> warden_core::Result<PathBuf> {
    if let Some(path) = settings.get_str(key) {
        return Ok(expand(path));
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("warden").join(default_name))
        .ok_or_else(|| {
            Error::Configuration(format!(
                "'{}' is not set and there is no local data directory",
                key
            ))
        })
}

/// Resolve `resource` to a path under `root`.
///
/// Rejects absolute ids, `..` components, empty segments and anything under
/// the ACL sidecar directory. If part of the path already exists it is
/// canonicalized to make sure symlinks do not lead outside `root`.
pub fn resolve(root: &Path, resource: &str) -> Result<PathBuf, BackendError> {
    let relative = Path::new(resource);
    if resource.is_empty() || resource.split('/').any(str::is_empty) {
        return Err(invalid(resource, "empty path segment"));
    }
    for component in relative.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir | Component::ParentDir => {
                return Err(invalid(resource, "relative components are not allowed"))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid(resource, "absolute paths are not allowed"))
            }
        }
    }
    if relative.starts_with(ACL_DIR) {
        return Err(invalid(resource, "reserved directory"));
    }

    let full_path = root.join(relative);

    // Find the nearest existing ancestor and make sure it is inside root
    let mut existing = full_path.as_path();
    while !existing.exists() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return Ok(full_path),
        }
    }
    if !existing.starts_with(root) {
        // Above root: nothing of the resource exists yet
        return Ok(full_path);
    }
    let canonical = existing.canonicalize()?;
    let canonical_root = root.canonicalize()?;
    if !canonical.starts_with(&canonical_root) {
        return Err(invalid(resource, "escapes the storage root"));
    }
    Ok(full_path)
}

/// Path of the ACL sidecar for `resource`.
pub fn sidecar(root: &Path, resource: &str) -> Result<PathBuf, BackendError> {
    // Validates the resource id
    resolve(root, resource)?;
    Ok(root.join(ACL_DIR).join(format!("{}.json", resource)))
}

fn invalid(resource: &str, reason: &str) -> BackendError {
    BackendError::Other(format!("invalid resource '{}': {}", resource, reason))
}
