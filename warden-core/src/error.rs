//! Error types for warden
//!
//! Every failure surfaced by the core falls into one of four categories,
//! chosen by how callers need to react to it:
//!
//! - [`Error::AccessDenied`] - the candidate lacks the requested access; map to
//!   an authorization failure
//! - [`Error::NotReady`] - a service was used before it was initialized
//! - [`Error::Configuration`] - the registry or a backend was misconfigured
//! - [`Error::Backend`] - the concrete backend failed; passed through untouched

use thiserror::Error;

use crate::access::AccessLevel;
use crate::identity::Candidate;

/// Errors produced by a concrete backend's own I/O.
///
/// The core never inspects or rewrites these; they reach the caller wrapped in
/// [`Error::Backend`] exactly as the backend produced them.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The addressed resource does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// IO error while talking to the underlying medium.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other backend-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Top-level error type for warden operations
#[derive(Debug, Error)]
pub enum Error {
    /// The candidate's request was evaluated and not granted.
    ///
    /// Raised before the guarded operation touches the backend.
    #[error("access denied: {candidate} may not {level} '{resource}'")]
    AccessDenied {
        /// Who asked.
        candidate: Candidate,
        /// The resource that was asked for.
        resource: String,
        /// The level that was asked for.
        level: AccessLevel,
    },

    /// A service or the registry was used before initialization completed.
    #[error("not ready: {0}")]
    NotReady(String),

    /// Unknown implementation name, invalid settings, or other registry misuse.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failure reported by the concrete backend.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl Error {
    /// Build an [`Error::AccessDenied`] for the given request parts.
    pub fn denied(candidate: &Candidate, resource: &str, level: AccessLevel) -> Self {
        Self::AccessDenied {
            candidate: candidate.clone(),
            resource: resource.to_string(),
            level,
        }
    }

    /// Returns true if this is an authorization failure
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Returns true if a service was used before initialization
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }

    /// Returns true if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if the backend itself failed
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Returns true if the backend reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Backend(BackendError::NotFound(_)))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Backend(BackendError::Io(err))
    }
}

/// Result type for warden operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_display() {
        let err = Error::denied(&Candidate::agent("agent-9"), "teams/5/a.txt", AccessLevel::Read);
        assert_eq!(
            err.to_string(),
            "access denied: agent:agent-9 may not read 'teams/5/a.txt'"
        );
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_convenience_methods() {
        assert!(Error::NotReady("x".into()).is_not_ready());
        assert!(Error::Configuration("x".into()).is_configuration());
        assert!(Error::Backend(BackendError::Other("x".into())).is_backend());
        assert!(!Error::NotReady("x".into()).is_access_denied());
    }

    #[test]
    fn test_backend_error_passes_through() {
        let err: Error = BackendError::NotFound("teams/1/x".into()).into();
        assert!(err.is_not_found());
        match err {
            Error::Backend(BackendError::NotFound(id)) => assert_eq!(id, "teams/1/x"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: Error = io.into();
        assert!(err.is_backend());
        assert!(err.to_string().contains("read-only"));
    }
}
