//! The contract every connector driver fulfils so it can be guarded.

use async_trait::async_trait;

use super::acl::AccessList;
use super::request::AccessRequest;
use crate::error::BackendError;

/// The ACL a request will be evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAcl {
    acl: AccessList,
    is_new: bool,
}

impl ResolvedAcl {
    /// The ACL persisted with an existing resource.
    pub fn existing(acl: AccessList) -> Self {
        Self { acl, is_new: false }
    }

    /// The ACL a not-yet-existing resource will be created with.
    pub fn created(acl: AccessList) -> Self {
        Self { acl, is_new: true }
    }

    pub fn acl(&self) -> &AccessList {
        &self.acl
    }

    pub fn into_acl(self) -> AccessList {
        self.acl
    }

    /// True when the resource has no stored ACL yet.
    pub fn is_new(&self) -> bool {
        self.is_new
    }
}

/// Raw, unguarded access to a backend's resource metadata.
///
/// Drivers only know how to load and store the serialized ACL for a resource;
/// deciding what that ACL means is left to the [`Guard`](super::Guard). A
/// driver is never handed to callers directly: it is wrapped in
/// [`Guarded`](super::Guarded), and the service traits are only implemented
/// for the wrapper.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Registry name of this implementation, e.g. `"local-filesystem"`.
    fn implementation(&self) -> &str;

    /// Load the serialized ACL stored with `resource`.
    ///
    /// Returns `None` when the resource does not exist.
    async fn load_acl(&self, resource: &str) -> Result<Option<String>, BackendError>;

    /// Replace the serialized ACL stored with an existing `resource`.
    async fn store_acl(&self, resource: &str, serialized: &str) -> Result<(), BackendError>;

    /// Drop sockets, handles or buffers held by this driver.
    ///
    /// Called when a cached instance is evicted or the registry shuts down.
    fn release(&self) {}

    /// Resolve the ACL to evaluate `request` against.
    ///
    /// - If the resource does not exist (no metadata, or metadata that does not
    ///   parse), the requesting candidate is made Owner so the first write can
    ///   create it.
    /// - Otherwise the stored ACL is returned exactly as persisted.
    async fn resolve_acl(&self, request: &AccessRequest) -> Result<ResolvedAcl, BackendError> {
        let stored = self.load_acl(request.resource()).await?;
        Ok(match AccessList::from_metadata(stored.as_deref()) {
            Some(acl) => ResolvedAcl::existing(acl),
            None => ResolvedAcl::created(AccessList::for_creator(request)),
        })
    }
}
