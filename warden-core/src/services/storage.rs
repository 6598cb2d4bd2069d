//! Object storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ResourceService, ServiceKind, ServiceType, Unconfigured};
use crate::access::{AccessLevel, AccessList, AccessRequest, Backend, Guarded};
use crate::error::{BackendError, Result};
use crate::identity::Candidate;

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub resource: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

/// Raw object I/O implemented by storage connectors.
#[async_trait]
pub trait StorageDriver: Backend {
    async fn read_object(&self, resource: &str) -> std::result::Result<Vec<u8>, BackendError>;

    /// Write `data`. `acl` is `Some` when the object is being created and
    /// must be persisted alongside it.
    async fn write_object(
        &self,
        resource: &str,
        data: Vec<u8>,
        acl: Option<&AccessList>,
    ) -> std::result::Result<ObjectInfo, BackendError>;

    /// Remove the object and its ACL.
    async fn delete_object(&self, resource: &str) -> std::result::Result<(), BackendError>;

    async fn stat_object(&self, resource: &str) -> std::result::Result<ObjectInfo, BackendError>;

    /// Every object id starting with `prefix`, unfiltered.
    async fn list_objects(&self, prefix: &str) -> std::result::Result<Vec<String>, BackendError>;
}

/// Guarded object storage.
#[async_trait]
pub trait Storage: ResourceService {
    /// Read an object. Requires Read.
    async fn get(&self, request: &AccessRequest) -> Result<Vec<u8>>;

    /// Create or overwrite an object. Requires Write.
    ///
    /// Creating an object makes the requester its Owner.
    async fn put(&self, request: &AccessRequest, data: Vec<u8>) -> Result<ObjectInfo>;

    /// Requires Write.
    async fn delete(&self, request: &AccessRequest) -> Result<()>;

    /// Requires Read.
    async fn stat(&self, request: &AccessRequest) -> Result<ObjectInfo>;

    /// Objects under `prefix` that `candidate` may read.
    async fn list(&self, candidate: &Candidate, prefix: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl<D: StorageDriver> Storage for Guarded<D> {
    async fn get(&self, request: &AccessRequest) -> Result<Vec<u8>> {
        self.run(request, AccessLevel::Read, |driver, _| {
            driver.read_object(request.resource())
        })
        .await
    }

    async fn put(&self, request: &AccessRequest, data: Vec<u8>) -> Result<ObjectInfo> {
        self.run(request, AccessLevel::Write, |driver, resolved| async move {
            let created = resolved.is_new().then(|| resolved.into_acl());
            driver
                .write_object(request.resource(), data, created.as_ref())
                .await
        })
        .await
    }

    async fn delete(&self, request: &AccessRequest) -> Result<()> {
        self.run(request, AccessLevel::Write, |driver, _| {
            driver.delete_object(request.resource())
        })
        .await
    }

    async fn stat(&self, request: &AccessRequest) -> Result<ObjectInfo> {
        self.run(request, AccessLevel::Read, |driver, _| {
            driver.stat_object(request.resource())
        })
        .await
    }

    async fn list(&self, candidate: &Candidate, prefix: &str) -> Result<Vec<String>> {
        let all = self.driver().list_objects(prefix).await?;
        self.filter_readable(candidate, all).await
    }
}

pub struct StorageService;

impl ServiceKind for StorageService {
    const TYPE: ServiceType = ServiceType::Storage;
    type Handle = dyn Storage;

    fn unconfigured() -> Arc<dyn Storage> {
        Arc::new(Unconfigured::new(Self::TYPE))
    }
}
