//! Namespaced key-value stores.
//!
//! Every key is its own resource, addressed as `{namespace}:{key}` (see
//! [`resource::namespaced`](crate::resource::namespaced)).

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{ResourceService, ServiceKind, ServiceType, Unconfigured};
use crate::access::{AccessLevel, AccessList, AccessRequest, Backend, Guarded};
use crate::error::{BackendError, Result};
use crate::identity::Candidate;
use crate::resource;

#[async_trait]
pub trait KvDriver: Backend {
    /// The value at `resource`, `None` if unset.
    async fn get_value(&self, resource: &str) -> std::result::Result<Option<Value>, BackendError>;

    /// `acl` is `Some` when the key is being created.
    async fn set_value(
        &self,
        resource: &str,
        value: Value,
        acl: Option<&AccessList>,
    ) -> std::result::Result<(), BackendError>;

    /// Returns whether the key existed.
    async fn delete_value(&self, resource: &str) -> std::result::Result<bool, BackendError>;

    /// Every key in `namespace`, unfiltered and without the namespace prefix.
    async fn namespace_keys(&self, namespace: &str)
        -> std::result::Result<Vec<String>, BackendError>;
}

#[async_trait]
pub trait NamespacedKv: ResourceService {
    /// Requires Read.
    async fn get(&self, request: &AccessRequest) -> Result<Option<Value>>;

    /// Requires Write.
    async fn set(&self, request: &AccessRequest, value: Value) -> Result<()>;

    /// Requires Write. Returns whether the key existed.
    async fn delete(&self, request: &AccessRequest) -> Result<bool>;

    /// Keys of `namespace` that `candidate` may read.
    async fn keys(&self, candidate: &Candidate, namespace: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl<D: KvDriver> NamespacedKv for Guarded<D> {
    async fn get(&self, request: &AccessRequest) -> Result<Option<Value>> {
        self.run(request, AccessLevel::Read, |driver, _| {
            driver.get_value(request.resource())
        })
        .await
    }

    async fn set(&self, request: &AccessRequest, value: Value) -> Result<()> {
        self.run(request, AccessLevel::Write, |driver, resolved| async move {
            let created = resolved.is_new().then(|| resolved.into_acl());
            driver
                .set_value(request.resource(), value, created.as_ref())
                .await
        })
        .await
    }

    async fn delete(&self, request: &AccessRequest) -> Result<bool> {
        self.run(request, AccessLevel::Write, |driver, _| {
            driver.delete_value(request.resource())
        })
        .await
    }

    async fn keys(&self, candidate: &Candidate, namespace: &str) -> Result<Vec<String>> {
        let mut readable = Vec::new();
        for key in self.driver().namespace_keys(namespace).await? {
            let id = resource::namespaced(namespace, &key)?;
            if self.guard().can_read(self.driver(), candidate, &id).await? {
                readable.push(key);
            }
        }
        Ok(readable)
    }
}

pub struct NamespacedKvService;

impl ServiceKind for NamespacedKvService {
    const TYPE: ServiceType = ServiceType::NamespacedKv;
    type Handle = dyn NamespacedKv;

    fn unconfigured() -> Arc<dyn NamespacedKv> {
        Arc::new(Unconfigured::new(Self::TYPE))
    }
}
