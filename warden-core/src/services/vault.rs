//! Secret vaults.
//!
//! The plain vault and the managed vault share one contract; they are
//! separate service types so a deployment can back them with different
//! implementations.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ResourceService, ServiceKind, ServiceType, Unconfigured};
use crate::access::{AccessLevel, AccessList, AccessRequest, Backend, Guarded};
use crate::error::{BackendError, Result};

#[async_trait]
pub trait VaultDriver: Backend {
    async fn reveal_secret(&self, resource: &str) -> std::result::Result<String, BackendError>;

    /// Store `value`. `acl` is `Some` when the secret is being created.
    async fn store_secret(
        &self,
        resource: &str,
        value: String,
        acl: Option<&AccessList>,
    ) -> std::result::Result<(), BackendError>;

    async fn remove_secret(&self, resource: &str) -> std::result::Result<(), BackendError>;
}

#[async_trait]
pub trait Vault: ResourceService {
    /// Requires Read.
    async fn reveal(&self, request: &AccessRequest) -> Result<String>;

    /// Create or replace a secret. Requires Write.
    async fn store(&self, request: &AccessRequest, value: String) -> Result<()>;

    /// Requires Write.
    async fn remove(&self, request: &AccessRequest) -> Result<()>;
}

#[async_trait]
impl<D: VaultDriver> Vault for Guarded<D> {
    async fn reveal(&self, request: &AccessRequest) -> Result<String> {
        self.run(request, AccessLevel::Read, |driver, _| {
            driver.reveal_secret(request.resource())
        })
        .await
    }

    async fn store(&self, request: &AccessRequest, value: String) -> Result<()> {
        self.run(request, AccessLevel::Write, |driver, resolved| async move {
            let created = resolved.is_new().then(|| resolved.into_acl());
            driver
                .store_secret(request.resource(), value, created.as_ref())
                .await
        })
        .await
    }

    async fn remove(&self, request: &AccessRequest) -> Result<()> {
        self.run(request, AccessLevel::Write, |driver, _| {
            driver.remove_secret(request.resource())
        })
        .await
    }
}

pub struct VaultService;

impl ServiceKind for VaultService {
    const TYPE: ServiceType = ServiceType::Vault;
    type Handle = dyn Vault;

    fn unconfigured() -> Arc<dyn Vault> {
        Arc::new(Unconfigured::new(Self::TYPE))
    }
}

pub struct ManagedVaultService;

impl ServiceKind for ManagedVaultService {
    const TYPE: ServiceType = ServiceType::ManagedVault;
    type Handle = dyn Vault;

    fn unconfigured() -> Arc<dyn Vault> {
        Arc::new(Unconfigured::new(Self::TYPE))
    }
}
