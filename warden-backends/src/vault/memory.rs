use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use warden_core::{AccessList, Backend, BackendError, ServiceContext, Settings, Vault, VaultDriver};

use super::SecretRecord;

/// Secrets kept in process memory.
#[derive(Default)]
pub struct MemoryVault {
    secrets: RwLock<HashMap<String, SecretRecord>>,
}

impl MemoryVault {
    pub const NAME: &'static str = "in-process-memory";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(
        _settings: &Settings,
        ctx: &ServiceContext,
    ) -> warden_core::Result<Arc<dyn Vault>> {
        Ok(Arc::new(ctx.guarded(Self::new())))
    }
}

#[async_trait]
impl Backend for MemoryVault {
    fn implementation(&self) -> &str {
        Self::NAME
    }

    async fn load_acl(&self, resource: &str) -> Result<Option<String>, BackendError> {
        Ok(self.secrets.read().get(resource).map(|s| s.acl.clone()))
    }

    async fn store_acl(&self, resource: &str, serialized: &str) -> Result<(), BackendError> {
        match self.secrets.write().get_mut(resource) {
            Some(secret) => {
                secret.acl = serialized.to_string();
                Ok(())
            }
            None => Err(BackendError::NotFound(resource.to_string())),
        }
    }
}

#[async_trait]
impl VaultDriver for MemoryVault {
    async fn reveal_secret(&self, resource: &str) -> Result<String, BackendError> {
        self.secrets
            .read()
            .get(resource)
            .map(|s| s.value.clone())
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    async fn store_secret(
        &self,
        resource: &str,
        value: String,
        acl: Option<&AccessList>,
    ) -> Result<(), BackendError> {
        let mut secrets = self.secrets.write();
        match secrets.get_mut(resource) {
            Some(secret) => {
                secret.value = value;
                if let Some(acl) = acl {
                    secret.acl = acl.serialized();
                }
            }
            None => {
                let acl = acl.map(AccessList::serialized).unwrap_or_default();
                secrets.insert(resource.to_string(), SecretRecord { value, acl });
            }
        }
        Ok(())
    }

    async fn remove_secret(&self, resource: &str) -> Result<(), BackendError> {
        self.secrets
            .write()
            .remove(resource)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }
}
