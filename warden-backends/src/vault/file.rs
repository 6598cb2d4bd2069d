use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use warden_core::{AccessList, Backend, BackendError, ServiceContext, Settings, Vault, VaultDriver};

use super::SecretRecord;
use crate::json_file::JsonFile;
use crate::paths;

type Secrets = BTreeMap<String, SecretRecord>;

/// Secrets persisted to a single JSON file.
///
/// The file maps each resource to its value and ACL. It is read once and
/// rewritten after every change. Setting: `path` (defaults to `vault.json`
/// under the platform data directory).
pub struct FileVault {
    file: JsonFile<Secrets>,
}

impl FileVault {
    pub const NAME: &'static str = "file-backed";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn from_settings(settings: &Settings) -> warden_core::Result<Self> {
        Ok(Self::new(paths::configured_path(settings, "path", "vault.json")?))
    }

    pub fn factory(
        settings: &Settings,
        ctx: &ServiceContext,
    ) -> warden_core::Result<Arc<dyn Vault>> {
        let vault = Self::from_settings(settings)?;
        log::debug!("file vault at {}", vault.file.path().display());
        Ok(Arc::new(ctx.guarded(vault)))
    }
}

#[async_trait]
impl Backend for FileVault {
    fn implementation(&self) -> &str {
        Self::NAME
    }

    async fn load_acl(&self, resource: &str) -> Result<Option<String>, BackendError> {
        self.file.read(|secrets| secrets.get(resource).map(|s| s.acl.clone()))
    }

    async fn store_acl(&self, resource: &str, serialized: &str) -> Result<(), BackendError> {
        self.file.update(|secrets| match secrets.get_mut(resource) {
            Some(secret) => {
                secret.acl = serialized.to_string();
                (Ok(()), true)
            }
            None => (Err(BackendError::NotFound(resource.to_string())), false),
        })?
    }

    fn release(&self) {
        self.file.invalidate();
    }
}

#[async_trait]
impl VaultDriver for FileVault {
    async fn reveal_secret(&self, resource: &str) -> Result<String, BackendError> {
        self.file
            .read(|secrets| secrets.get(resource).map(|s| s.value.clone()))?
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    async fn store_secret(
        &self,
        resource: &str,
        value: String,
        acl: Option<&AccessList>,
    ) -> Result<(), BackendError> {
        self.file.update(|secrets| {
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
            ((), true)
        })
    }

    async fn remove_secret(&self, resource: &str) -> Result<(), BackendError> {
        self.file.update(|secrets| match secrets.remove(resource) {
            Some(_) => (Ok(()), true),
            None => (Err(BackendError::NotFound(resource.to_string())), false),
        })?
    }
}
