use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::{
    AccessList, Backend, BackendError, ObjectInfo, ServiceContext, Settings, Storage,
    StorageDriver,
};

struct StoredObject {
    data: Vec<u8>,
    acl: String,
    modified_at: DateTime<Utc>,
}

impl StoredObject {
    fn info(&self, resource: &str) -> ObjectInfo {
        ObjectInfo {
            resource: resource.to_string(),
            size: self.data.len() as u64,
            modified_at: self.modified_at,
        }
    }
}

/// Objects kept in process memory. Everything is lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStorage {
    pub const NAME: &'static str = "in-process-memory";

    pub fn new() -> Self {
        Self::default()
    }

    /// Registry factory.
    pub fn factory(
        _settings: &Settings,
        ctx: &ServiceContext,
    ) -> warden_core::Result<Arc<dyn Storage>> {
        Ok(Arc::new(ctx.guarded(Self::new())))
    }
}

#[async_trait]
impl Backend for MemoryStorage {
    fn implementation(&self) -> &str {
        Self::NAME
    }

    async fn load_acl(&self, resource: &str) -> Result<Option<String>, BackendError> {
        Ok(self.objects.read().get(resource).map(|o| o.acl.clone()))
    }

    async fn store_acl(&self, resource: &str, serialized: &str) -> Result<(), BackendError> {
        match self.objects.write().get_mut(resource) {
            Some(object) => {
                object.acl = serialized.to_string();
                Ok(())
            }
            None => Err(BackendError::NotFound(resource.to_string())),
        }
    }
}

#[async_trait]
impl StorageDriver for MemoryStorage {
    async fn read_object(&self, resource: &str) -> Result<Vec<u8>, BackendError> {
        self.objects
            .read()
            .get(resource)
            .map(|o| o.data.clone())
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    async fn write_object(
        &self,
        resource: &str,
        data: Vec<u8>,
        acl: Option<&AccessList>,
    ) -> Result<ObjectInfo, BackendError> {
        let mut objects = self.objects.write();
        let now = Utc::now();
        let object = objects
            .entry(resource.to_string())
            .or_insert_with(|| StoredObject {
                data: Vec::new(),
                acl: acl.map(AccessList::serialized).unwrap_or_default(),
                modified_at: now,
            });
        object.data = data;
        object.modified_at = now;
        if let Some(acl) = acl {
            object.acl = acl.serialized();
        }
        Ok(object.info(resource))
    }

    async fn delete_object(&self, resource: &str) -> Result<(), BackendError> {
        self.objects
            .write()
            .remove(resource)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    async fn stat_object(&self, resource: &str) -> Result<ObjectInfo, BackendError> {
        self.objects
            .read()
            .get(resource)
            .map(|o| o.info(resource))
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        Ok(self
            .objects
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
