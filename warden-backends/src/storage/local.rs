use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use warden_core::{
    AccessList, Backend, BackendError, Error, ObjectInfo, ServiceContext, Settings, Storage,
    StorageDriver,
};

use crate::paths::{self, ACL_DIR};

#[derive(Debug, Deserialize)]
struct LocalSettings {
    #[serde(default = "default_create")]
    create: bool,
}

fn default_create() -> bool {
    true
}

/// Objects stored as plain files under `root`.
///
/// Each object's ACL lives in a sidecar file at `root/.acl/{resource}.json`.
/// An object without a sidecar is treated as not existing.
///
/// Settings: `root` (defaults to the platform data directory) and `create`
/// (create `root` if missing, default true).
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub const NAME: &'static str = "local-filesystem";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn from_settings(settings: &Settings) -> warden_core::Result<Self> {
        let parsed: LocalSettings = settings.parse()?;
        let root = paths::configured_path(settings, "root", "storage")?;

        if !root.exists() {
            if !parsed.create {
                return Err(Error::Configuration(format!(
                    "storage root {} does not exist",
                    root.display()
                )));
            }
            std::fs::create_dir_all(&root).map_err(|e| {
                Error::Configuration(format!("cannot create {}: {}", root.display(), e))
            })?;
        }
        if !root.is_dir() {
            return Err(Error::Configuration(format!(
                "storage root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self::new(root))
    }

    /// Registry factory.
    pub fn factory(
        settings: &Settings,
        ctx: &ServiceContext,
    ) -> warden_core::Result<Arc<dyn Storage>> {
        Ok(Arc::new(ctx.guarded(Self::from_settings(settings)?)))
    }

    async fn write_file(path: &Path, contents: &[u8]) -> Result<(), BackendError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
        Ok(())
    }

    fn info(resource: &str, metadata: &std::fs::Metadata) -> ObjectInfo {
        let modified_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        ObjectInfo {
            resource: resource.to_string(),
            size: metadata.len(),
            modified_at,
        }
    }
}

fn not_found(resource: &str) -> impl FnOnce(std::io::Error) -> BackendError + '_ {
    move |e| match e.kind() {
        ErrorKind::NotFound => BackendError::NotFound(resource.to_string()),
        _ => BackendError::Io(e),
    }
}

#[async_trait]
impl Backend for LocalStorage {
    fn implementation(&self) -> &str {
        Self::NAME
    }

    async fn load_acl(&self, resource: &str) -> Result<Option<String>, BackendError> {
        let sidecar = paths::sidecar(&self.root, resource)?;
        match tokio::fs::read_to_string(&sidecar).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store_acl(&self, resource: &str, serialized: &str) -> Result<(), BackendError> {
        let sidecar = paths::sidecar(&self.root, resource)?;
        Self::write_file(&sidecar, serialized.as_bytes()).await
    }
}

#[async_trait]
impl StorageDriver for LocalStorage {
    async fn read_object(&self, resource: &str) -> Result<Vec<u8>, BackendError> {
        let path = paths::resolve(&self.root, resource)?;
        tokio::fs::read(&path).await.map_err(not_found(resource))
    }

    async fn write_object(
        &self,
        resource: &str,
        data: Vec<u8>,
        acl: Option<&AccessList>,
    ) -> Result<ObjectInfo, BackendError> {
        let path = paths::resolve(&self.root, resource)?;
        Self::write_file(&path, &data).await?;
        if let Some(acl) = acl {
            self.store_acl(resource, &acl.serialized()).await?;
        }
        let metadata = tokio::fs::metadata(&path).await?;
        Ok(Self::info(resource, &metadata))
    }

    async fn delete_object(&self, resource: &str) -> Result<(), BackendError> {
        let path = paths::resolve(&self.root, resource)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(not_found(resource))?;
        match tokio::fs::remove_file(paths::sidecar(&self.root, resource)?).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn stat_object(&self, resource: &str) -> Result<ObjectInfo, BackendError> {
        let path = paths::resolve(&self.root, resource)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(not_found(resource))?;
        if !metadata.is_file() {
            return Err(BackendError::NotFound(resource.to_string()));
        }
        Ok(Self::info(resource, &metadata))
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let mut found = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, relative)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                if relative.is_empty() && name == ACL_DIR {
                    continue;
                }
                let id = if relative.is_empty() {
                    name
                } else {
                    format!("{}/{}", relative, name)
                };
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), id));
                } else if file_type.is_file() && id.starts_with(prefix) {
                    found.push(id);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}
