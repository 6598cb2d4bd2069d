use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use warden_core::{
    AccessList, Backend, BackendError, KvDriver, NamespacedKv, ServiceContext, Settings,
};

use super::{split, KvRecord};
use crate::json_file::JsonFile;
use crate::paths;

type Namespace = BTreeMap<String, KvRecord>;

/// One JSON file per namespace under `root` (`{root}/{namespace}.json`).
///
/// Setting: `root` (defaults to `kv` under the platform data directory).
pub struct LocalKv {
    root: PathBuf,
    files: RwLock<HashMap<String, Arc<JsonFile<Namespace>>>>,
}

impl LocalKv {
    pub const NAME: &'static str = "local-filesystem";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn from_settings(settings: &Settings) -> warden_core::Result<Self> {
        Ok(Self::new(paths::configured_path(settings, "root", "kv")?))
    }

    pub fn factory(
        settings: &Settings,
        ctx: &ServiceContext,
    ) -> warden_core::Result<Arc<dyn NamespacedKv>> {
        Ok(Arc::new(ctx.guarded(Self::from_settings(settings)?)))
    }

    fn namespace(&self, ns: &str) -> Result<Arc<JsonFile<Namespace>>, BackendError> {
        if let Some(file) = self.files.read().get(ns) {
            return Ok(file.clone());
        }
        let path = paths::resolve(&self.root, &format!("{}.json", ns))?;
        let mut files = self.files.write();
        Ok(files
            .entry(ns.to_string())
            .or_insert_with(|| Arc::new(JsonFile::new(path)))
            .clone())
    }
}

#[async_trait]
impl Backend for LocalKv {
    fn implementation(&self) -> &str {
        Self::NAME
    }

    async fn load_acl(&self, resource: &str) -> Result<Option<String>, BackendError> {
        let (ns, key) = split(resource)?;
        self.namespace(ns)?
            .read(|entries| entries.get(key).map(|r| r.acl.clone()))
    }

    async fn store_acl(&self, resource: &str, serialized: &str) -> Result<(), BackendError> {
        let (ns, key) = split(resource)?;
        self.namespace(ns)?.update(|entries| match entries.get_mut(key) {
            Some(record) => {
                record.acl = serialized.to_string();
                (Ok(()), true)
            }
            None => (Err(BackendError::NotFound(resource.to_string())), false),
        })?
    }

    fn release(&self) {
        self.files.write().clear();
    }
}

#[async_trait]
impl KvDriver for LocalKv {
    async fn get_value(&self, resource: &str) -> Result<Option<Value>, BackendError> {
        let (ns, key) = split(resource)?;
        self.namespace(ns)?
            .read(|entries| entries.get(key).map(|r| r.value.clone()))
    }

    async fn set_value(
        &self,
        resource: &str,
        value: Value,
        acl: Option<&AccessList>,
    ) -> Result<(), BackendError> {
        let (ns, key) = split(resource)?;
        self.namespace(ns)?.update(|entries| {
            match entries.get_mut(key) {
                Some(record) => {
                    record.value = value;
                    if let Some(acl) = acl {
                        record.acl = acl.serialized();
                    }
                }
                None => {
                    let acl = acl.map(AccessList::serialized).unwrap_or_default();
                    entries.insert(key.to_string(), KvRecord { value, acl });
                }
            }
            ((), true)
        })
    }

    async fn delete_value(&self, resource: &str) -> Result<bool, BackendError> {
        let (ns, key) = split(resource)?;
        self.namespace(ns)?.update(|entries| {
            let existed = entries.remove(key).is_some();
            (existed, existed)
        })
    }

    async fn namespace_keys(&self, namespace: &str) -> Result<Vec<String>, BackendError> {
        self.namespace(namespace)?
            .read(|entries| entries.keys().cloned().collect())
    }
}
