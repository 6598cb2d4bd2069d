//! Common test utilities shared across test files.
//!
//! Items here may not be used by all test files, hence the module-level allow.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warden_core::{
    AccessList, Account, Backend, BackendError, Candidate, Connector, ObjectInfo, Result, Role,
    ServiceRegistry, Settings, Storage, StorageDriver, StorageService, Vault, VaultDriver,
    VaultService, AccountService,
};

// ===== In-memory driver =====

#[derive(Default)]
struct Shared {
    data: Mutex<HashMap<String, Vec<u8>>>,
    acls: Mutex<HashMap<String, String>>,
    released: AtomicUsize,
}

/// Storage and vault driver backed by a pair of hash maps.
#[derive(Clone, Default)]
pub struct MapDriver {
    shared: Arc<Shared>,
}

impl MapDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored_acl(&self, resource: &str) -> Option<AccessList> {
        AccessList::from_metadata(self.shared.acls.lock().get(resource).map(String::as_str))
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.shared.data.lock().contains_key(resource)
    }

    pub fn released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }

    fn read(&self, resource: &str) -> std::result::Result<Vec<u8>, BackendError> {
        self.shared
            .data
            .lock()
            .get(resource)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    fn write(&self, resource: &str, data: Vec<u8>, acl: Option<&AccessList>) -> u64 {
        let size = data.len() as u64;
        self.shared.data.lock().insert(resource.to_string(), data);
        if let Some(acl) = acl {
            self.shared
                .acls
                .lock()
                .insert(resource.to_string(), acl.serialized());
        }
        size
    }

    fn remove(&self, resource: &str) -> std::result::Result<(), BackendError> {
        self.shared.acls.lock().remove(resource);
        self.shared
            .data
            .lock()
            .remove(resource)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }
}

#[async_trait]
impl Backend for MapDriver {
    fn implementation(&self) -> &str {
        "map"
    }

    async fn load_acl(&self, resource: &str) -> std::result::Result<Option<String>, BackendError> {
        Ok(self.shared.acls.lock().get(resource).cloned())
    }

    async fn store_acl(
        &self,
        resource: &str,
        serialized: &str,
    ) -> std::result::Result<(), BackendError> {
        self.shared
            .acls
            .lock()
            .insert(resource.to_string(), serialized.to_string());
        Ok(())
    }

    fn release(&self) {
        self.shared.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageDriver for MapDriver {
    async fn read_object(&self, resource: &str) -> std::result::Result<Vec<u8>, BackendError> {
        self.read(resource)
    }

    async fn write_object(
        &self,
        resource: &str,
        data: Vec<u8>,
        acl: Option<&AccessList>,
    ) -> std::result::Result<ObjectInfo, BackendError> {
        let size = self.write(resource, data, acl);
        Ok(ObjectInfo {
            resource: resource.to_string(),
            size,
            modified_at: Utc::now(),
        })
    }

    async fn delete_object(&self, resource: &str) -> std::result::Result<(), BackendError> {
        self.remove(resource)
    }

    async fn stat_object(&self, resource: &str) -> std::result::Result<ObjectInfo, BackendError> {
        let size = self.read(resource)?.len() as u64;
        Ok(ObjectInfo {
            resource: resource.to_string(),
            size,
            modified_at: Utc::now(),
        })
    }

    async fn list_objects(&self, prefix: &str) -> std::result::Result<Vec<String>, BackendError> {
        let mut keys: Vec<String> = self
            .shared
            .data
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl VaultDriver for MapDriver {
    async fn reveal_secret(&self, resource: &str) -> std::result::Result<String, BackendError> {
        let bytes = self.read(resource)?;
        String::from_utf8(bytes).map_err(|e| BackendError::Other(e.to_string()))
    }

    async fn store_secret(
        &self,
        resource: &str,
        value: String,
        acl: Option<&AccessList>,
    ) -> std::result::Result<(), BackendError> {
        self.write(resource, value.into_bytes(), acl);
        Ok(())
    }

    async fn remove_secret(&self, resource: &str) -> std::result::Result<(), BackendError> {
        self.remove(resource)
    }
}

// ===== Accounts =====

/// Fixed member → team directory.
#[derive(Default)]
pub struct Directory {
    members: HashMap<String, String>,
}

impl Directory {
    pub fn new(members: &[(&str, &str)]) -> Self {
        Self {
            members: members
                .iter()
                .map(|(m, t)| (m.to_string(), t.to_string()))
                .collect(),
        }
    }
}

impl Connector for Directory {
    fn implementation(&self) -> &str {
        "directory"
    }
}

#[async_trait]
impl Account for Directory {
    async fn team_of(&self, candidate: &Candidate) -> Result<Option<String>> {
        Ok(match candidate.role() {
            Role::Team => Some(candidate.id().to_string()),
            _ => self.members.get(candidate.id()).cloned(),
        })
    }
}

// ===== Registry helpers =====

/// Registers `map` as Storage and Vault, and a directory with the given
/// members as Account.
pub fn registry_with(driver: &MapDriver, members: &'static [(&'static str, &'static str)]) -> ServiceRegistry {
    let registry = ServiceRegistry::new();

    registry.register::<AccountService, _>("directory", move |_, _| {
        let accounts: Arc<dyn Account> = Arc::new(Directory::new(members));
        Ok(accounts)
    });

    let storage_driver = driver.clone();
    registry.register::<StorageService, _>("map", move |_, ctx| {
        let storage: Arc<dyn Storage> = Arc::new(ctx.guarded(storage_driver.clone()));
        Ok(storage)
    });

    let vault_driver = driver.clone();
    registry.register::<VaultService, _>("map", move |_, ctx| {
        let vault: Arc<dyn Vault> = Arc::new(ctx.guarded(vault_driver.clone()));
        Ok(vault)
    });

    registry
}

/// [`registry_with`], initialized and ready.
pub fn ready_registry(driver: &MapDriver, members: &'static [(&'static str, &'static str)]) -> ServiceRegistry {
    let registry = registry_with(driver, members);
    registry
        .init::<AccountService>("directory", Settings::new())
        .expect("init account");
    registry
        .init::<StorageService>("map", Settings::new())
        .expect("init storage");
    registry
        .init::<VaultService>("map", Settings::new())
        .expect("init vault");
    registry.mark_ready();
    registry
}
