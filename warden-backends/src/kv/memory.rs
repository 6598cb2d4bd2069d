use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use warden_core::{
    AccessList, Backend, BackendError, KvDriver, NamespacedKv, ServiceContext, Settings,
};

use super::{split, KvRecord};

type Namespace = BTreeMap<String, KvRecord>;

/// Key-value entries kept in process memory.
#[derive(Default)]
pub struct MemoryKv {
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl MemoryKv {
    pub const NAME: &'static str = "in-process-memory";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(
        _settings: &Settings,
        ctx: &ServiceContext,
    ) -> warden_core::Result<Arc<dyn NamespacedKv>> {
        Ok(Arc::new(ctx.guarded(Self::new())))
    }

    fn with_record<R>(
        &self,
        resource: &str,
        f: impl FnOnce(Option<&KvRecord>) -> R,
    ) -> Result<R, BackendError> {
        let (ns, key) = split(resource)?;
        let namespaces = self.namespaces.read();
        Ok(f(namespaces.get(ns).and_then(|n| n.get(key))))
    }
}

#[async_trait]
impl Backend for MemoryKv {
    fn implementation(&self) -> &str {
        Self::NAME
    }

    async fn load_acl(&self, resource: &str) -> Result<Option<String>, BackendError> {
        self.with_record(resource, |record| record.map(|r| r.acl.clone()))
    }

    async fn store_acl(&self, resource: &str, serialized: &str) -> Result<(), BackendError> {
        let (ns, key) = split(resource)?;
        match self
            .namespaces
            .write()
            .get_mut(ns)
            .and_then(|n| n.get_mut(key))
        {
            Some(record) => {
                record.acl = serialized.to_string();
                Ok(())
            }
            None => Err(BackendError::NotFound(resource.to_string())),
        }
    }
}

#[async_trait]
impl KvDriver for MemoryKv {
    async fn get_value(&self, resource: &str) -> Result<Option<Value>, BackendError> {
        self.with_record(resource, |record| record.map(|r| r.value.clone()))
    }

    async fn set_value(
        &self,
        resource: &str,
        value: Value,
        acl: Option<&AccessList>,
    ) -> Result<(), BackendError> {
        let (ns, key) = split(resource)?;
        let mut namespaces = self.namespaces.write();
        let namespace = namespaces.entry(ns.to_string()).or_default();
        match namespace.get_mut(key) {
            Some(record) => {
                record.value = value;
                if let Some(acl) = acl {
                    record.acl = acl.serialized();
                }
            }
            None => {
                let acl = acl.map(AccessList::serialized).unwrap_or_default();
                namespace.insert(key.to_string(), KvRecord { value, acl });
            }
        }
        Ok(())
    }

    async fn delete_value(&self, resource: &str) -> Result<bool, BackendError> {
        let (ns, key) = split(resource)?;
        let mut namespaces = self.namespaces.write();
        let Some(namespace) = namespaces.get_mut(ns) else {
            return Ok(false);
        };
        let existed = namespace.remove(key).is_some();
        if namespace.is_empty() {
            namespaces.remove(ns);
        }
        Ok(existed)
    }

    async fn namespace_keys(&self, namespace: &str) -> Result<Vec<String>, BackendError> {
        Ok(self
            .namespaces
            .read()
            .get(namespace)
            .map(|n| n.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::{AccessLevel, Candidate, Guard, Guarded, ResourceService, Role};

    #[tokio::test]
    async fn test_keys_are_filtered_per_candidate() {
        let kv = Guarded::new(MemoryKv::new(), Guard::without_teams());
        let alice = Candidate::user("alice");
        let bob = Candidate::user("bob");

        kv.set(&alice.write("prefs:theme"), json!("dark")).await.unwrap();
        kv.set(&alice.write("prefs:lang"), json!("en")).await.unwrap();
        kv.set(&bob.write("prefs:tz"), json!("UTC")).await.unwrap();

        assert_eq!(kv.keys(&alice, "prefs").await.unwrap(), vec!["lang", "theme"]);
        assert_eq!(kv.keys(&bob, "prefs").await.unwrap(), vec!["tz"]);

        kv.share(
            &alice.owner("prefs:theme"),
            Role::User,
            "bob",
            vec![AccessLevel::Read],
        )
        .await
        .unwrap();
        assert_eq!(kv.keys(&bob, "prefs").await.unwrap(), vec!["theme", "tz"]);
    }

    #[tokio::test]
    async fn test_get_unset_and_delete() {
        let kv = Guarded::new(MemoryKv::new(), Guard::without_teams());
        let me = Candidate::agent("a");

        assert_eq!(kv.get(&me.read("ns:missing")).await.unwrap(), None);
        kv.set(&me.write("ns:k"), json!({"n": 1})).await.unwrap();
        assert_eq!(kv.get(&me.read("ns:k")).await.unwrap(), Some(json!({"n": 1})));
        assert!(kv.delete(&me.write("ns:k")).await.unwrap());
        assert!(!kv.delete(&me.write("ns:k")).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_unnamespaced_resource() {
        let kv = MemoryKv::new();
        assert!(kv.get_value("plain").await.is_err());
    }

    #[tokio::test]
    async fn test_set_over_unowned_key_takes_ownership() {
        let driver = MemoryKv::new();
        driver.set_value("ns:k", json!(0), None).await.unwrap();
        let kv = Guarded::new(driver, Guard::without_teams());

        kv.set(&Candidate::user("bob").write("ns:k"), json!(1))
            .await
            .unwrap();
        assert!(kv
            .set(&Candidate::user("mallory").write("ns:k"), json!(2))
            .await
            .unwrap_err()
            .is_access_denied());
        assert_eq!(
            kv.get(&Candidate::user("bob").read("ns:k")).await.unwrap(),
            Some(json!(1))
        );
    }
}
