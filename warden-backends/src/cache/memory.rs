use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use warden_core::{Cache, Connector, ServiceContext, Settings};

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Default, Deserialize)]
struct CacheSettings {
    default_ttl_secs: Option<u64>,
}

/// Values kept in process memory with optional expiry.
///
/// Expired entries are dropped when read, and every `set` sweeps all of them.
/// Setting: `default_ttl_secs`, applied when `set` is called without a TTL.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    default_ttl: Option<Duration>,
}

impl MemoryCache {
    pub const NAME: &'static str = "in-process-memory";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl: Some(ttl),
        }
    }

    pub fn from_settings(settings: &Settings) -> warden_core::Result<Self> {
        let parsed: CacheSettings = settings.parse()?;
        Ok(match parsed.default_ttl_secs {
            Some(secs) => Self::with_default_ttl(Duration::from_secs(secs)),
            None => Self::new(),
        })
    }

    pub fn factory(
        settings: &Settings,
        _ctx: &ServiceContext,
    ) -> warden_core::Result<Arc<dyn Cache>> {
        Ok(Arc::new(Self::from_settings(settings)?))
    }

    /// Number of entries held, including any that expired since the last `set`.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Connector for MemoryCache {
    fn implementation(&self) -> &str {
        Self::NAME
    }

    fn release(&self) {
        self.entries.write().clear();
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> warden_core::Result<Option<Value>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> warden_core::Result<()> {
        let now = Instant::now();
        let expires_at = ttl.or(self.default_ttl).map(|ttl| now + ttl);
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> warden_core::Result<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires() {
        let cache = MemoryCache::new();
        cache
            .set("token", json!("abc"), Some(Duration::from_secs(10)))
            .await
            .unwrap();
        cache.set("forever", json!(1), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get("token").await.unwrap(), Some(json!("abc")));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("token").await.unwrap(), None);
        assert_eq!(cache.get("forever").await.unwrap(), Some(json!(1)));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_from_settings() {
        let settings = Settings::new().with("default_ttl_secs", 5);
        let cache = MemoryCache::from_settings(&settings).unwrap();
        cache.set("k", json!(true), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_sweeps_unread_expired_entries() {
        let cache = MemoryCache::new();
        for i in 0..50 {
            cache
                .set(&format!("req-{}", i), json!(i), Some(Duration::from_secs(5)))
                .await
                .unwrap();
        }
        cache.set("forever", json!(0), None).await.unwrap();
        assert_eq!(cache.len(), 51);

        tokio::time::advance(Duration::from_secs(6)).await;
        cache.set("fresh", json!(1), Some(Duration::from_secs(5))).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("forever").await.unwrap(), Some(json!(0)));
        assert_eq!(cache.get("req-3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_and_release() {
        let cache = MemoryCache::new();
        cache.set("a", json!(1), None).await.unwrap();
        cache.set("b", json!(2), None).await.unwrap();

        assert!(cache.delete("a").await.unwrap());
        assert!(!cache.delete("a").await.unwrap());

        cache.release();
        assert!(cache.is_empty());
    }
}
