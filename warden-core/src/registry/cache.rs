//! Sliding-TTL cache of configured service instances.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::settings::Settings;
use crate::error::Result;
use crate::services::Connector;

/// How long an unused instance stays cached.
pub const DEFAULT_INSTANCE_TTL: Duration = Duration::from_secs(3600);

struct Entry<T: ?Sized> {
    instance: Arc<T>,
    last_used: Instant,
}

/// Instances keyed by the fingerprint of the settings that built them.
///
/// Every hit pushes the entry's expiry forward by the TTL. Each lookup first
/// evicts every expired entry, whatever its key, so instances built for
/// one-off settings do not outlive the TTL by more than one lookup. Evicted
/// instances are [released](Connector::release).
pub struct InstanceCache<T: ?Sized + Connector> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T: ?Sized + Connector> InstanceCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The live instance built from `settings`, or a new one from `create`.
    ///
    /// `create` runs at most once per miss and is never called while another
    /// caller holds a live entry for the same settings. If it fails nothing
    /// is cached.
    pub fn get_or_create<F>(&self, settings: &Settings, create: F) -> Result<Arc<T>>
    where
        F: FnOnce(&Settings) -> Result<Arc<T>>,
    {
        let key = settings.fingerprint();
        let now = Instant::now();
        let mut entries = self.entries.lock();
        evict_expired(&mut entries, now, self.ttl);

        if let Some(entry) = entries.get_mut(&key) {
            entry.last_used = now;
            log::debug!("instance cache hit ({})", short(&key));
            return Ok(entry.instance.clone());
        }

        log::debug!("instance cache miss ({})", short(&key));
        let instance = create(settings)?;
        entries.insert(
            key,
            Entry {
                instance: instance.clone(),
                last_used: now,
            },
        );
        Ok(instance)
    }

    /// Evict and release every expired entry. Returns how many were evicted.
    pub fn purge_expired(&self) -> usize {
        evict_expired(&mut self.entries.lock(), Instant::now(), self.ttl)
    }

    /// Release and drop every entry.
    pub fn clear(&self) {
        let drained: Vec<Entry<T>> = self.entries.lock().drain().map(|(_, e)| e).collect();
        for entry in drained {
            entry.instance.release();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T: ?Sized + Connector> Default for InstanceCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_INSTANCE_TTL)
    }
}

fn evict_expired<T: ?Sized + Connector>(
    entries: &mut HashMap<String, Entry<T>>,
    now: Instant,
    ttl: Duration,
) -> usize {
    let before = entries.len();
    entries.retain(|key, entry| {
        if now.duration_since(entry.last_used) < ttl {
            return true;
        }
        log::debug!("instance cache evicted expired entry ({})", short(key));
        entry.instance.release();
        false
    });
    before - entries.len()
}

fn short(key: &str) -> &str {
    &key[..key.len().min(12)]
}
