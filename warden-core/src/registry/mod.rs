//! The service registry.
//!
//! Callers ask the registry for "the Storage service" and get back an
//! `Arc<dyn Storage>`; which connector sits behind it is decided by
//! configuration. The registry is an ordinary value: build one at startup and
//! pass it (or an `Arc` of it) to whatever needs services.
//!
//! # Lifecycle
//!
//! ```text
//! new ──register──► (implementations known) ──init──► (instances live)
//!      ──mark_ready──► ready ──shutdown──► everything released, not ready
//! ```
//!
//! Until a service type has been initialized, [`ServiceRegistry::get`]
//! returns an [`Unconfigured`](crate::services::Unconfigured) stand-in whose
//! every operation fails with [`Error::NotReady`], so code that merely holds
//! a handle to an unused service never fails at startup.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden_core::test_utils::RecordingBackend;
//! use warden_core::{Candidate, ServiceRegistry, Settings, Storage, StorageService};
//!
//! # async fn example() -> warden_core::Result<()> {
//! let registry = ServiceRegistry::new();
//! registry.register::<StorageService, _>("recording", |_settings, ctx| {
//!     let storage: Arc<dyn Storage> = Arc::new(ctx.guarded(RecordingBackend::new()));
//!     Ok(storage)
//! });
//! registry.init::<StorageService>("recording", Settings::new())?;
//! registry.mark_ready();
//!
//! let storage = registry.require::<StorageService>()?;
//! storage
//!     .put(&Candidate::user("alice").write("hello.txt"), b"hi".to_vec())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod settings;

pub use cache::{InstanceCache, DEFAULT_INSTANCE_TTL};
pub use config::{RegistryConfig, ServiceConfig};
pub use settings::Settings;

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::access::{Backend, Guard, Guarded};
use crate::error::{Error, Result};
use crate::services::{
    AccountService, CacheService, CodeService, Connector, ManagedVaultService,
    NamespacedKvService, NoTeams, ServiceKind, ServiceType, StorageService, VaultService,
    VectorDbService,
};

/// Builds a service instance from its settings.
pub type Factory<K> = Arc<
    dyn Fn(&Settings, &ServiceContext) -> Result<Arc<<K as ServiceKind>::Handle>> + Send + Sync,
>;

/// What a factory gets besides its settings.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    guard: Guard,
}

impl ServiceContext {
    pub fn new(guard: Guard) -> Self {
        Self { guard }
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Wrap a raw driver so that every operation on it is authorized.
    pub fn guarded<D: Backend>(&self, driver: D) -> Guarded<D> {
        Guarded::new(driver, self.guard.clone())
    }
}

struct Live<K: ServiceKind> {
    handle: Arc<K::Handle>,
    settings: Settings,
}

/// Everything the registry knows about one service type.
struct Slot<K: ServiceKind> {
    factories: HashMap<String, Factory<K>>,
    instances: HashMap<String, Live<K>>,
    default: Option<String>,
    cache: Arc<InstanceCache<K::Handle>>,
    stand_in: Arc<K::Handle>,
}

impl<K: ServiceKind> Slot<K> {
    fn new(ttl: Duration) -> Self {
        Self {
            factories: HashMap::new(),
            instances: HashMap::new(),
            default: None,
            cache: Arc::new(InstanceCache::new(ttl)),
            stand_in: K::unconfigured(),
        }
    }

    fn default_live(&self) -> Option<(&str, &Live<K>)> {
        let name = self.default.as_deref()?;
        self.instances.get(name).map(|live| (name, live))
    }

    fn resolve(&self, name: Option<&str>) -> Arc<K::Handle> {
        name.and_then(|n| self.instances.get(n))
            .or_else(|| self.default_live().map(|(_, live)| live))
            .map(|live| live.handle.clone())
            .unwrap_or_else(|| self.stand_in.clone())
    }
}

/// Type-erased view of a [`Slot`], so the registry can hold one per service
/// type in a single map.
trait ErasedSlot: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn release_all(&mut self);
    fn purge_expired(&self) -> usize;
    fn reset_cache(&mut self, ttl: Duration);
}

impl<K: ServiceKind> ErasedSlot for Slot<K> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn release_all(&mut self) {
        for (name, live) in self.instances.drain() {
            log::debug!("releasing {} service '{}'", K::TYPE, name);
            live.handle.release();
        }
        self.default = None;
        self.cache.clear();
    }

    fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    fn reset_cache(&mut self, ttl: Duration) {
        self.cache.clear();
        self.cache = Arc::new(InstanceCache::new(ttl));
    }
}

/// Catalog of service implementations and their live instances.
pub struct ServiceRegistry {
    slots: RwLock<HashMap<ServiceType, Box<dyn ErasedSlot>>>,
    ready: AtomicBool,
    // Shared with every guard handed to factories
    guard: Guard,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    /// An empty registry whose instance caches use [`DEFAULT_INSTANCE_TTL`].
    pub fn new() -> Self {
        Self::with_instance_ttl(DEFAULT_INSTANCE_TTL)
    }

    pub fn with_instance_ttl(ttl: Duration) -> Self {
        let mut slots: HashMap<ServiceType, Box<dyn ErasedSlot>> = HashMap::new();
        slots.insert(AccountService::TYPE, Box::new(Slot::<AccountService>::new(ttl)));
        slots.insert(StorageService::TYPE, Box::new(Slot::<StorageService>::new(ttl)));
        slots.insert(VaultService::TYPE, Box::new(Slot::<VaultService>::new(ttl)));
        slots.insert(
            ManagedVaultService::TYPE,
            Box::new(Slot::<ManagedVaultService>::new(ttl)),
        );
        slots.insert(
            NamespacedKvService::TYPE,
            Box::new(Slot::<NamespacedKvService>::new(ttl)),
        );
        slots.insert(CodeService::TYPE, Box::new(Slot::<CodeService>::new(ttl)));
        slots.insert(VectorDbService::TYPE, Box::new(Slot::<VectorDbService>::new(ttl)));
        slots.insert(CacheService::TYPE, Box::new(Slot::<CacheService>::new(ttl)));

        Self {
            slots: RwLock::new(slots),
            ready: AtomicBool::new(false),
            guard: Guard::without_teams(),
        }
    }

    /// Build a registry with `config`'s instance TTL. Call
    /// [`apply`](Self::apply) after registering implementations.
    pub fn for_config(config: &RegistryConfig) -> Self {
        Self::with_instance_ttl(config.instance_ttl())
    }

    fn read_slot<K: ServiceKind, R>(&self, f: impl FnOnce(&Slot<K>) -> R) -> Result<R> {
        let slots = self.slots.read();
        slots
            .get(&K::TYPE)
            .and_then(|slot| slot.as_any().downcast_ref::<Slot<K>>())
            .map(f)
            .ok_or_else(|| kind_mismatch::<K>())
    }

    fn write_slot<K: ServiceKind, R>(&self, f: impl FnOnce(&mut Slot<K>) -> R) -> Result<R> {
        let mut slots = self.slots.write();
        slots
            .get_mut(&K::TYPE)
            .and_then(|slot| slot.as_any_mut().downcast_mut::<Slot<K>>())
            .map(f)
            .ok_or_else(|| kind_mismatch::<K>())
    }

    /// Make an implementation available under `name`. Nothing is built.
    ///
    /// Registering the same name again replaces the factory.
    pub fn register<K, F>(&self, name: impl Into<String>, factory: F)
    where
        K: ServiceKind,
        F: Fn(&Settings, &ServiceContext) -> Result<Arc<K::Handle>> + Send + Sync + 'static,
    {
        let name = name.into();
        let factory: Factory<K> = Arc::new(factory);
        let registered = self.write_slot::<K, _>(|slot| {
            slot.factories.insert(name.clone(), factory);
        });
        match registered {
            Ok(()) => log::debug!("registered {} implementation '{}'", K::TYPE, name),
            Err(e) => log::warn!("cannot register '{}': {}", name, e),
        }
    }

    /// Whether `name` is a registered implementation of `K`.
    pub fn is_registered<K: ServiceKind>(&self, name: &str) -> bool {
        self.read_slot::<K, _>(|slot| slot.factories.contains_key(name))
            .unwrap_or(false)
    }

    /// Registered implementation names of `K`, sorted.
    pub fn implementations<K: ServiceKind>(&self) -> Vec<String> {
        let mut names = self
            .read_slot::<K, _>(|slot| slot.factories.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Build `name` from `settings` and make it the default for `K`.
    ///
    /// The instance is also reachable by name through [`get`](Self::get). An
    /// instance previously initialized under the same name is released, as
    /// is everything in `K`'s instance cache.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if `name` was never registered; whatever the
    /// factory returns if construction fails.
    pub fn init<K: ServiceKind>(
        &self,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<Arc<K::Handle>> {
        let name = name.into();
        let factory = self
            .read_slot::<K, _>(|slot| slot.factories.get(&name).cloned())?
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "no {} implementation registered as '{}'",
                    K::TYPE,
                    name
                ))
            })?;

        let handle = factory(&settings, &self.context())?;

        let replaced = self.write_slot::<K, _>(|slot| {
            let replaced = slot.instances.insert(
                name.clone(),
                Live {
                    handle: handle.clone(),
                    settings,
                },
            );
            slot.default = Some(name.clone());
            slot.cache.clear();
            replaced
        })?;
        if K::TYPE == ServiceType::Account {
            self.refresh_accounts();
        }
        if let Some(old) = replaced {
            old.handle.release();
        }

        log::info!("initialized {} service '{}'", K::TYPE, name);
        Ok(handle)
    }

    /// [`init`](Self::init) for a service type known only at runtime.
    pub fn init_service(&self, ty: ServiceType, name: &str, settings: Settings) -> Result<()> {
        match ty {
            ServiceType::Account => self.init::<AccountService>(name, settings).map(drop),
            ServiceType::Storage => self.init::<StorageService>(name, settings).map(drop),
            ServiceType::Vault => self.init::<VaultService>(name, settings).map(drop),
            ServiceType::ManagedVault => {
                self.init::<ManagedVaultService>(name, settings).map(drop)
            }
            ServiceType::NamespacedKv => {
                self.init::<NamespacedKvService>(name, settings).map(drop)
            }
            ServiceType::Code => self.init::<CodeService>(name, settings).map(drop),
            ServiceType::VectorDb => self.init::<VectorDbService>(name, settings).map(drop),
            ServiceType::Cache => self.init::<CacheService>(name, settings).map(drop),
        }
    }

    /// The instance initialized as `name`, else `K`'s default, else the
    /// stand-in. Repeated calls without an intervening `init` return the
    /// same `Arc`.
    pub fn get<K: ServiceKind>(&self, name: Option<&str>) -> Arc<K::Handle> {
        self.read_slot::<K, _>(|slot| slot.resolve(name))
            .unwrap_or_else(|_| K::unconfigured())
    }

    /// `K`'s default instance, failing fast instead of handing out the
    /// stand-in.
    ///
    /// # Errors
    ///
    /// [`Error::NotReady`] if [`mark_ready`](Self::mark_ready) has not been
    /// called or nothing was initialized for `K`.
    pub fn require<K: ServiceKind>(&self) -> Result<Arc<K::Handle>> {
        if !self.is_ready() {
            return Err(Error::NotReady("service registry is not ready".to_string()));
        }
        self.read_slot::<K, _>(|slot| slot.default_live().map(|(_, live)| live.handle.clone()))?
            .ok_or_else(|| not_initialized(K::TYPE))
    }

    /// Name of `K`'s default implementation, if initialized.
    pub fn default_name<K: ServiceKind>(&self) -> Option<String> {
        self.read_slot::<K, _>(|slot| slot.default_live().map(|(name, _)| name.to_string()))
            .ok()
            .flatten()
    }

    /// An instance of `K`'s default implementation with `overrides` applied
    /// over its init settings.
    ///
    /// Instances are cached by their merged settings with a sliding TTL.
    /// Empty overrides return the default instance itself.
    pub fn instance<K: ServiceKind>(&self, overrides: &Settings) -> Result<Arc<K::Handle>> {
        let (default, base, factory, cache) = self
            .read_slot::<K, _>(|slot| {
                let (name, live) = slot.default_live()?;
                let factory = slot.factories.get(name)?.clone();
                Some((
                    live.handle.clone(),
                    live.settings.clone(),
                    factory,
                    slot.cache.clone(),
                ))
            })?
            .ok_or_else(|| not_initialized(K::TYPE))?;

        if overrides.is_empty() {
            return Ok(default);
        }

        let context = self.context();
        cache.get_or_create(&base.merge(overrides), |settings| {
            factory(settings, &context)
        })
    }

    /// The context handed to factories.
    ///
    /// Its guard follows the Account default: services built before Account
    /// is initialized, or before it is re-initialized, see the current one.
    /// Without an Account nobody resolves to a team.
    pub fn context(&self) -> ServiceContext {
        ServiceContext::new(self.guard.clone())
    }

    fn refresh_accounts(&self) {
        let accounts = self
            .read_slot::<AccountService, _>(|slot| {
                slot.default_live().map(|(_, live)| live.handle.clone())
            })
            .ok()
            .flatten();
        match accounts {
            Some(accounts) => {
                log::debug!("guards now resolve teams via '{}'", accounts.implementation());
                self.guard.set_accounts(accounts);
            }
            None => self.guard.set_accounts(Arc::new(NoTeams)),
        }
    }

    /// Initialize every service in `config` and mark the registry ready.
    ///
    /// Account is initialized first so the other services are guarded by it.
    pub fn apply(&self, config: &RegistryConfig) -> Result<()> {
        if let Some(ttl) = config.instance_ttl_secs.map(Duration::from_secs) {
            for slot in self.slots.write().values_mut() {
                slot.reset_cache(ttl);
            }
        }

        if let Some(account) = config.services.get(&ServiceType::Account) {
            self.init_service(
                ServiceType::Account,
                &account.implementation,
                account.settings.clone(),
            )?;
        }
        for (ty, service) in &config.services {
            if *ty != ServiceType::Account {
                self.init_service(*ty, &service.implementation, service.settings.clone())?;
            }
        }

        self.mark_ready();
        Ok(())
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
        log::info!("service registry ready");
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Evict expired cached instances of every type.
    pub fn purge_expired(&self) -> usize {
        self.slots
            .read()
            .values()
            .map(|slot| slot.purge_expired())
            .sum()
    }

    /// Release every instance, cached ones included, and return to the
    /// not-ready state. Registered implementations are kept.
    pub fn shutdown(&self) {
        self.ready.store(false, Ordering::SeqCst);
        for slot in self.slots.write().values_mut() {
            slot.release_all();
        }
        self.refresh_accounts();
        log::info!("service registry shut down");
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

fn kind_mismatch<K: ServiceKind>() -> Error {
    Error::Configuration(format!(
        "service kind {} does not match the registry's {} slot",
        std::any::type_name::<K>(),
        K::TYPE
    ))
}

fn not_initialized(ty: ServiceType) -> Error {
    Error::NotReady(format!("no {} service has been initialized", ty))
}
