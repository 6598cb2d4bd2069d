//! Reference connectors for the warden service registry.
//!
//! Each connector implements one service trait from `warden-core` and is
//! registered under a short implementation name:
//!
//! | Service        | Name                 | Type                       |
//! |----------------|----------------------|----------------------------|
//! | Account        | `in-process-memory`  | [`account::StaticAccounts`]|
//! | Storage        | `in-process-memory`  | [`storage::MemoryStorage`] |
//! | Storage        | `local-filesystem`   | [`storage::LocalStorage`]  |
//! | Vault, Managed | `in-process-memory`  | [`vault::MemoryVault`]     |
//! | Vault, Managed | `file-backed`        | [`vault::FileVault`]       |
//! | NamespacedKv   | `in-process-memory`  | [`kv::MemoryKv`]           |
//! | NamespacedKv   | `local-filesystem`   | [`kv::LocalKv`]            |
//! | VectorDb       | `in-process-memory`  | [`vector::MemoryVectors`]  |
//! | Cache          | `in-process-memory`  | [`cache::MemoryCache`]     |
//!
//! ```ignore
//! use warden_backends::register_all;
//! use warden_core::{RegistryConfig, ServiceRegistry};
//!
//! let config = RegistryConfig::load("~/.config/warden/services.json").await?;
//! let registry = ServiceRegistry::for_config(&config);
//! register_all(&registry);
//! registry.apply(&config)?;
//! ```
//!
//! # Features
//!
//! One feature per connector family, all on by default: `storage`, `vault`,
//! `kv`, `vector`, `cache`, `account`.

use warden_core::ServiceRegistry;

#[cfg(feature = "account")]
pub mod account;
#[cfg(feature = "cache")]
pub mod cache;
#[cfg(feature = "kv")]
pub mod kv;
#[cfg(feature = "storage")]
pub mod storage;
#[cfg(feature = "vault")]
pub mod vault;
#[cfg(feature = "vector")]
pub mod vector;

#[cfg(any(feature = "vault", feature = "kv"))]
mod json_file;
#[cfg(any(feature = "storage", feature = "vault", feature = "kv"))]
mod paths;

/// Register every enabled connector with `registry`.
///
/// Nothing is initialized; that happens in [`ServiceRegistry::apply`] or
/// [`ServiceRegistry::init`].
pub fn register_all(registry: &ServiceRegistry) {
    #[cfg(feature = "account")]
    {
        use warden_core::AccountService;
        registry.register::<AccountService, _>(
            account::StaticAccounts::NAME,
            account::StaticAccounts::factory,
        );
    }

    #[cfg(feature = "storage")]
    {
        use warden_core::StorageService;
        registry.register::<StorageService, _>(
            storage::MemoryStorage::NAME,
            storage::MemoryStorage::factory,
        );
        registry.register::<StorageService, _>(
            storage::LocalStorage::NAME,
            storage::LocalStorage::factory,
        );
    }

    #[cfg(feature = "vault")]
    {
        use warden_core::{ManagedVaultService, VaultService};
        registry.register::<VaultService, _>(vault::MemoryVault::NAME, vault::MemoryVault::factory);
        registry.register::<VaultService, _>(vault::FileVault::NAME, vault::FileVault::factory);
        registry.register::<ManagedVaultService, _>(
            vault::MemoryVault::NAME,
            vault::MemoryVault::factory,
        );
        registry.register::<ManagedVaultService, _>(
            vault::FileVault::NAME,
            vault::FileVault::factory,
        );
    }

    #[cfg(feature = "kv")]
    {
        use warden_core::NamespacedKvService;
        registry.register::<NamespacedKvService, _>(kv::MemoryKv::NAME, kv::MemoryKv::factory);
        registry.register::<NamespacedKvService, _>(kv::LocalKv::NAME, kv::LocalKv::factory);
    }

    #[cfg(feature = "vector")]
    {
        use warden_core::VectorDbService;
        registry.register::<VectorDbService, _>(
            vector::MemoryVectors::NAME,
            vector::MemoryVectors::factory,
        );
    }

    #[cfg(feature = "cache")]
    {
        use warden_core::CacheService;
        registry.register::<CacheService, _>(cache::MemoryCache::NAME, cache::MemoryCache::factory);
    }

    log::debug!("registered built-in connectors");
}
