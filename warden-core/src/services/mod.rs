//! Service contracts.
//!
//! Each service type has one handle trait (what callers use) and, for
//! resource-bearing services, one driver trait (what backends implement).
//! Handle traits are implemented for [`Guarded<D>`](crate::Guarded) over any
//! matching driver, which is how every operation ends up passing through the
//! guard.
//!
//! | Service | Handle | Driver |
//! |---------|--------|--------|
//! | Storage | [`Storage`] | [`StorageDriver`] |
//! | Vault, ManagedVault | [`Vault`] | [`VaultDriver`] |
//! | NamespacedKv | [`NamespacedKv`] | [`KvDriver`] |
//! | Code | [`CodeRunner`] | [`CodeDriver`] |
//! | VectorDb | [`VectorDb`] | [`VectorDriver`] |
//! | Cache | [`Cache`] | - |
//! | Account | [`Account`] | - |

pub mod account;
pub mod cache;
pub mod code;
pub mod kv;
pub mod storage;
mod unconfigured;
pub mod vault;
pub mod vector;

pub use account::{Account, AccountService, NoTeams};
pub use cache::{Cache, CacheService};
pub use code::{CodeDriver, CodeJob, CodeOutput, CodeRunner, CodeService};
pub use kv::{KvDriver, NamespacedKv, NamespacedKvService};
pub use storage::{ObjectInfo, Storage, StorageDriver, StorageService};
pub use unconfigured::Unconfigured;
pub use vault::{ManagedVaultService, Vault, VaultDriver, VaultService};
pub use vector::{VectorDb, VectorDbService, VectorDriver, VectorMatch, VectorPoint};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::access::{AccessLevel, AccessList, AccessRequest, Backend, Guarded};
use crate::error::{BackendError, Result};
use crate::identity::Role;

/// The kinds of service the registry resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    Account,
    Storage,
    Vault,
    ManagedVault,
    NamespacedKv,
    Code,
    VectorDb,
    Cache,
}

impl ServiceType {
    pub const ALL: [ServiceType; 8] = [
        ServiceType::Account,
        ServiceType::Storage,
        ServiceType::Vault,
        ServiceType::ManagedVault,
        ServiceType::NamespacedKv,
        ServiceType::Code,
        ServiceType::VectorDb,
        ServiceType::Cache,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Account => "account",
            ServiceType::Storage => "storage",
            ServiceType::Vault => "vault",
            ServiceType::ManagedVault => "managed-vault",
            ServiceType::NamespacedKv => "namespaced-kv",
            ServiceType::Code => "code",
            ServiceType::VectorDb => "vector-db",
            ServiceType::Cache => "cache",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| format!("unknown service type '{}'", s))
    }
}

/// Base trait of every service handle.
pub trait Connector: Send + Sync {
    /// Registry name of the implementation behind this handle.
    fn implementation(&self) -> &str;

    /// Release live sockets/handles. Called on cache eviction and shutdown.
    fn release(&self) {}
}

/// Binds a [`ServiceType`] to the trait object callers receive for it.
///
/// Implemented by zero-sized markers such as [`StorageService`]; the registry
/// API is generic over these markers.
pub trait ServiceKind: Send + Sync + 'static {
    const TYPE: ServiceType;

    /// The handle trait object, e.g. `dyn Storage`.
    type Handle: ?Sized + Connector + 'static;

    /// The inert stand-in returned before anything is initialized.
    fn unconfigured() -> Arc<Self::Handle>;
}

/// Operations shared by every service whose data carries an ACL.
#[async_trait]
pub trait ResourceService: Connector {
    /// The ACL of an existing resource. Requires Read.
    async fn access_list(&self, request: &AccessRequest) -> Result<AccessList>;

    /// Grant `levels` on an existing resource to `(role, id)`. Requires Owner.
    ///
    /// Grants only ever add levels. Returns the updated ACL.
    async fn share(
        &self,
        request: &AccessRequest,
        role: Role,
        id: &str,
        levels: Vec<AccessLevel>,
    ) -> Result<AccessList>;
}

impl<D: Backend> Connector for Guarded<D> {
    fn implementation(&self) -> &str {
        self.driver().implementation()
    }

    fn release(&self) {
        self.driver().release()
    }
}

#[async_trait]
impl<D: Backend> ResourceService for Guarded<D> {
    async fn access_list(&self, request: &AccessRequest) -> Result<AccessList> {
        self.run(request, AccessLevel::Read, |_, resolved| async move {
            if resolved.is_new() {
                return Err(BackendError::NotFound(request.resource().to_string()));
            }
            Ok(resolved.into_acl())
        })
        .await
    }

    async fn share(
        &self,
        request: &AccessRequest,
        role: Role,
        id: &str,
        levels: Vec<AccessLevel>,
    ) -> Result<AccessList> {
        self.run(request, AccessLevel::Owner, |driver, resolved| async move {
            if resolved.is_new() {
                return Err(BackendError::NotFound(request.resource().to_string()));
            }
            let mut acl = resolved.into_acl();
            acl.add_access(role, id, levels);
            driver
                .store_acl(request.resource(), &acl.serialized())
                .await?;
            Ok(acl)
        })
        .await
    }
}
