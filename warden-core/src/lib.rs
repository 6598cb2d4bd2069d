//! # Warden
//!
//! Authorization and backend abstraction for multi-tenant service runtimes.
//!
//! Many independent callers (users, teams and autonomous agents) share a set
//! of pluggable storage-like services: object storage, secret vaults,
//! namespaced key-value stores, code execution and vector search. Warden
//! gives every one of those services the same security contract and lets
//! callers address them by type instead of by implementation.
//!
//! ## The pieces
//!
//! - [`Candidate`] - who is asking (a [`Role`] plus an id)
//! - [`AccessList`] - the per-resource policy, persisted with the resource
//! - [`AccessRequest`] / [`AccessTicket`] - one authorization query and its
//!   outcome
//! - [`Guard`] / [`Guarded`] - the single enforcement point every backend
//!   operation passes through
//! - [`ServiceRegistry`] - resolves "the Storage service" to a configured,
//!   possibly cached, implementation
//!
//! ## Access model
//!
//! A resource's ACL maps `(role, id)` to a set of [`AccessLevel`]s. A request
//! is granted when the candidate's own entry, or the entry of the team the
//! candidate belongs to, holds a level implying the requested one. `Owner`
//! implies every level; `Read` and `Write` are independent.
//!
//! Resources are created on first write: a resource with no stored ACL grants
//! its creator Owner, and a team declared with
//! [`AccessRequest::with_team`] receives Read.
//!
//! ```ignore
//! use warden_core::{Candidate, ServiceRegistry, StorageService};
//!
//! # async fn example(registry: &ServiceRegistry) -> warden_core::Result<()> {
//! let storage = registry.require::<StorageService>()?;
//!
//! let agent = Candidate::agent("agent-123");
//! storage
//!     .put(&agent.write("teams/9/report.txt").with_team("9"), b"q3".to_vec())
//!     .await?;
//!
//! // Another member of team 9 can read it; anyone else is denied
//! let report = storage
//!     .get(&Candidate::agent("agent-777").read("teams/9/report.txt"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Writing a connector
//!
//! Implement [`Backend`] (ACL load/store) plus the driver trait of the
//! service, e.g. [`StorageDriver`]. Register a factory that wraps the driver
//! with [`ServiceContext::guarded`]; the service trait is implemented for the
//! wrapper, so there is no way to reach the driver without passing the guard.
//!
//! ## Feature Flags
//!
//! - `test-utils` - [`test_utils::RecordingBackend`] and
//!   [`test_utils::StubAccounts`] for downstream tests

pub mod access;
pub mod error;
pub mod identity;
pub mod registry;
pub mod resource;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use access::{
    AccessLevel, AccessList, AccessRequest, AccessTicket, AclEntry, Backend, Guard, Guarded,
    ResolvedAcl,
};
pub use error::{BackendError, Error, Result};
pub use identity::{Candidate, Role};
pub use registry::{
    Factory, InstanceCache, RegistryConfig, ServiceConfig, ServiceContext, ServiceRegistry,
    Settings, DEFAULT_INSTANCE_TTL,
};
pub use services::{
    Account, AccountService, Cache, CacheService, CodeDriver, CodeJob, CodeOutput, CodeRunner,
    CodeService, Connector, KvDriver, ManagedVaultService, NamespacedKv, NamespacedKvService,
    NoTeams, ObjectInfo, ResourceService, ServiceKind, ServiceType, Storage, StorageDriver,
    StorageService, Unconfigured, Vault, VaultDriver, VaultService, VectorDb, VectorDbService,
    VectorDriver, VectorMatch, VectorPoint,
};
