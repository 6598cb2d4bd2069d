//! Test utilities for warden-core.
//!
//! In-memory doubles for exercising the guard and the registry without a
//! real connector.
//!
//! Enable with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! warden-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden_core::test_utils::{RecordingBackend, StubAccounts};
//! use warden_core::{Candidate, Guard, Guarded, Storage};
//!
//! # async fn example() -> warden_core::Result<()> {
//! let accounts = StubAccounts::new().with_member("agent-123", "9");
//! let storage = Guarded::new(RecordingBackend::new(), Guard::new(Arc::new(accounts)));
//!
//! let agent = Candidate::agent("agent-123");
//! storage.put(&agent.write("notes.txt"), b"hello".to_vec()).await?;
//! assert_eq!(storage.get(&agent.read("notes.txt")).await?, b"hello");
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::access::{AccessList, Backend};
use crate::error::{BackendError, Result};
use crate::identity::{Candidate, Role};
use crate::services::{
    Account, CodeDriver, CodeJob, CodeOutput, Connector, ObjectInfo, StorageDriver,
};

#[derive(Default)]
struct Recorded {
    objects: Mutex<BTreeMap<String, (Vec<u8>, DateTime<Utc>)>>,
    acls: Mutex<HashMap<String, String>>,
    acl_loads: AtomicUsize,
    writes: AtomicUsize,
    releases: AtomicUsize,
}

/// An in-memory storage and code driver that counts what it is asked to do.
///
/// Clones share state, so a test can keep one clone for assertions while the
/// other is wrapped in a [`Guarded`](crate::Guarded) or handed to a factory.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    inner: Arc<Recorded>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing resource with `acl`.
    pub fn with_acl(self, resource: impl Into<String>, acl: AccessList) -> Self {
        self.with_raw_acl(resource, &acl.serialized())
    }

    /// Seed an existing resource with raw, possibly malformed, metadata.
    pub fn with_raw_acl(self, resource: impl Into<String>, raw: &str) -> Self {
        self.inner.acls.lock().insert(resource.into(), raw.to_string());
        self
    }

    /// Number of ACL lookups performed.
    pub fn acl_loads(&self) -> usize {
        self.inner.acl_loads.load(Ordering::SeqCst)
    }

    /// Number of data writes performed (objects and code jobs).
    pub fn writes(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Number of times [`Backend::release`] was called.
    pub fn releases(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }

    fn info(resource: &str, data: &[u8], modified_at: DateTime<Utc>) -> ObjectInfo {
        ObjectInfo {
            resource: resource.to_string(),
            size: data.len() as u64,
            modified_at,
        }
    }

    fn persist_acl(&self, resource: &str, acl: Option<&AccessList>) {
        if let Some(acl) = acl {
            self.inner
                .acls
                .lock()
                .insert(resource.to_string(), acl.serialized());
        }
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    fn implementation(&self) -> &str {
        "recording"
    }

    async fn load_acl(&self, resource: &str) -> std::result::Result<Option<String>, BackendError> {
        self.inner.acl_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.acls.lock().get(resource).cloned())
    }

    async fn store_acl(&self, resource: &str, serialized: &str) -> std::result::Result<(), BackendError> {
        self.inner
            .acls
            .lock()
            .insert(resource.to_string(), serialized.to_string());
        Ok(())
    }

    fn release(&self) {
        self.inner.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageDriver for RecordingBackend {
    async fn read_object(&self, resource: &str) -> std::result::Result<Vec<u8>, BackendError> {
        self.inner
            .objects
            .lock()
            .get(resource)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    async fn write_object(
        &self,
        resource: &str,
        data: Vec<u8>,
        acl: Option<&AccessList>,
    ) -> std::result::Result<ObjectInfo, BackendError> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let info = Self::info(resource, &data, now);
        self.inner
            .objects
            .lock()
            .insert(resource.to_string(), (data, now));
        self.persist_acl(resource, acl);
        Ok(info)
    }

    async fn delete_object(&self, resource: &str) -> std::result::Result<(), BackendError> {
        self.inner.acls.lock().remove(resource);
        self.inner
            .objects
            .lock()
            .remove(resource)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    async fn stat_object(&self, resource: &str) -> std::result::Result<ObjectInfo, BackendError> {
        self.inner
            .objects
            .lock()
            .get(resource)
            .map(|(data, at)| Self::info(resource, data, *at))
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    async fn list_objects(&self, prefix: &str) -> std::result::Result<Vec<String>, BackendError> {
        Ok(self
            .inner
            .objects
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Echoes the job's source back as stdout.
#[async_trait]
impl CodeDriver for RecordingBackend {
    async fn run_job(
        &self,
        workspace: &str,
        job: CodeJob,
        acl: Option<&AccessList>,
    ) -> std::result::Result<CodeOutput, BackendError> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.persist_acl(workspace, acl);
        Ok(CodeOutput {
            stdout: job.source,
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

/// An account directory with fixed memberships that counts lookups.
#[derive(Debug, Default)]
pub struct StubAccounts {
    members: HashMap<String, String>,
    lookups: AtomicUsize,
}

impl StubAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, member: impl Into<String>, team: impl Into<String>) -> Self {
        self.members.insert(member.into(), team.into());
        self
    }

    /// Number of `team_of` calls made.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Connector for StubAccounts {
    fn implementation(&self) -> &str {
        "stub"
    }
}

#[async_trait]
impl Account for StubAccounts {
    async fn team_of(&self, candidate: &Candidate) -> Result<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(match candidate.role() {
            Role::Team => Some(candidate.id().to_string()),
            _ => self.members.get(candidate.id()).cloned(),
        })
    }
}
