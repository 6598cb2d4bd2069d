use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{
    Account, Cache, CodeJob, CodeOutput, CodeRunner, Connector, NamespacedKv, ObjectInfo,
    ResourceService, ServiceType, Storage, Vault, VectorDb, VectorMatch, VectorPoint,
};
use crate::access::{AccessLevel, AccessList, AccessRequest};
use crate::error::{Error, Result};
use crate::identity::{Candidate, Role};

/// Stand-in handed out for a service type before anything is initialized.
///
/// Every operation fails with [`Error::NotReady`].
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured {
    service: ServiceType,
}

impl Unconfigured {
    pub fn new(service: ServiceType) -> Self {
        Self { service }
    }

    pub fn service(&self) -> ServiceType {
        self.service
    }

    fn not_ready<T>(&self) -> Result<T> {
        Err(Error::NotReady(format!(
            "no {} service has been initialized",
            self.service
        )))
    }
}

impl Connector for Unconfigured {
    fn implementation(&self) -> &str {
        "unconfigured"
    }
}

#[async_trait]
impl ResourceService for Unconfigured {
    async fn access_list(&self, _request: &AccessRequest) -> Result<AccessList> {
        self.not_ready()
    }

    async fn share(
        &self,
        _request: &AccessRequest,
        _role: Role,
        _id: &str,
        _levels: Vec<AccessLevel>,
    ) -> Result<AccessList> {
        self.not_ready()
    }
}

#[async_trait]
impl Account for Unconfigured {
    async fn team_of(&self, _candidate: &Candidate) -> Result<Option<String>> {
        self.not_ready()
    }
}

#[async_trait]
impl Storage for Unconfigured {
    async fn get(&self, _request: &AccessRequest) -> Result<Vec<u8>> {
        self.not_ready()
    }

    async fn put(&self, _request: &AccessRequest, _data: Vec<u8>) -> Result<ObjectInfo> {
        self.not_ready()
    }

    async fn delete(&self, _request: &AccessRequest) -> Result<()> {
        self.not_ready()
    }

    async fn stat(&self, _request: &AccessRequest) -> Result<ObjectInfo> {
        self.not_ready()
    }

    async fn list(&self, _candidate: &Candidate, _prefix: &str) -> Result<Vec<String>> {
        self.not_ready()
    }
}

#[async_trait]
impl Vault for Unconfigured {
    async fn reveal(&self, _request: &AccessRequest) -> Result<String> {
        self.not_ready()
    }

    async fn store(&self, _request: &AccessRequest, _value: String) -> Result<()> {
        self.not_ready()
    }

    async fn remove(&self, _request: &AccessRequest) -> Result<()> {
        self.not_ready()
    }
}

#[async_trait]
impl NamespacedKv for Unconfigured {
    async fn get(&self, _request: &AccessRequest) -> Result<Option<Value>> {
        self.not_ready()
    }

    async fn set(&self, _request: &AccessRequest, _value: Value) -> Result<()> {
        self.not_ready()
    }

    async fn delete(&self, _request: &AccessRequest) -> Result<bool> {
        self.not_ready()
    }

    async fn keys(&self, _candidate: &Candidate, _namespace: &str) -> Result<Vec<String>> {
        self.not_ready()
    }
}

#[async_trait]
impl CodeRunner for Unconfigured {
    async fn execute(&self, _request: &AccessRequest, _job: CodeJob) -> Result<CodeOutput> {
        self.not_ready()
    }
}

#[async_trait]
impl VectorDb for Unconfigured {
    async fn upsert(&self, _request: &AccessRequest, _points: Vec<VectorPoint>) -> Result<usize> {
        self.not_ready()
    }

    async fn query(
        &self,
        _request: &AccessRequest,
        _vector: Vec<f32>,
        _limit: usize,
    ) -> Result<Vec<VectorMatch>> {
        self.not_ready()
    }

    async fn remove(&self, _request: &AccessRequest, _ids: Vec<String>) -> Result<usize> {
        self.not_ready()
    }
}

#[async_trait]
impl Cache for Unconfigured {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        self.not_ready()
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> Result<()> {
        self.not_ready()
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        self.not_ready()
    }
}
