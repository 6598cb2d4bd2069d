//! Vector search. A collection is one resource.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{ResourceService, ServiceKind, ServiceType, Unconfigured};
use crate::access::{AccessLevel, AccessList, AccessRequest, Backend, Guarded};
use crate::error::{BackendError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub payload: Value,
}

impl VectorPoint {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

#[async_trait]
pub trait VectorDriver: Backend {
    /// Insert or replace points. `acl` is `Some` when the collection is new.
    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        acl: Option<&AccessList>,
    ) -> std::result::Result<usize, BackendError>;

    /// The `limit` best matches, best first.
    async fn nearest(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> std::result::Result<Vec<VectorMatch>, BackendError>;

    /// Returns how many points were removed.
    async fn remove_points(
        &self,
        collection: &str,
        ids: &[String],
    ) -> std::result::Result<usize, BackendError>;
}

#[async_trait]
pub trait VectorDb: ResourceService {
    /// Requires Write. Returns the number of points written.
    async fn upsert(&self, request: &AccessRequest, points: Vec<VectorPoint>) -> Result<usize>;

    /// Requires Read.
    async fn query(
        &self,
        request: &AccessRequest,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<VectorMatch>>;

    /// Requires Write.
    async fn remove(&self, request: &AccessRequest, ids: Vec<String>) -> Result<usize>;
}

#[async_trait]
impl<D: VectorDriver> VectorDb for Guarded<D> {
    async fn upsert(&self, request: &AccessRequest, points: Vec<VectorPoint>) -> Result<usize> {
        self.run(request, AccessLevel::Write, |driver, resolved| async move {
            let created = resolved.is_new().then(|| resolved.into_acl());
            driver
                .upsert_points(request.resource(), points, created.as_ref())
                .await
        })
        .await
    }

    async fn query(
        &self,
        request: &AccessRequest,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<VectorMatch>> {
        self.run(request, AccessLevel::Read, |driver, _| async move {
            driver.nearest(request.resource(), &vector, limit).await
        })
        .await
    }

    async fn remove(&self, request: &AccessRequest, ids: Vec<String>) -> Result<usize> {
        self.run(request, AccessLevel::Write, |driver, _| async move {
            driver.remove_points(request.resource(), &ids).await
        })
        .await
    }
}

pub struct VectorDbService;

impl ServiceKind for VectorDbService {
    const TYPE: ServiceType = ServiceType::VectorDb;
    type Handle = dyn VectorDb;

    fn unconfigured() -> Arc<dyn VectorDb> {
        Arc::new(Unconfigured::new(Self::TYPE))
    }
}
