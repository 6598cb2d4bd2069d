use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use warden_core::{
    AccessList, Backend, BackendError, ServiceContext, Settings, VectorDb, VectorDriver,
    VectorMatch, VectorPoint,
};

struct Collection {
    acl: String,
    dimension: usize,
    points: BTreeMap<String, VectorPoint>,
}

/// Exact nearest-neighbour search over in-memory collections.
///
/// Scores are cosine similarity. Every point in a collection must have the
/// dimension of the first point written to it.
#[derive(Default)]
pub struct MemoryVectors {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectors {
    pub const NAME: &'static str = "in-process-memory";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(
        _settings: &Settings,
        ctx: &ServiceContext,
    ) -> warden_core::Result<Arc<dyn VectorDb>> {
        Ok(Arc::new(ctx.guarded(Self::new())))
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn dimension_mismatch(collection: &str, expected: usize, got: usize) -> BackendError {
    BackendError::Other(format!(
        "collection '{}' has dimension {}, got {}",
        collection, expected, got
    ))
}

#[async_trait]
impl Backend for MemoryVectors {
    fn implementation(&self) -> &str {
        Self::NAME
    }

    async fn load_acl(&self, resource: &str) -> Result<Option<String>, BackendError> {
        Ok(self.collections.read().get(resource).map(|c| c.acl.clone()))
    }

    async fn store_acl(&self, resource: &str, serialized: &str) -> Result<(), BackendError> {
        match self.collections.write().get_mut(resource) {
            Some(collection) => {
                collection.acl = serialized.to_string();
                Ok(())
            }
            None => Err(BackendError::NotFound(resource.to_string())),
        }
    }
}

#[async_trait]
impl VectorDriver for MemoryVectors {
    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        acl: Option<&AccessList>,
    ) -> Result<usize, BackendError> {
        let Some(first) = points.first() else {
            return Ok(0);
        };
        let mut collections = self.collections.write();
        let dimension = collections
            .get(collection)
            .map_or(first.vector.len(), |c| c.dimension);
        if dimension == 0 {
            return Err(BackendError::Other("vectors must not be empty".to_string()));
        }
        if let Some(bad) = points.iter().find(|p| p.vector.len() != dimension) {
            return Err(dimension_mismatch(collection, dimension, bad.vector.len()));
        }

        let target = collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection {
                acl: acl.map(AccessList::serialized).unwrap_or_default(),
                dimension,
                points: BTreeMap::new(),
            });
        if let Some(acl) = acl {
            target.acl = acl.serialized();
        }
        let written = points.len();
        for point in points {
            target.points.insert(point.id.clone(), point);
        }
        Ok(written)
    }

    async fn nearest(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorMatch>, BackendError> {
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| BackendError::NotFound(collection.to_string()))?;
        if vector.len() != target.dimension {
            return Err(dimension_mismatch(collection, target.dimension, vector.len()));
        }

        let mut matches: Vec<VectorMatch> = target
            .points
            .values()
            .map(|p| VectorMatch {
                id: p.id.clone(),
                score: cosine(&p.vector, vector),
                payload: p.payload.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn remove_points(&self, collection: &str, ids: &[String]) -> Result<usize, BackendError> {
        let mut collections = self.collections.write();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| BackendError::NotFound(collection.to_string()))?;
        Ok(ids
            .iter()
            .filter(|id| target.points.remove(id.as_str()).is_some())
            .count())
    }
}
