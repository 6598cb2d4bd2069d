//! Process-level cache.
//!
//! The cache is infrastructure shared by the runtime itself, not tenant data,
//! so it carries no ACLs and is not guarded.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{Connector, ServiceKind, ServiceType, Unconfigured};
use crate::error::Result;

#[async_trait]
pub trait Cache: Connector {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value`; it expires after `ttl` if given.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()>;

    /// Returns whether the key was present.
    async fn delete(&self, key: &str) -> Result<bool>;
}

pub struct CacheService;

impl ServiceKind for CacheService {
    const TYPE: ServiceType = ServiceType::Cache;
    type Handle = dyn Cache;

    fn unconfigured() -> Arc<dyn Cache> {
        Arc::new(Unconfigured::new(Self::TYPE))
    }
}
