//! Namespaced key-value connectors.
//!
//! Resources are `{namespace}:{key}`; drivers split them back apart.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use warden_core::{resource, BackendError};

mod local;
mod memory;

pub use local::LocalKv;
pub use memory::MemoryKv;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KvRecord {
    value: Value,
    acl: String,
}

fn split(resource_id: &str) -> Result<(&str, &str), BackendError> {
    resource::split_namespaced(resource_id).map_err(|e| BackendError::Other(e.to_string()))
}
