//! Secret vault connectors.
//!
//! Both implementations serve either vault service type.

use serde::{Deserialize, Serialize};

mod file;
mod memory;

pub use file::FileVault;
pub use memory::MemoryVault;

/// A secret and its serialized ACL.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SecretRecord {
    value: String,
    acl: String,
}
