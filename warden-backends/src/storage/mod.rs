//! Object storage connectors.
//!
//! - [`MemoryStorage`] (`"in-process-memory"`) - objects in a map
//! - [`LocalStorage`] (`"local-filesystem"`) - objects as files under a root
//!   directory, ACLs as sidecar files under `root/.acl/`

mod local;
mod memory;

pub use local::LocalStorage;
pub use memory::MemoryStorage;
