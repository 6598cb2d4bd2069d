//! Process-level cache connectors.

mod memory;

pub use memory::MemoryCache;
