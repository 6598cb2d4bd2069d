//! Vector search connectors.

mod memory;

pub use memory::MemoryVectors;
