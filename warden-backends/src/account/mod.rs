//! Account connectors.

mod memory;

pub use memory::StaticAccounts;
