//! Application ports (traits) for external dependencies.
//!
//! Driven ports only: the adapter service calls them, `dustbind-adapters`
//! implements them.
//!
//! - `Filesystem`: directory listing, reads, writes, directory creation
//! - `ConfigStore`: read-only key-path settings lookup
//! - `ExtensionLoader`: turns manifest text into extension definitions

pub mod output;

pub use output::{ConfigStore, EntryKind, ExtensionLoader, Filesystem};

#[cfg(test)]
pub use output::{MockConfigStore, MockFilesystem};
