//! Driven (output) ports, implemented by infrastructure.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ApplicationError;
use crate::domain::ExtensionDefinition;

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Sockets, devices, and anything else that is neither.
    Other,
}

/// Port for filesystem operations.
///
/// Implemented by:
/// - `dustbind_adapters::filesystem::LocalFilesystem` (production, tokio::fs)
/// - `dustbind_adapters::filesystem::MemoryFilesystem` (testing)
///
/// Missing paths must surface as [`ApplicationError::NotFound`] so callers
/// can tell them apart from other failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Entries of a directory, in enumeration order.
    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, ApplicationError>;

    /// Kind of the entry at `path`, following symlinks.
    async fn entry_kind(&self, path: &Path) -> Result<EntryKind, ApplicationError>;

    async fn read_to_string(&self, path: &Path) -> Result<String, ApplicationError>;

    /// Create a directory and all parent directories. Succeeds if it exists.
    async fn create_dir_all(&self, path: &Path) -> Result<(), ApplicationError>;

    /// Write (truncating) or append `content` to the file at `path`.
    async fn write_file(
        &self,
        path: &Path,
        content: &str,
        append: bool,
    ) -> Result<(), ApplicationError>;
}

/// Read-only host configuration addressed by dotted key paths.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigStore: Send + Sync {
    /// Value at `key_path` (e.g. `engines.dust.cache`), or `None` if unset.
    fn get(&self, key_path: &str) -> Option<Value>;
}

/// Port for extension manifests.
pub trait ExtensionLoader: Send + Sync {
    /// Suffix of the files this loader understands, including the dot.
    fn file_extension(&self) -> &str;

    /// Parse the manifest at `path` whose content is `source`.
    fn parse(&self, path: &Path, source: &str)
    -> Result<Vec<ExtensionDefinition>, ApplicationError>;
}
