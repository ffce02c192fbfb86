//! In-memory filesystem adapter for testing.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;

use dustbind_core::application::{
    ApplicationError,
    ports::{EntryKind, Filesystem},
};

/// In-memory filesystem for testing.
///
/// Directories are implied by the files inserted under them. Listing order
/// is lexical.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, String>,
    directories: BTreeSet<PathBuf>,
    writes: usize,
}

impl MemoryFilesystemInner {
    fn add_directories(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryFilesystemInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryFilesystemInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a file, creating its parent directories. Not counted as a write.
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        {
            let mut inner = self.write();
            if let Some(parent) = path.parent() {
                inner.add_directories(parent);
            }
            inner.files.insert(path, content.into());
        }
        self
    }

    /// Read a file's content (testing helper).
    pub fn read_file(&self, path: &Path) -> Option<String> {
        self.read().files.get(path).cloned()
    }

    /// Number of `write_file` calls that succeeded.
    pub fn write_count(&self) -> usize {
        self.read().writes
    }
}

#[async_trait]
impl Filesystem for MemoryFilesystem {
    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, ApplicationError> {
        let inner = self.read();
        if !inner.directories.contains(path) {
            return Err(ApplicationError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let children = inner
            .directories
            .iter()
            .chain(inner.files.keys())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect::<BTreeSet<_>>();
        Ok(children.into_iter().collect())
    }

    async fn entry_kind(&self, path: &Path) -> Result<EntryKind, ApplicationError> {
        let inner = self.read();
        if inner.files.contains_key(path) {
            Ok(EntryKind::File)
        } else if inner.directories.contains(path) {
            Ok(EntryKind::Directory)
        } else {
            Err(ApplicationError::NotFound {
                path: path.to_path_buf(),
            })
        }
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, ApplicationError> {
        self.read_file(path).ok_or_else(|| ApplicationError::NotFound {
            path: path.to_path_buf(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), ApplicationError> {
        let mut inner = self.write();
        if inner.files.contains_key(path) {
            return Err(ApplicationError::filesystem(path, "a file exists at this path"));
        }
        inner.add_directories(path);
        Ok(())
    }

    async fn write_file(
        &self,
        path: &Path,
        content: &str,
        append: bool,
    ) -> Result<(), ApplicationError> {
        let mut inner = self.write();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.directories.contains(parent) {
                return Err(ApplicationError::filesystem(
                    path,
                    "Parent directory does not exist",
                ));
            }
        }

        let entry = inner.files.entry(path.to_path_buf()).or_default();
        if append {
            entry.push_str(content);
        } else {
            *entry = content.to_string();
        }
        inner.writes += 1;
        Ok(())
    }
}
