//! Local filesystem adapter using tokio::fs.

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};

use dustbind_core::application::{
    ApplicationError,
    ports::{EntryKind, Filesystem},
};

/// Production filesystem implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, ApplicationError> {
        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| map_io_error(path, e, "read directory"))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| map_io_error(path, e, "read directory entry"))?
        {
            paths.push(entry.path());
        }
        Ok(paths)
    }

    async fn entry_kind(&self, path: &Path) -> Result<EntryKind, ApplicationError> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| map_io_error(path, e, "get metadata"))?;
        Ok(if metadata.is_file() {
            EntryKind::File
        } else if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        })
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, ApplicationError> {
        fs::read_to_string(path)
            .await
            .map_err(|e| map_io_error(path, e, "read file"))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), ApplicationError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| map_io_error(path, e, "create directory"))
    }

    async fn write_file(
        &self,
        path: &Path,
        content: &str,
        append: bool,
    ) -> Result<(), ApplicationError> {
        if !append {
            return fs::write(path, content)
                .await
                .map_err(|e| map_io_error(path, e, "write file"));
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| map_io_error(path, e, "open file for append"))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| map_io_error(path, e, "append to file"))?;
        file.flush()
            .await
            .map_err(|e| map_io_error(path, e, "flush file"))
    }
}

fn map_io_error(path: &Path, e: io::Error, operation: &str) -> ApplicationError {
    if e.kind() == io::ErrorKind::NotFound {
        return ApplicationError::NotFound {
            path: path.to_path_buf(),
        };
    }
    ApplicationError::Filesystem {
        path: path.to_path_buf(),
        reason: format!("Failed to {operation}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_then_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.js");
        let fs = LocalFilesystem::new();

        fs.write_file(&path, "one", false).await.unwrap();
        fs.write_file(&path, "two", true).await.unwrap();
        assert_eq!(fs.read_to_string(&path).await.unwrap(), "onetwo");

        fs.write_file(&path, "three", false).await.unwrap();
        assert_eq!(fs.read_to_string(&path).await.unwrap(), "three");
    }

    #[tokio::test]
    async fn missing_paths_are_not_found() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let fs = LocalFilesystem::new();

        assert!(matches!(
            fs.read_dir(&missing).await,
            Err(ApplicationError::NotFound { .. })
        ));
        assert!(matches!(
            fs.entry_kind(&missing).await,
            Err(ApplicationError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn entry_kinds_and_listing() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        fs.create_dir_all(&dir.path().join("sub/deeper")).await.unwrap();
        fs.write_file(&dir.path().join("a.dust"), "x", false)
            .await
            .unwrap();

        let mut entries = fs.read_dir(dir.path()).await.unwrap();
        entries.sort();
        assert_eq!(entries, vec![dir.path().join("a.dust"), dir.path().join("sub")]);
        assert_eq!(
            fs.entry_kind(&dir.path().join("sub")).await.unwrap(),
            EntryKind::Directory
        );
        assert_eq!(
            fs.entry_kind(&dir.path().join("a.dust")).await.unwrap(),
            EntryKind::File
        );
    }
}
