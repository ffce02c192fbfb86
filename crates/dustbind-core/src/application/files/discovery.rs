use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tracing::instrument;

use super::join::join_all_detached;
use crate::application::{
    ApplicationError,
    ports::{EntryKind, Filesystem},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Accepted suffixes including the dot (`.dust`). Empty accepts all.
    pub extensions: Vec<String>,
    pub recursive: bool,
    /// Fail with `NotFound` instead of returning nothing for a missing
    /// directory.
    pub fail_if_not_found: bool,
}

impl DiscoveryOptions {
    pub fn recursive(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            recursive: true,
            fail_if_not_found: false,
        }
    }
}

/// True if `path` ends with one of `extensions` (case-sensitive), or if
/// `extensions` is empty.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

/// List the files under `dir` matching `options`.
///
/// Order follows the filesystem's enumeration and is not sorted.
#[instrument(skip(filesystem, options), fields(recursive = options.recursive))]
pub async fn read_directory(
    filesystem: Arc<dyn Filesystem>,
    dir: &Path,
    options: &DiscoveryOptions,
) -> Result<Vec<PathBuf>, ApplicationError> {
    walk(filesystem, dir.to_path_buf(), Arc::new(options.clone())).await
}

fn walk(
    filesystem: Arc<dyn Filesystem>,
    dir: PathBuf,
    options: Arc<DiscoveryOptions>,
) -> BoxFuture<'static, Result<Vec<PathBuf>, ApplicationError>> {
    Box::pin(async move {
        let entries = match filesystem.read_dir(&dir).await {
            Ok(entries) => entries,
            Err(ApplicationError::NotFound { .. }) if !options.fail_if_not_found => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let visits = entries.into_iter().map(|entry| {
            let filesystem = Arc::clone(&filesystem);
            let options = Arc::clone(&options);
            async move {
                match filesystem.entry_kind(&entry).await? {
                    EntryKind::Directory if options.recursive => {
                        walk(filesystem, entry, options).await
                    }
                    EntryKind::File if has_extension(&entry, &options.extensions) => {
                        Ok(vec![entry])
                    }
                    _ => Ok(Vec::new()),
                }
            }
        });

        let nested = join_all_detached(visits).await?;
        Ok(nested.into_iter().flatten().collect())
    })
}
