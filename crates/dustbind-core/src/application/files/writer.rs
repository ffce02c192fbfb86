use std::{path::PathBuf, sync::Arc};

use tracing::{error, instrument};

use crate::application::{ApplicationError, ports::Filesystem};

/// Write `content` to `path`, creating parent directories first.
///
/// Truncates unless `append` is set. Resolves with the content written.
#[instrument(skip(filesystem, content), fields(bytes = content.len()))]
pub async fn write_to_file(
    filesystem: Arc<dyn Filesystem>,
    path: PathBuf,
    content: String,
    append: bool,
) -> Result<String, ApplicationError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = filesystem.create_dir_all(parent).await {
            error!(path = %parent.display(), error = %e, "failed to create directory");
            return Err(e);
        }
    }

    if let Err(e) = filesystem.write_file(&path, &content, append).await {
        error!(path = %path.display(), error = %e, "failed to write file");
        return Err(e);
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockFilesystem;
    use mockall::predicate::{always, eq};
    use std::path::Path;

    #[tokio::test]
    async fn creates_parents_then_writes() {
        let mut fs = MockFilesystem::new();
        fs.expect_create_dir_all()
            .withf(|p| p == Path::new("out/b"))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_write_file()
            .with(always(), eq("x"), eq(false))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let written = write_to_file(Arc::new(fs), PathBuf::from("out/b/c.js"), "x".into(), false)
            .await
            .unwrap();
        assert_eq!(written, "x");
    }

    #[tokio::test]
    async fn directory_failure_skips_write() {
        let mut fs = MockFilesystem::new();
        fs.expect_create_dir_all()
            .returning(|p| Err(ApplicationError::filesystem(p, "read-only")));
        fs.expect_write_file().never();

        let err = write_to_file(Arc::new(fs), PathBuf::from("ro/a.js"), "x".into(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Filesystem { .. }));
    }

    #[tokio::test]
    async fn bare_file_name_needs_no_directory() {
        let mut fs = MockFilesystem::new();
        fs.expect_create_dir_all().never();
        fs.expect_write_file()
            .with(always(), eq("tail"), eq(true))
            .returning(|_, _, _| Ok(()));

        write_to_file(Arc::new(fs), PathBuf::from("a.js"), "tail".into(), true)
            .await
            .unwrap();
    }
}
