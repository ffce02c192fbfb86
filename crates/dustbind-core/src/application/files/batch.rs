use std::{future::Future, path::PathBuf, sync::Arc};

use tracing::{debug, instrument};

use super::discovery::has_extension;
use super::join::join_all_detached;
use crate::application::{
    ApplicationError,
    ports::{EntryKind, Filesystem},
};

/// Run `callback` for each of `files` that is a regular file with one of
/// `extensions`, concurrently, and collect the results in input order.
///
/// Paths that are not regular files (directories, missing paths) are
/// skipped. With no callback nothing is touched and the result is empty.
/// The first callback failure fails the batch.
#[instrument(skip_all, fields(files = files.len()))]
pub async fn read_files<T, E, F, Fut>(
    filesystem: Arc<dyn Filesystem>,
    files: Vec<PathBuf>,
    extensions: &[String],
    callback: Option<F>,
) -> Result<Vec<T>, E>
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<ApplicationError> + Send + 'static,
{
    let Some(callback) = callback else {
        return Ok(Vec::new());
    };

    let candidates = files
        .into_iter()
        .filter(|path| has_extension(path, extensions));
    let checks = candidates.map(|path| {
        let filesystem = Arc::clone(&filesystem);
        async move {
            match filesystem.entry_kind(&path).await {
                Ok(EntryKind::File) => Ok(Some(path)),
                Ok(_) | Err(ApplicationError::NotFound { .. }) => {
                    debug!(path = %path.display(), "skipping non-file");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        }
    });
    let regular: Vec<PathBuf> = join_all_detached(checks)
        .await
        .map_err(E::from)?
        .into_iter()
        .flatten()
        .collect();

    join_all_detached(regular.into_iter().map(callback)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockFilesystem;
    use futures::future::{Ready, ready};
    use std::path::Path;

    type Callback = fn(PathBuf) -> Ready<Result<String, ApplicationError>>;

    fn files_only() -> Arc<dyn Filesystem> {
        let mut fs = MockFilesystem::new();
        fs.expect_entry_kind().returning(|path| {
            match path.file_name().and_then(|n| n.to_str()) {
                Some("dir.dust") => Ok(EntryKind::Directory),
                Some("gone.dust") => Err(ApplicationError::NotFound {
                    path: path.to_path_buf(),
                }),
                _ => Ok(EntryKind::File),
            }
        });
        Arc::new(fs)
    }

    fn name_of(path: PathBuf) -> Ready<Result<String, ApplicationError>> {
        ready(Ok(path.display().to_string()))
    }

    #[tokio::test]
    async fn collects_results_in_input_order() {
        let files = vec![
            PathBuf::from("p/b.dust"),
            PathBuf::from("p/a.dust"),
            PathBuf::from("p/c.txt"),
        ];
        let results = read_files(
            files_only(),
            files,
            &[".dust".to_string()],
            Some(name_of as Callback),
        )
        .await
        .unwrap();

        assert_eq!(results, vec!["p/b.dust", "p/a.dust"]);
    }

    #[tokio::test]
    async fn directories_and_missing_paths_are_skipped() {
        let files = vec![
            PathBuf::from("p/dir.dust"),
            PathBuf::from("p/gone.dust"),
            PathBuf::from("p/ok.dust"),
        ];
        let results = read_files(files_only(), files, &[], Some(name_of as Callback))
            .await
            .unwrap();

        assert_eq!(results, vec!["p/ok.dust"]);
    }

    #[tokio::test]
    async fn no_callback_touches_nothing() {
        // No expectations: any filesystem call would panic.
        let fs: Arc<dyn Filesystem> = Arc::new(MockFilesystem::new());
        let results = read_files::<String, ApplicationError, Callback, _>(
            fs,
            vec![PathBuf::from("p/a.dust")],
            &[],
            None,
        )
        .await
        .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn callback_failure_fails_the_batch() {
        let fail = |path: PathBuf| async move {
            if path == Path::new("p/bad.dust") {
                Err(ApplicationError::filesystem(path, "unreadable"))
            } else {
                Ok(())
            }
        };
        let err = read_files(
            files_only(),
            vec![PathBuf::from("p/ok.dust"), PathBuf::from("p/bad.dust")],
            &[],
            Some(fail),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApplicationError::Filesystem { .. }));
    }
}
