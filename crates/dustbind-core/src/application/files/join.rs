use std::future::Future;

use futures::{FutureExt, future::try_join_all};

use crate::application::ApplicationError;

/// Run every operation as its own tokio task and collect the results in
/// input order.
///
/// Resolves with the first failure as soon as it happens. Tasks still in
/// flight at that point are detached: they run to completion but their
/// results are dropped.
pub async fn join_all_detached<I, F, T, E>(operations: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<ApplicationError> + Send + 'static,
{
    let handles = operations.into_iter().map(|operation| {
        tokio::spawn(operation).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(E::from(ApplicationError::TaskFailed {
                reason: e.to_string(),
            })),
        })
    });
    try_join_all(handles).await
}
