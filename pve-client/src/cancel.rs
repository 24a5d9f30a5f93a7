//! Cancellation of in-flight facade calls.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Result};

/// Run a facade call until it completes or `token` is cancelled.
///
/// On cancellation the call's future is dropped, which aborts the
/// underlying HTTP request.
pub async fn cancellable<T, F>(token: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if token.is_cancelled() {
        return Err(ClientError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ClientError::Cancelled),
        result = call => result,
    }
}
