#![forbid(unsafe_code)]

use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

/// Sleeps for a duration but aborts early if the token fires.
/// Returns `true` if cancellation occurred during the wait.
pub async fn sleep_with_cancel(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}
