use std::future::Future;
use std::time::Duration;

/// Returned by [`with_timeout`] when the wrapped future did not settle in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

/// Asynchronously waits for the provided duration in a platform-compatible way.
pub async fn sleep(duration: Duration) {
    if duration.is_zero() {
        return;
    }

    sleep_impl(duration).await;
}

/// Drives `future` to completion unless `limit` elapses first.
///
/// A zero `limit` disables the bound.
pub async fn with_timeout<F>(limit: Duration, future: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    if limit.is_zero() {
        return Ok(future.await);
    }
    timeout_impl(limit, future).await
}

#[cfg(target_arch = "wasm32")]
async fn sleep_impl(duration: Duration) {
    use gloo_timers::future::sleep;
    sleep(duration).await;
}

#[cfg(not(target_arch = "wasm32"))]
async fn sleep_impl(duration: Duration) {
    use tokio::time::sleep;
    sleep(duration).await;
}

#[cfg(not(target_arch = "wasm32"))]
async fn timeout_impl<F>(limit: Duration, future: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| Elapsed(limit))
}

#[cfg(target_arch = "wasm32")]
async fn timeout_impl<F>(limit: Duration, future: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    use futures::future::{select, Either};

    let future = std::pin::pin!(future);
    let timer = std::pin::pin!(gloo_timers::future::sleep(limit));
    match select(future, timer).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(_) => Err(Elapsed(limit)),
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_reports_elapsed_limit() {
        let limit = Duration::from_millis(10);
        let result = with_timeout(limit, sleep(Duration::from_secs(5))).await;
        assert_eq!(result, Err(Elapsed(limit)));
    }

    #[tokio::test]
    async fn zero_limit_never_times_out() {
        let result = with_timeout(Duration::ZERO, async { 7 }).await;
        assert_eq!(result, Ok(7));
    }
}
