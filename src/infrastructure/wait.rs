//! Condition polling primitive.
//!
//! Every wait in the crate goes through here. A fixed-duration sleep is
//! either too slow on a fast network or too flaky on a slow one; polling a
//! cheap probe at a short interval is both faster and more reliable.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Poll `probe` every `poll` until it returns `true` or `timeout` elapses.
///
/// Returns `false` on timeout rather than erroring; the caller decides
/// whether that is fatal. The probe runs at least once even with a zero
/// timeout.
pub async fn wait_for_condition<F, Fut>(mut probe: F, timeout: Duration, poll: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(poll).await;
    }
}

/// Like [`wait_for_condition`], for probes that produce a value.
///
/// Returns `None` on timeout.
pub async fn wait_for_value<T, F, Fut>(
    mut probe: F,
    timeout: Duration,
    poll: Duration,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(poll).await;
    }
}
