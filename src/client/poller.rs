//! Retry-with-deadline polling
//!
//! `poll_until` runs a check function at a fixed interval until it reports a
//! terminal result, asks to abort, or the deadline passes. It is independent
//! of what is being polled; the crawl client uses it for task status checks.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Longest wait `deadline_after` will schedule
const MAX_WAIT: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Returns `start + wait`, clamping waits too long to represent
pub fn deadline_after(start: Instant, wait: Duration) -> Instant {
    start.checked_add(wait.min(MAX_WAIT)).unwrap_or(start)
}

/// What a single check observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T, E> {
    /// Terminal success; polling stops with this value
    Ready(T),
    /// Not finished yet (or a transient failure); check again later
    Pending,
    /// Terminal failure; polling stops with this error
    Abort(E),
}

/// Why polling stopped without a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    /// The deadline passed before a terminal step was observed
    TimedOut { attempts: u32 },
    /// A check returned `PollStep::Abort`
    Aborted(E),
}

/// Calls `check` every `interval` until it is terminal or `deadline` passes
///
/// The first check runs immediately. A check still in flight at the
/// deadline is dropped, and no check starts at or after the deadline, so
/// this returns no later than `deadline` plus scheduling jitter.
///
/// # Arguments
///
/// * `interval` - Fixed delay between the start of one wait and the next check
/// * `deadline` - Absolute time after which polling gives up
/// * `check` - Produces one `PollStep` per call
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    deadline: Instant,
    mut check: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PollStep<T, E>>,
{
    let mut attempts: u32 = 0;

    loop {
        if attempts > 0 && Instant::now() >= deadline {
            return Err(PollError::TimedOut { attempts });
        }
        attempts += 1;

        match tokio::time::timeout_at(deadline, check()).await {
            Ok(PollStep::Ready(value)) => return Ok(value),
            Ok(PollStep::Abort(error)) => return Err(PollError::Aborted(error)),
            Ok(PollStep::Pending) => tracing::trace!("Poll attempt {} pending", attempts),
            Err(_) => return Err(PollError::TimedOut { attempts }),
        }

        let next = deadline_after(Instant::now(), interval).min(deadline);
        tokio::time::sleep_until(next).await;
    }
}
