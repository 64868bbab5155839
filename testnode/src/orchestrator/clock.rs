// File: testnode/src/orchestrator/clock.rs
//
// Clock Abstraction
//
// The height waiters read time and sleep only through this trait, so a wait
// can run against real time or against tokio's paused test clock.

use std::future::Future;
use std::pin::Pin;
use tokio::time::{self, Duration, Instant};

/// Time source used by the polling loops
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use tokio::time::Duration;
/// use testnode::orchestrator::clock::{Clock, SystemClock};
///
/// #[tokio::main]
/// async fn main() {
///     let clock: Arc<dyn Clock> = Arc::new(SystemClock);
///     let start = clock.now();
///     clock.sleep(Duration::from_millis(10)).await;
///     assert!(clock.now() - start >= Duration::from_millis(10));
/// }
/// ```
pub trait Clock: Send + Sync {
    /// Returns the current instant
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration
    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Sleeps until `deadline`, returning immediately if it already passed
    fn sleep_until(&self, deadline: Instant) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.sleep(deadline.saturating_duration_since(self.now()))
    }
}

/// Real-time clock backed by tokio's timer
///
/// Under `#[tokio::test(start_paused = true)]` tokio's timer is itself
/// paused and auto-advances while the runtime is idle, so this clock is also
/// the right choice for most paused-time tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        time::Instant::now()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(time::sleep(d))
    }
}

/// Paused clock (test environment)
///
/// Time only moves when the runtime auto-advances an idle timer or when
/// `advance()` is called. The runtime must already be paused, either with
/// `#[tokio::test(start_paused = true)]` or with [`PausedClock::pause`].
///
/// # Examples
///
/// ```rust
/// use tokio::time::Duration;
/// use testnode::orchestrator::clock::{Clock, PausedClock};
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() {
///     let clock = PausedClock::new();
///     let start = clock.now();
///     clock.advance(Duration::from_secs(11)).await;
///     assert!(clock.now() - start > Duration::from_secs(10));
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PausedClock;

impl PausedClock {
    pub fn new() -> Self {
        Self
    }

    /// Pause tokio time and return the clock.
    ///
    /// # Panics
    ///
    /// Panics if time is already paused or the runtime is multi-threaded.
    pub fn pause() -> Self {
        time::pause();
        Self
    }

    /// Advance the paused runtime clock, waking every timer that expires.
    pub async fn advance(&self, d: Duration) {
        time::advance(d).await
    }
}

impl Clock for PausedClock {
    fn now(&self) -> Instant {
        time::Instant::now()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(time::sleep(d))
    }
}
