//! Explicit environment dependencies for effects
//!
//! Effects that wait on time take a [`Clock`] from the feature's environment
//! instead of reaching for a global. Production code uses [`TokioClock`];
//! tests run the same clock under `#[tokio::test(start_paused = true)]`
//! and advance it manually.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// An owned, boxed, sendable future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Shared handle to a clock, cheap to clone into effects.
pub type SharedClock = Arc<dyn Clock>;

/// Time source used by timer and debounce effects.
pub trait Clock: Send + Sync + 'static {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Completes once `deadline` has been reached.
    fn sleep_until(&self, deadline: Instant) -> BoxFuture<()>;

    /// Completes after `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> BoxFuture<()> {
        self.sleep_until(self.now() + duration)
    }
}

/// Clock backed by the tokio timer.
///
/// Honors `tokio::time::pause()`, which makes it deterministic in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl TokioClock {
    /// Wrap a new tokio clock in a [`SharedClock`].
    pub fn shared() -> SharedClock {
        Arc::new(TokioClock)
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) -> BoxFuture<()> {
        Box::pin(tokio::time::sleep_until(deadline))
    }
}
