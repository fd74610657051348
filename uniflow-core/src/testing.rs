//! Test utilities for uniflow features
//!
//! - [`settle`]: let spawned effect tasks run before inspecting the inbox
//! - [`pause_time`] / [`advance_time`] / [`resume_time`] (feature
//!   `testing-time`): drive the tokio clock by hand
//! - Assertion macros for verifying reduced actions
//!
//! Most tests run under `#[tokio::test(start_paused = true)]` and use
//! [`Store::run_for`](crate::Store::run_for) to advance virtual time.
//!
//! # Example
//!
//! ```ignore
//! use uniflow::{assert_emitted, count_emitted};
//!
//! #[tokio::test(start_paused = true)]
//! async fn ticks_once_per_second() {
//!     let mut store = Store::new(StopwatchState::default(), Stopwatch::new(env));
//!     store.dispatch(StopwatchAction::StartTapped).unwrap();
//!
//!     let actions = store.run_for(Duration::from_secs(3)).await.unwrap();
//!     assert_eq!(count_emitted!(actions, StopwatchAction::TimerTicked), 3);
//! }
//! ```

#[cfg(feature = "testing-time")]
use std::time::Duration;

/// Yield to the scheduler `rounds` times so woken effect tasks can deliver.
pub async fn settle(rounds: usize) {
    for _ in 0..rounds {
        tokio::task::yield_now().await;
    }
}

/// Pause the tokio clock for the current runtime.
///
/// Requires a current-thread runtime, as used by `#[tokio::test]`.
#[cfg(feature = "testing-time")]
pub fn pause_time() {
    tokio::time::pause();
}

/// Resume the tokio clock after [`pause_time`].
#[cfg(feature = "testing-time")]
pub fn resume_time() {
    tokio::time::resume();
}

/// Advance the paused clock by `duration` and let woken tasks run.
#[cfg(feature = "testing-time")]
pub async fn advance_time(duration: Duration) {
    tokio::time::advance(duration).await;
    settle(crate::config::DEFAULT_SETTLE_ROUNDS).await;
}

/// Assert that a specific action was reduced.
///
/// # Example
///
/// ```ignore
/// use uniflow::assert_emitted;
///
/// let actions = store.drain_pending()?;
/// assert_emitted!(actions, Action::DidLoad(_));
/// ```
#[macro_export]
macro_rules! assert_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` to be emitted, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that a specific action was NOT reduced.
///
/// # Example
///
/// ```ignore
/// use uniflow::assert_not_emitted;
///
/// let actions = store.run_for(Duration::from_secs(5)).await?;
/// assert_not_emitted!(actions, Action::TimerTicked);
/// ```
#[macro_export]
macro_rules! assert_not_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` NOT to be emitted, but it was: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Find and return the first action matching a pattern.
///
/// # Example
///
/// ```ignore
/// use uniflow::find_emitted;
///
/// if let Some(Action::DidFail(reason)) = find_emitted!(actions, Action::DidFail(_)) {
///     assert!(reason.contains("timeout"));
/// }
/// ```
#[macro_export]
macro_rules! find_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Count how many actions match a pattern.
///
/// # Example
///
/// ```ignore
/// use uniflow::count_emitted;
///
/// assert_eq!(count_emitted!(actions, Action::TimerTicked), 3);
/// ```
#[macro_export]
macro_rules! count_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}
