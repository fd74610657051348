//! Dashboard demo: a counter and a stopwatch scoped into one store
//!
//! - `counter`: plain function reducer, no effects
//! - `stopwatch`: reducer with an environment, drives a repeating timer effect
//! - `dashboard`: parent feature embedding both under named fields

pub mod counter;
pub mod dashboard;
pub mod stopwatch;

pub use counter::{counter, CounterAction, CounterState};
pub use dashboard::{dashboard_reducer, DashboardAction, DashboardReducer, DashboardState};
pub use stopwatch::{Stopwatch, StopwatchAction, StopwatchEnv, StopwatchState, TIMER_ID};
