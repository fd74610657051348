//! Dashboard: parent feature embedding the counter and the stopwatch

use serde::Serialize;
use uniflow::{from_fn, Action, Combine, DispatchResult, Effect, FnReducer, Scope};

use crate::counter::{counter, CounterAction, CounterState};
use crate::stopwatch::{Stopwatch, StopwatchAction, StopwatchEnv, StopwatchState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardState {
    pub counter: CounterState,
    pub stopwatch: StopwatchState,
    /// User-initiated actions seen so far (timer ticks excluded)
    pub interactions: u64,
}

#[derive(Action, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DashboardAction {
    Counter(CounterAction),
    Stopwatch(StopwatchAction),
    ResetAll,
}

pub type DashboardReducer = Combine<FnReducer<DashboardState, DashboardAction>>;

/// Build the composed dashboard reducer.
pub fn dashboard_reducer(env: StopwatchEnv) -> DashboardReducer {
    Combine::new(from_fn(dashboard))
        .scope(Scope::new(
            "counter",
            from_fn(counter),
            |s: &mut DashboardState| &mut s.counter,
            |a: &DashboardAction| match a {
                DashboardAction::Counter(a) => Some(a),
                _ => None,
            },
            DashboardAction::Counter,
        ))
        .scope(Scope::new(
            "stopwatch",
            Stopwatch::new(env),
            |s: &mut DashboardState| &mut s.stopwatch,
            |a: &DashboardAction| match a {
                DashboardAction::Stopwatch(a) => Some(a),
                _ => None,
            },
            DashboardAction::Stopwatch,
        ))
}

fn dashboard(state: &mut DashboardState, action: DashboardAction) -> DispatchResult<DashboardAction> {
    match action {
        DashboardAction::Stopwatch(StopwatchAction::TimerTicked) => DispatchResult::unchanged(),
        DashboardAction::Counter(_) | DashboardAction::Stopwatch(_) => {
            state.interactions += 1;
            DispatchResult::changed()
        }
        // Re-enters the children as their own reset actions
        DashboardAction::ResetAll => {
            state.interactions += 1;
            let counter = DashboardAction::Counter(CounterAction::Reset);
            let stopwatch = DashboardAction::Stopwatch(StopwatchAction::ResetTapped);
            DispatchResult::changed()
                .with(Effect::task(async move { counter }))
                .with(Effect::task(async move { stopwatch }))
        }
    }
}
