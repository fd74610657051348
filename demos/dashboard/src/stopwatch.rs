//! Stopwatch feature
//!
//! `StartTapped` registers a repeating timer under [`TIMER_ID`]; every
//! `TimerTicked` adds one to `elapsed`. `StopTapped` cancels the timer.

use std::time::Duration;

use serde::Serialize;
use uniflow::{Action, DispatchResult, Effect, Reduced, Reducer, SharedClock, TokioClock};

/// Id of the timer effect, relative to wherever the stopwatch is scoped.
pub const TIMER_ID: &str = "timer";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StopwatchState {
    /// Completed ticks since the last reset
    pub elapsed: u64,
    pub running: bool,
}

#[derive(Action, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StopwatchAction {
    StartTapped,
    StopTapped,
    TimerTicked,
    ResetTapped,
}

/// Dependencies the stopwatch needs from the outside world.
#[derive(Clone)]
pub struct StopwatchEnv {
    pub clock: SharedClock,
    pub tick: Duration,
}

impl Default for StopwatchEnv {
    fn default() -> Self {
        Self {
            clock: TokioClock::shared(),
            tick: Duration::from_secs(1),
        }
    }
}

impl std::fmt::Debug for StopwatchEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopwatchEnv")
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    env: StopwatchEnv,
}

impl Stopwatch {
    pub fn new(env: StopwatchEnv) -> Self {
        Self { env }
    }
}

impl Reducer for Stopwatch {
    type State = StopwatchState;
    type Action = StopwatchAction;

    fn reduce(&self, state: &mut StopwatchState, action: StopwatchAction) -> Reduced<StopwatchAction> {
        Ok(match action {
            StopwatchAction::StartTapped => {
                if state.running {
                    return Ok(DispatchResult::unchanged());
                }
                state.running = true;
                DispatchResult::changed_with(Effect::interval(
                    TIMER_ID,
                    self.env.clock.clone(),
                    self.env.tick,
                    || StopwatchAction::TimerTicked,
                ))
            }
            StopwatchAction::StopTapped => {
                state.running = false;
                DispatchResult::changed_with(Effect::cancel(TIMER_ID))
            }
            StopwatchAction::TimerTicked => {
                state.elapsed += 1;
                DispatchResult::changed()
            }
            StopwatchAction::ResetTapped => {
                *state = StopwatchState::default();
                DispatchResult::changed_with(Effect::cancel(TIMER_ID))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_twice_keeps_one_timer() {
        let stopwatch = Stopwatch::default();
        let mut state = StopwatchState::default();

        let first = stopwatch
            .reduce(&mut state, StopwatchAction::StartTapped)
            .unwrap();
        assert!(first.changed);
        assert_eq!(first.effects.len(), 1);

        let second = stopwatch
            .reduce(&mut state, StopwatchAction::StartTapped)
            .unwrap();
        assert!(!second.changed);
        assert!(second.effects.is_empty());
    }

    #[test]
    fn test_reset_cancels_timer() {
        let stopwatch = Stopwatch::default();
        let mut state = StopwatchState {
            elapsed: 7,
            running: true,
        };

        let result = stopwatch
            .reduce(&mut state, StopwatchAction::ResetTapped)
            .unwrap();
        assert_eq!(state, StopwatchState::default());
        assert!(result.effects[0].is_cancel());
        assert_eq!(result.effects[0].id().map(|id| id.name()), Some(TIMER_ID));
    }
}
