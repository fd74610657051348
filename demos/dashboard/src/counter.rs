//! Counter feature

use serde::Serialize;
use uniflow::{Action, DispatchResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterState {
    pub count: i64,
}

#[derive(Action, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CounterAction {
    Increment,
    Decrement,
    Reset,
}

pub fn counter(state: &mut CounterState, action: CounterAction) -> DispatchResult<CounterAction> {
    match action {
        CounterAction::Increment => {
            state.count += 1;
            DispatchResult::changed()
        }
        CounterAction::Decrement => {
            state.count -= 1;
            DispatchResult::changed()
        }
        CounterAction::Reset => {
            if state.count == 0 {
                return DispatchResult::unchanged();
            }
            state.count = 0;
            DispatchResult::changed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let mut state = CounterState::default();

        assert!(counter(&mut state, CounterAction::Increment).changed);
        assert!(counter(&mut state, CounterAction::Increment).changed);
        assert!(counter(&mut state, CounterAction::Decrement).changed);
        assert_eq!(state.count, 1);

        assert!(counter(&mut state, CounterAction::Reset).changed);
        assert!(!counter(&mut state, CounterAction::Reset).changed);
        assert_eq!(state.count, 0);
    }
}
