//! uniflow: Unidirectional state management with composable reducers
//!
//! Like Redux/Elm, but with first-class effects. All state mutations happen
//! through dispatched actions, reducers compose over named sub-states, and
//! async work is described as cancellable effects that report back with
//! actions.
//!
//! # Example
//! ```ignore
//! use uniflow::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! #[derive(Default, Debug, Clone)]
//! struct CounterState {
//!     count: i64,
//! }
//!
//! fn counter(state: &mut CounterState, action: CounterAction) -> DispatchResult<CounterAction> {
//!     match action {
//!         CounterAction::Increment => state.count += 1,
//!         CounterAction::Decrement => state.count -= 1,
//!     }
//!     DispatchResult::changed()
//! }
//!
//! let mut store = Store::new(CounterState::default(), from_fn(counter).logged("counter", TracingSink));
//! store.dispatch(CounterAction::Increment)?;
//! assert_eq!(store.state().count, 1);
//! ```

// Re-export everything from core
pub use uniflow_core::*;

// Re-export derive macros
pub use uniflow_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use uniflow_core::{Action, Clock, LogSink, Reducer, ReducerExt};

    // Store
    pub use uniflow_core::{Store, StoreConfig, StoreHandle};

    // Reducers and composition
    pub use uniflow_core::{from_fn, Combine, FnReducer, Reduced, Scope};

    // Effects
    pub use uniflow_core::{DispatchResult, Effect, EffectId, EffectStatus, Emitter};

    // Environment
    pub use uniflow_core::{SharedClock, TokioClock};

    // Logging
    pub use uniflow_core::{CaptureSink, JsonSink, LogFilter, Logged, TracingSink};

    // Errors
    pub use uniflow_core::{ReduceError, StoreError};

    // Derive macros
    pub use uniflow_macros::Action;
}
