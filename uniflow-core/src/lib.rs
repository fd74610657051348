//! Core traits and types for uniflow
//!
//! This crate provides the foundational abstractions for unidirectional state
//! management with composable reducers and cancellable effects, following a
//! Redux/Elm-inspired architecture.
//!
//! # Core Concepts
//!
//! - **Action**: Events that describe what happened
//! - **Reducer**: Updates state for an action and returns effects
//! - **Store**: Owns one state value and applies actions one at a time
//! - **Scope/Combine**: Embeds child reducers into a parent over named fields
//! - **Effect/EffectScheduler**: Async work keyed by [`EffectId`], cancellable
//! - **Logged**: Reducer decorator emitting `{label, action, state}` records
//!
//! # Basic Example
//!
//! ```ignore
//! use uniflow_core::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! #[derive(Default)]
//! struct CounterState {
//!     count: i32,
//! }
//!
//! fn counter(state: &mut CounterState, action: CounterAction) -> DispatchResult<CounterAction> {
//!     match action {
//!         CounterAction::Increment => { state.count += 1; DispatchResult::changed() }
//!         CounterAction::Decrement => { state.count -= 1; DispatchResult::changed() }
//!     }
//! }
//!
//! let mut store = Store::new(CounterState::default(), from_fn(counter));
//! store.dispatch(CounterAction::Increment)?;
//! ```
//!
//! # Effects
//!
//! Reducers never await. Asynchronous work is described as an [`Effect`] and
//! started by the store after the state update. Effect tasks report back by
//! emitting actions, which re-enter the store's single sequencer:
//!
//! 1. **Intent actions** trigger work (e.g., `StartTapped`)
//! 2. **Result actions** carry the outcome back (e.g., `TimerTicked`, `DidLoad`)
//!
//! Long-running effects are registered under an [`EffectId`]. Starting the same
//! id again replaces the old task, and cancelling it guarantees nothing the old
//! task produced reaches the reducer afterwards.

pub mod action;
pub mod config;
pub mod effect;
pub mod env;
pub mod error;
pub mod logging;
pub mod reducer;
pub mod scheduler;
pub mod scope;
pub mod store;
pub mod testing;

// Core trait exports
pub use action::Action;
pub use reducer::{from_fn, EffectReducer, FnReducer, Reduced, Reducer, ReducerExt};

// Store exports
pub use store::{Store, StoreHandle};

// Composition exports
pub use scope::{Combine, Scope};

// Effect exports
pub use effect::{DispatchResult, Effect, Emitter, Work};
pub use scheduler::{EffectId, EffectScheduler, EffectStatus};

// Environment exports
pub use env::{BoxFuture, Clock, SharedClock, TokioClock};

// Logging exports
pub use logging::{CaptureSink, JsonSink, LogFilter, LogRecord, LogSink, Logged, TracingSink};

// Config and error exports
pub use config::{LogConfig, StoreConfig};
pub use error::{ConfigError, ReduceError, StoreError};

// Testing exports
pub use testing::settle;

#[cfg(feature = "testing-time")]
pub use testing::{advance_time, pause_time, resume_time};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::Action;
    pub use crate::effect::{DispatchResult, Effect, Emitter};
    pub use crate::env::{Clock, SharedClock, TokioClock};
    pub use crate::error::{ReduceError, StoreError};
    pub use crate::logging::{CaptureSink, LogSink, Logged, TracingSink};
    pub use crate::reducer::{from_fn, Reduced, Reducer, ReducerExt};
    pub use crate::scheduler::{EffectId, EffectStatus};
    pub use crate::scope::{Combine, Scope};
    pub use crate::store::{Store, StoreHandle};
}
