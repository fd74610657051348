//! Action trait for type-safe state updates

use std::fmt::Debug;

/// Marker trait for actions that can be dispatched to a store
///
/// Actions describe what happened. They should be:
/// - Clone: parent reducers and the logging wrapper look at an action after a child consumed it
/// - Debug: for logging
/// - Send + 'static: effect tasks send them back from other tasks
///
/// Use `#[derive(Action)]` from `uniflow-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + Send + 'static {
    /// Get the action name for logging and filtering
    fn name(&self) -> &'static str;
}
