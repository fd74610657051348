//! Reducer trait and function adapters

use std::fmt;
use std::marker::PhantomData;

use crate::effect::DispatchResult;
use crate::error::ReduceError;
use crate::logging::{LogSink, Logged};
use crate::Action;

/// Output of a reduce call: the change flag and effects, or a routing fault.
pub type Reduced<A> = Result<DispatchResult<A>, ReduceError>;

/// A plain reducer function that updates state and may emit effects.
pub type EffectReducer<S, A> = fn(&mut S, A) -> DispatchResult<A>;

/// Handles actions for one feature.
///
/// The reducer is the only code that writes the feature's state. It runs
/// synchronously and must not block; anything asynchronous is returned as an
/// [`Effect`](crate::Effect).
///
/// Most leaf features are plain functions wrapped with [`from_fn`].
/// Implement the trait directly when the reducer carries an environment:
///
/// ```ignore
/// struct Stopwatch {
///     clock: SharedClock,
/// }
///
/// impl Reducer for Stopwatch {
///     type State = StopwatchState;
///     type Action = StopwatchAction;
///
///     fn reduce(&self, state: &mut StopwatchState, action: StopwatchAction) -> Reduced<StopwatchAction> {
///         // ...
///         Ok(DispatchResult::changed())
///     }
/// }
/// ```
pub trait Reducer {
    /// The state this reducer owns.
    type State;
    /// The actions this reducer handles.
    type Action: Action;

    /// Apply `action` to `state`.
    fn reduce(&self, state: &mut Self::State, action: Self::Action) -> Reduced<Self::Action>;

    /// Report whether [`reduce`](Reducer::reduce) would fault on `action`,
    /// without changing `state`.
    ///
    /// Composed reducers call this on every participant before any of them
    /// writes, so a rejected action leaves the whole state untouched. A
    /// reducer that can fault must report it here; `reduce` is only called
    /// after `check` succeeded. The state is borrowed mutably only so lenses
    /// can be followed.
    fn check(&self, state: &mut Self::State, action: &Self::Action) -> Result<(), ReduceError> {
        let _ = (state, action);
        Ok(())
    }
}

/// Adapter turning an [`EffectReducer`] function into a [`Reducer`].
pub struct FnReducer<S, A> {
    f: EffectReducer<S, A>,
    _marker: PhantomData<fn(&mut S, A)>,
}

impl<S, A> Clone for FnReducer<S, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, A> Copy for FnReducer<S, A> {}

impl<S, A> fmt::Debug for FnReducer<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnReducer").finish_non_exhaustive()
    }
}

/// Wrap a reducer function.
///
/// # Example
///
/// ```ignore
/// fn counter(state: &mut CounterState, action: CounterAction) -> DispatchResult<CounterAction> {
///     match action {
///         CounterAction::Increment => {
///             state.count += 1;
///             DispatchResult::changed()
///         }
///     }
/// }
///
/// let mut store = Store::new(CounterState::default(), from_fn(counter));
/// ```
pub fn from_fn<S, A: Action>(f: EffectReducer<S, A>) -> FnReducer<S, A> {
    FnReducer {
        f,
        _marker: PhantomData,
    }
}

impl<S, A: Action> Reducer for FnReducer<S, A> {
    type State = S;
    type Action = A;

    #[inline]
    fn reduce(&self, state: &mut S, action: A) -> Reduced<A> {
        Ok((self.f)(state, action))
    }
}

/// Combinators available on every reducer.
pub trait ReducerExt: Reducer + Sized {
    /// Wrap this reducer with the logging decorator.
    fn logged<K>(self, label: impl Into<String>, sink: K) -> Logged<Self, K>
    where
        K: LogSink<Self::State, Self::Action>,
    {
        Logged::new(self, label, sink)
    }
}

impl<R: Reducer> ReducerExt for R {}
