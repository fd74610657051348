//! Effect descriptions returned by reducers
//!
//! A reducer never performs asynchronous work itself. It returns a
//! [`DispatchResult`] carrying [`Effect`] values, and the store hands those to
//! the [`EffectScheduler`](crate::EffectScheduler) after the state update.
//!
//! # Overview
//!
//! ```ignore
//! fn reducer(state: &mut State, action: Action) -> DispatchResult<Action>
//! ```
//!
//! Three kinds of effect exist:
//! - one-shot tasks: a future whose output is dispatched back ([`Effect::task`])
//! - long-running tasks registered under an [`EffectId`] ([`Effect::run`],
//!   [`Effect::interval`], [`Effect::debounce`])
//! - cancellation of an id ([`Effect::cancel`])
//!
//! "No effect" is simply an empty effect list.
//!
//! # Example
//!
//! ```ignore
//! use uniflow::{DispatchResult, Effect};
//!
//! fn reducer(state: &mut Stopwatch, action: StopwatchAction) -> DispatchResult<StopwatchAction> {
//!     match action {
//!         StopwatchAction::StartTapped => {
//!             state.running = true;
//!             DispatchResult::changed_with(Effect::interval(
//!                 "timer",
//!                 clock.clone(),
//!                 Duration::from_secs(1),
//!                 || StopwatchAction::TimerTicked,
//!             ))
//!         }
//!         StopwatchAction::StopTapped => {
//!             state.running = false;
//!             DispatchResult::changed_with(Effect::cancel("timer"))
//!         }
//!         StopwatchAction::TimerTicked => {
//!             state.elapsed += 1;
//!             DispatchResult::changed()
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::env::{BoxFuture, SharedClock};
use crate::scheduler::EffectId;

/// Which task produced a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Origin {
    /// Id the task was started under, `None` for unkeyed tasks.
    pub id: Option<EffectId>,
    /// Generation stamped when the task was started.
    pub generation: u64,
}

/// An action travelling from an effect (or a store handle) to the store inbox.
#[derive(Debug)]
pub(crate) struct Delivery<A> {
    /// `None` for actions sent through a [`StoreHandle`](crate::StoreHandle).
    pub origin: Option<Origin>,
    pub action: A,
}

/// Handle an effect task uses to send actions back to its store.
///
/// Once the task is cancelled every call to [`emit`](Emitter::emit) is a
/// no-op that returns `false`, so a tick that was already computed is never
/// forwarded.
pub struct Emitter<A> {
    send: Arc<dyn Fn(A) -> bool + Send + Sync>,
    token: CancellationToken,
}

impl<A> Clone for Emitter<A> {
    fn clone(&self) -> Self {
        Self {
            send: self.send.clone(),
            token: self.token.clone(),
        }
    }
}

impl<A> fmt::Debug for Emitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl<A: Send + 'static> Emitter<A> {
    #[cfg(test)]
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Delivery<A>>,
        origin: Option<Origin>,
        token: CancellationToken,
    ) -> Self {
        Self::tracked(tx, origin, token, Arc::default())
    }

    /// Emitter that counts its queued deliveries in `in_flight`.
    ///
    /// The count goes up on every successful send. Whoever consumes the
    /// delivery is responsible for bringing it back down.
    pub(crate) fn tracked(
        tx: mpsc::UnboundedSender<Delivery<A>>,
        origin: Option<Origin>,
        token: CancellationToken,
        in_flight: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            send: Arc::new(move |action| {
                in_flight.fetch_add(1, Ordering::AcqRel);
                let sent = tx
                    .send(Delivery {
                        origin: origin.clone(),
                        action,
                    })
                    .is_ok();
                if !sent {
                    in_flight.fetch_sub(1, Ordering::AcqRel);
                }
                sent
            }),
            token,
        }
    }

    /// Send an action to the store.
    ///
    /// Returns `false` if the task was cancelled or the store is gone; the
    /// task should stop in that case.
    pub fn emit(&self, action: A) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        (self.send)(action)
    }

    /// Whether the owning task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the owning task is cancelled.
    ///
    /// Long-running tasks select on this next to their own suspension point.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Build an emitter for a child action type that wraps every action with `f`.
    pub fn map_from<C: 'static>(&self, f: Arc<dyn Fn(C) -> A + Send + Sync>) -> Emitter<C> {
        let send = self.send.clone();
        Emitter {
            send: Arc::new(move |action| send(f(action))),
            token: self.token.clone(),
        }
    }
}

/// The body of an effect: given an [`Emitter`], produce the future to run.
pub struct Work<A>(Box<dyn FnOnce(Emitter<A>) -> BoxFuture<()> + Send>);

impl<A> fmt::Debug for Work<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Work(..)")
    }
}

impl<A: Send + 'static> Work<A> {
    /// Wrap an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Emitter<A>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Box::new(move |emitter| Box::pin(f(emitter))))
    }

    pub(crate) fn into_future(self, emitter: Emitter<A>) -> BoxFuture<()> {
        (self.0)(emitter)
    }

    /// Re-target the work at a parent action type.
    pub fn map<P: Send + 'static>(self, f: Arc<dyn Fn(A) -> P + Send + Sync>) -> Work<P> {
        Work(Box::new(move |emitter: Emitter<P>| {
            (self.0)(emitter.map_from(f))
        }))
    }
}

/// Asynchronous work requested by a reducer.
pub enum Effect<A> {
    /// Start a task. With an id it replaces any task running under that id.
    Start {
        id: Option<EffectId>,
        work: Work<A>,
    },
    /// Cancel the task registered under the id, if any.
    Cancel(EffectId),
}

impl<A> fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Start { id, .. } => f.debug_struct("Start").field("id", id).finish(),
            Effect::Cancel(id) => f.debug_tuple("Cancel").field(id).finish(),
        }
    }
}

impl<A: Send + 'static> Effect<A> {
    /// One-shot task; its output is dispatched back to the store.
    pub fn task<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = A> + Send + 'static,
    {
        Effect::Start {
            id: None,
            work: one_shot(future),
        }
    }

    /// One-shot task registered under `id`, so it can be cancelled or replaced.
    pub fn keyed<Fut>(id: impl Into<EffectId>, future: Fut) -> Self
    where
        Fut: Future<Output = A> + Send + 'static,
    {
        Effect::Start {
            id: Some(id.into()),
            work: one_shot(future),
        }
    }

    /// One-shot task whose failure is delivered as an action.
    ///
    /// # Example
    ///
    /// ```ignore
    /// Effect::fallible(api::load(id), |e| Action::DidLoadError(e.to_string()))
    /// ```
    pub fn fallible<Fut, E, F>(future: Fut, on_error: F) -> Self
    where
        Fut: Future<Output = Result<A, E>> + Send + 'static,
        F: FnOnce(E) -> A + Send + 'static,
    {
        Self::task(async move { future.await.unwrap_or_else(on_error) })
    }

    /// Long-running task registered under `id`.
    ///
    /// The closure receives an [`Emitter`] and may emit any number of actions.
    pub fn run<F, Fut>(id: impl Into<EffectId>, f: F) -> Self
    where
        F: FnOnce(Emitter<A>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Effect::Start {
            id: Some(id.into()),
            work: Work::new(f),
        }
    }

    /// Repeating timer: emits `make()` every `period`, first after one period.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn interval<F>(id: impl Into<EffectId>, clock: SharedClock, period: Duration, make: F) -> Self
    where
        F: Fn() -> A + Send + 'static,
    {
        assert!(period > Duration::ZERO, "interval period must be non-zero");

        Self::run(id, move |emitter| {
            // Anchored at start, not at the task's first poll
            let mut next = clock.now() + period;
            async move {
                loop {
                    tokio::select! {
                        _ = emitter.cancelled() => break,
                        _ = clock.sleep_until(next) => {}
                    }
                    if !emitter.emit(make()) {
                        break;
                    }
                    next += period;
                }
            }
        })
    }

    /// Wait `duration`, then run `future` and dispatch its output.
    ///
    /// Starting another effect with the same id before the wait ends resets it.
    pub fn debounce<Fut>(
        id: impl Into<EffectId>,
        clock: SharedClock,
        duration: Duration,
        future: Fut,
    ) -> Self
    where
        Fut: Future<Output = A> + Send + 'static,
    {
        Self::run(id, move |emitter| {
            let deadline = clock.now() + duration;
            async move {
                tokio::select! {
                    _ = emitter.cancelled() => return,
                    _ = clock.sleep_until(deadline) => {}
                }
                let action = future.await;
                emitter.emit(action);
            }
        })
    }

    /// Wrap every action this effect produces with `f`.
    pub fn map<P: Send + 'static>(self, f: Arc<dyn Fn(A) -> P + Send + Sync>) -> Effect<P> {
        match self {
            Effect::Start { id, work } => Effect::Start {
                id,
                work: work.map(f),
            },
            Effect::Cancel(id) => Effect::Cancel(id),
        }
    }
}

impl<A> Effect<A> {
    /// Cancel whatever runs under `id`.
    pub fn cancel(id: impl Into<EffectId>) -> Self {
        Effect::Cancel(id.into())
    }

    /// The id this effect starts or cancels, if any.
    pub fn id(&self) -> Option<&EffectId> {
        match self {
            Effect::Start { id, .. } => id.as_ref(),
            Effect::Cancel(id) => Some(id),
        }
    }

    /// Whether this is a cancellation.
    pub fn is_cancel(&self) -> bool {
        matches!(self, Effect::Cancel(_))
    }

    /// Namespace the id under a scoped field (`timer` becomes `stopwatch.timer`).
    pub fn scoped(self, field: &str) -> Self {
        match self {
            Effect::Start { id, work } => Effect::Start {
                id: id.map(|id| id.scoped(field)),
                work,
            },
            Effect::Cancel(id) => Effect::Cancel(id.scoped(field)),
        }
    }
}

fn one_shot<A, Fut>(future: Fut) -> Work<A>
where
    A: Send + 'static,
    Fut: Future<Output = A> + Send + 'static,
{
    Work::new(move |emitter: Emitter<A>| async move {
        let action = future.await;
        emitter.emit(action);
    })
}

/// Result of a reduce call.
///
/// Contains both the state change indicator and any effects to be started.
#[derive(Debug)]
pub struct DispatchResult<A> {
    /// Whether the state was modified by this action.
    pub changed: bool,
    /// Effects to be started after the state update.
    pub effects: Vec<Effect<A>>,
}

impl<A> Default for DispatchResult<A> {
    fn default() -> Self {
        Self::unchanged()
    }
}

impl<A> DispatchResult<A> {
    /// Create a result indicating no state change and no effects.
    #[inline]
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            effects: vec![],
        }
    }

    /// Create a result indicating state changed but no effects.
    #[inline]
    pub fn changed() -> Self {
        Self {
            changed: true,
            effects: vec![],
        }
    }

    /// Create a result with a single effect but no state change.
    #[inline]
    pub fn effect(effect: Effect<A>) -> Self {
        Self {
            changed: false,
            effects: vec![effect],
        }
    }

    /// Create a result with multiple effects but no state change.
    #[inline]
    pub fn effects(effects: Vec<Effect<A>>) -> Self {
        Self {
            changed: false,
            effects,
        }
    }

    /// Create a result indicating state changed with a single effect.
    #[inline]
    pub fn changed_with(effect: Effect<A>) -> Self {
        Self {
            changed: true,
            effects: vec![effect],
        }
    }

    /// Create a result indicating state changed with multiple effects.
    #[inline]
    pub fn changed_with_many(effects: Vec<Effect<A>>) -> Self {
        Self {
            changed: true,
            effects,
        }
    }

    /// Add an effect to this result.
    #[inline]
    pub fn with(mut self, effect: Effect<A>) -> Self {
        self.effects.push(effect);
        self
    }

    /// Set the changed flag to true.
    #[inline]
    pub fn mark_changed(mut self) -> Self {
        self.changed = true;
        self
    }

    /// Returns true if there are any effects to process.
    #[inline]
    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    /// Fold another result into this one, keeping effect order.
    pub fn merge(&mut self, other: DispatchResult<A>) {
        self.changed |= other.changed;
        self.effects.extend(other.effects);
    }
}

impl<A: Send + 'static> DispatchResult<A> {
    /// Lift a child result into its parent: actions are wrapped with
    /// `embed` and effect ids are namespaced under `field`.
    pub fn scoped<P: Send + 'static>(self, field: &str, embed: fn(A) -> P) -> DispatchResult<P> {
        let embed: Arc<dyn Fn(A) -> P + Send + Sync> = Arc::new(embed);
        DispatchResult {
            changed: self.changed,
            effects: self
                .effects
                .into_iter()
                .map(|effect| effect.scoped(field).map(embed.clone()))
                .collect(),
        }
    }
}
