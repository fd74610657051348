//! State store with serial dispatch and effect routing

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::StoreConfig;
use crate::effect::{DispatchResult, Delivery};
use crate::error::StoreError;
use crate::reducer::Reducer;
use crate::scheduler::EffectScheduler;
use crate::testing::settle;
use crate::Action;

/// Stand-in deadline when `run_for` is asked to run past what `Instant` can hold.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// State container for one feature instance.
///
/// The store holds the state and provides a single point for state
/// updates: [`dispatch`](Store::dispatch). Effects returned by the reducer
/// are started on the store's [`EffectScheduler`]; the actions they emit
/// land in the store's inbox and are reduced one at a time by
/// [`process_next`](Store::process_next), [`drain_pending`](Store::drain_pending)
/// or [`run_for`](Store::run_for).
///
/// Every method that reduces takes `&mut self`, so two reduce calls never
/// interleave.
///
/// # Example
/// ```ignore
/// let mut store = Store::new(StopwatchState::default(), Stopwatch::new(env));
///
/// store.dispatch(StopwatchAction::StartTapped)?;
/// let ticks = store.run_for(Duration::from_secs(3)).await?;
/// assert_eq!(ticks.len(), 3);
/// assert_eq!(store.state().elapsed, 3);
/// ```
///
/// Starting effects requires a tokio runtime.
pub struct Store<R: Reducer> {
    state: R::State,
    reducer: R,
    effects: EffectScheduler<R::Action>,
    inbox: mpsc::UnboundedReceiver<Delivery<R::Action>>,
    tx: mpsc::UnboundedSender<Delivery<R::Action>>,
    config: StoreConfig,
    closed: bool,
}

impl<R: Reducer> fmt::Debug for Store<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.config.name)
            .field("effects", &self.effects)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<R: Reducer> Store<R> {
    /// Create a new store with initial state and reducer
    pub fn new(state: R::State, reducer: R) -> Self {
        Self::with_config(state, reducer, StoreConfig::default())
    }

    /// Create a new store with explicit configuration
    pub fn with_config(state: R::State, reducer: R, config: StoreConfig) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        Self {
            state,
            reducer,
            effects: EffectScheduler::new(tx.clone()),
            inbox,
            tx,
            config,
            closed: false,
        }
    }

    /// Dispatch an action to the store
    ///
    /// The reducer runs synchronously; returned effects are started after
    /// the state update. Returns `true` if the state changed.
    pub fn dispatch(&mut self, action: R::Action) -> Result<bool, StoreError> {
        self.ensure_open()?;
        self.reduce(action)
    }

    /// Wait for the next action delivered by an effect or a [`StoreHandle`]
    /// and reduce it.
    pub async fn process_next(&mut self) -> Result<R::Action, StoreError> {
        loop {
            self.ensure_open()?;
            let delivery = self.inbox.recv().await.ok_or(StoreError::Closed)?;
            if let Some(action) = self.deliver(delivery)? {
                return Ok(action);
            }
        }
    }

    /// Reduce every action already waiting in the inbox.
    ///
    /// Returns the reduced actions in order. A queued action the reducer
    /// rejects is logged and skipped: the state is left as it was, the action
    /// is left out of the result, and draining carries on with the rest.
    /// Only [`StoreError::Closed`] ends a drain early.
    pub fn drain_pending(&mut self) -> Result<Vec<R::Action>, StoreError> {
        self.ensure_open()?;
        let mut processed = Vec::new();
        while let Ok(delivery) = self.inbox.try_recv() {
            if let Some(action) = self.deliver_or_skip(delivery) {
                processed.push(action);
            }
        }
        Ok(processed)
    }

    /// Reduce deliveries until `duration` has elapsed on the tokio clock.
    ///
    /// Deliveries due exactly at the deadline are included. Under a paused
    /// clock this advances virtual time deterministically. Rejected actions
    /// are skipped as in [`drain_pending`](Store::drain_pending).
    pub async fn run_for(&mut self, duration: Duration) -> Result<Vec<R::Action>, StoreError> {
        self.ensure_open()?;
        let now = Instant::now();
        let deadline = now.checked_add(duration).unwrap_or(now + FAR_FUTURE);
        let mut processed = Vec::new();

        loop {
            let next = tokio::select! {
                biased;
                delivery = self.inbox.recv() => delivery,
                _ = tokio::time::sleep_until(deadline) => None,
            };
            match next {
                Some(delivery) => {
                    if let Some(action) = self.deliver_or_skip(delivery) {
                        processed.push(action);
                    }
                }
                None => break,
            }
        }

        settle(self.config.settle_rounds).await;
        processed.extend(self.drain_pending()?);
        Ok(processed)
    }

    /// Get a reference to the current state
    pub fn state(&self) -> &R::State {
        &self.state
    }

    /// Clone the current state
    pub fn snapshot(&self) -> R::State
    where
        R::State: Clone,
    {
        self.state.clone()
    }

    /// Get a sender other tasks can use to dispatch into this store.
    ///
    /// Actions sent through the handle are queued and reduced in arrival
    /// order alongside effect deliveries.
    pub fn handle(&self) -> StoreHandle<R::Action> {
        StoreHandle {
            tx: self.tx.clone(),
        }
    }

    /// The effect scheduler, for status queries.
    pub fn effects(&self) -> &EffectScheduler<R::Action> {
        &self.effects
    }

    /// The effect scheduler, for starting or cancelling work directly.
    pub fn effects_mut(&mut self) -> &mut EffectScheduler<R::Action> {
        &mut self.effects
    }

    /// Get a reference to the reducer
    pub fn reducer(&self) -> &R {
        &self.reducer
    }

    /// Get the store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether [`teardown`](Store::teardown) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Cancel every effect and close the store.
    ///
    /// Pending deliveries are dropped. Later dispatches fail with
    /// [`StoreError::Closed`]. Calling this twice is harmless.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.effects.cancel_all();
        self.closed = true;
        self.inbox.close();
        let mut dropped = 0usize;
        while self.inbox.try_recv().is_ok() {
            dropped += 1;
        }
        tracing::debug!(store = %self.config.name, dropped, "store torn down");
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn deliver(&mut self, delivery: Delivery<R::Action>) -> Result<Option<R::Action>, StoreError> {
        if let Some(origin) = &delivery.origin {
            if !self.effects.accepts(origin) {
                tracing::trace!(
                    store = %self.config.name,
                    action = %delivery.action.name(),
                    effect = ?origin.id,
                    "discarded delivery from cancelled effect"
                );
                return Ok(None);
            }
            self.effects.delivered(origin);
        }

        let action = delivery.action;
        self.reduce(action.clone())?;
        Ok(Some(action))
    }

    /// [`deliver`](Self::deliver) for batch processing.
    ///
    /// The fault was already logged by [`reduce`](Self::reduce).
    fn deliver_or_skip(&mut self, delivery: Delivery<R::Action>) -> Option<R::Action> {
        self.deliver(delivery).ok().flatten()
    }

    fn reduce(&mut self, action: R::Action) -> Result<bool, StoreError> {
        let name = action.name();
        tracing::debug!(store = %self.config.name, action = %name, "dispatch");

        let DispatchResult { changed, effects } = self
            .reducer
            .reduce(&mut self.state, action)
            .inspect_err(|error| {
                tracing::error!(store = %self.config.name, action = %name, %error, "reducer fault");
            })?;

        for effect in effects {
            self.effects.apply(effect);
        }
        Ok(changed)
    }
}

/// Cloneable sender that dispatches into a [`Store`] from other tasks.
pub struct StoreHandle<A> {
    tx: mpsc::UnboundedSender<Delivery<A>>,
}

impl<A> Clone for StoreHandle<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<A> fmt::Debug for StoreHandle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<A: Action> StoreHandle<A> {
    /// Queue an action for the store.
    pub fn send(&self, action: A) -> Result<(), StoreError> {
        self.tx
            .send(Delivery {
                origin: None,
                action,
            })
            .map_err(|_| StoreError::Closed)
    }

    /// Whether the store has been torn down or dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::env::TokioClock;
    use crate::error::ReduceError;
    use crate::reducer::{from_fn, Reduced};
    use crate::scheduler::EffectStatus;
    use crate::EffectId;

    #[derive(Default)]
    struct TestState {
        counter: i32,
        errors: Vec<String>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        Decrement,
        NoOp,
        Load,
        LoadFailing,
        DidLoad(i32),
        DidFail(String),
        StartTicking,
        StopTicking,
        Tick,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Increment => "Increment",
                TestAction::Decrement => "Decrement",
                TestAction::NoOp => "NoOp",
                TestAction::Load => "Load",
                TestAction::LoadFailing => "LoadFailing",
                TestAction::DidLoad(_) => "DidLoad",
                TestAction::DidFail(_) => "DidFail",
                TestAction::StartTicking => "StartTicking",
                TestAction::StopTicking => "StopTicking",
                TestAction::Tick => "Tick",
            }
        }
    }

    fn test_reducer(state: &mut TestState, action: TestAction) -> DispatchResult<TestAction> {
        match action {
            TestAction::Increment | TestAction::Tick => {
                state.counter += 1;
                DispatchResult::changed()
            }
            TestAction::Decrement => {
                state.counter -= 1;
                DispatchResult::changed()
            }
            TestAction::NoOp => DispatchResult::unchanged(),
            TestAction::Load => DispatchResult::effect(Effect::task(async { TestAction::DidLoad(5) })),
            TestAction::LoadFailing => DispatchResult::effect(Effect::fallible(
                async { Err::<TestAction, _>("timer source failed") },
                |e| TestAction::DidFail(e.to_string()),
            )),
            TestAction::DidLoad(n) => {
                state.counter += n;
                DispatchResult::changed()
            }
            TestAction::DidFail(e) => {
                state.errors.push(e);
                DispatchResult::changed()
            }
            TestAction::StartTicking => DispatchResult::effect(Effect::interval(
                "ticker",
                TokioClock::shared(),
                Duration::from_secs(1),
                || TestAction::Tick,
            )),
            TestAction::StopTicking => DispatchResult::effect(Effect::cancel("ticker")),
        }
    }

    #[test]
    fn test_store_dispatch() {
        let mut store = Store::new(TestState::default(), from_fn(test_reducer));

        assert!(store.dispatch(TestAction::Increment).unwrap());
        assert_eq!(store.state().counter, 1);

        assert!(store.dispatch(TestAction::Increment).unwrap());
        assert_eq!(store.state().counter, 2);

        assert!(store.dispatch(TestAction::Decrement).unwrap());
        assert_eq!(store.state().counter, 1);
    }

    #[test]
    fn test_store_noop() {
        let mut store = Store::new(TestState::default(), from_fn(test_reducer));

        assert!(!store.dispatch(TestAction::NoOp).unwrap());
        assert_eq!(store.state().counter, 0);
    }

    #[test]
    fn test_dispatch_after_teardown_is_closed() {
        let mut store = Store::new(TestState::default(), from_fn(test_reducer));
        let handle = store.handle();

        store.teardown();
        store.teardown();

        assert!(store.is_closed());
        assert_eq!(store.dispatch(TestAction::Increment), Err(StoreError::Closed));
        assert_eq!(store.drain_pending(), Err(StoreError::Closed));
        assert_eq!(handle.send(TestAction::Increment), Err(StoreError::Closed));
        assert!(handle.is_closed());
        assert_eq!(store.state().counter, 0);
    }

    #[tokio::test]
    async fn test_one_shot_effect_delivers() {
        let mut store = Store::new(TestState::default(), from_fn(test_reducer));

        store.dispatch(TestAction::Load).unwrap();
        let action = store.process_next().await.unwrap();

        assert_eq!(action, TestAction::DidLoad(5));
        assert_eq!(store.state().counter, 5);
    }

    #[tokio::test]
    async fn test_effect_failure_is_delivered_as_action() {
        let mut store = Store::new(TestState::default(), from_fn(test_reducer));

        store.dispatch(TestAction::LoadFailing).unwrap();
        let action = store.process_next().await.unwrap();

        assert!(matches!(action, TestAction::DidFail(_)));
        assert_eq!(store.state().errors, vec!["timer source failed".to_string()]);
    }

    #[tokio::test]
    async fn test_handle_actions_are_serialized_in_order() {
        let mut store = Store::new(TestState::default(), from_fn(test_reducer));
        let handle = store.handle();

        handle.send(TestAction::Increment).unwrap();
        handle.send(TestAction::Increment).unwrap();
        handle.send(TestAction::Decrement).unwrap();

        let processed = store.drain_pending().unwrap();
        assert_eq!(
            processed,
            vec![TestAction::Increment, TestAction::Increment, TestAction::Decrement]
        );
        assert_eq!(store.state().counter, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_for_delivers_ticks() {
        let mut store = Store::new(TestState::default(), from_fn(test_reducer));

        store.dispatch(TestAction::StartTicking).unwrap();
        let ticks = store.run_for(Duration::from_secs(3)).await.unwrap();

        assert_eq!(ticks, vec![TestAction::Tick; 3]);
        assert_eq!(store.state().counter, 3);

        store.dispatch(TestAction::StopTicking).unwrap();
        let ticks = store.run_for(Duration::from_secs(5)).await.unwrap();

        assert!(ticks.is_empty());
        assert_eq!(store.state().counter, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_delivery_discarded_after_cancel() {
        let mut store = Store::new(TestState::default(), from_fn(test_reducer));

        store.dispatch(TestAction::StartTicking).unwrap();
        settle(8).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        settle(8).await;

        // The tick is sitting in the inbox; cancelling must discard it
        store.dispatch(TestAction::StopTicking).unwrap();
        let processed = store.drain_pending().unwrap();

        assert!(processed.is_empty());
        assert_eq!(store.state().counter, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_effects() {
        let mut store = Store::new(TestState::default(), from_fn(test_reducer));
        let ticker = EffectId::new("ticker");

        store.dispatch(TestAction::StartTicking).unwrap();
        assert_eq!(store.effects().status(&ticker), EffectStatus::Running);

        store.teardown();
        settle(8).await;

        assert_eq!(store.effects().status(&ticker), EffectStatus::Idle);
        assert!(store.run_for(Duration::from_secs(1)).await.is_err());
    }

    struct Faulty;

    impl Reducer for Faulty {
        type State = TestState;
        type Action = TestAction;

        fn check(&self, _: &mut TestState, action: &TestAction) -> Result<(), ReduceError> {
            match action {
                TestAction::Increment => Ok(()),
                _ => Err(ReduceError::RoutingMismatch {
                    field: "missing",
                    action: action.name(),
                }),
            }
        }

        fn reduce(&self, state: &mut TestState, action: TestAction) -> Reduced<TestAction> {
            match action {
                TestAction::Increment => {
                    state.counter += 1;
                    Ok(DispatchResult::changed())
                }
                _ => Err(ReduceError::RoutingMismatch {
                    field: "missing",
                    action: action.name(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_drain_skips_rejected_action_and_continues() {
        let mut store = Store::new(TestState::default(), Faulty);
        let handle = store.handle();

        handle.send(TestAction::Increment).unwrap();
        handle.send(TestAction::NoOp).unwrap();
        handle.send(TestAction::Increment).unwrap();

        let processed = store.drain_pending().unwrap();
        assert_eq!(processed, vec![TestAction::Increment, TestAction::Increment]);
        assert_eq!(store.state().counter, 2);
        assert!(store.drain_pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_process_next_reports_rejected_action() {
        let mut store = Store::new(TestState::default(), Faulty);
        let handle = store.handle();

        handle.send(TestAction::NoOp).unwrap();
        handle.send(TestAction::Increment).unwrap();

        assert!(matches!(
            store.process_next().await,
            Err(StoreError::Reduce(ReduceError::RoutingMismatch { action: "NoOp", .. }))
        ));
        assert_eq!(store.process_next().await.unwrap(), TestAction::Increment);
        assert_eq!(store.state().counter, 1);
    }

    #[tokio::test]
    async fn test_delivered_one_shots_release_their_ids() {
        let mut store = Store::new(TestState::default(), from_fn(test_reducer));

        for n in 0..50 {
            store
                .effects_mut()
                .apply(Effect::keyed(format!("load-{n}"), async move { TestAction::DidLoad(n) }));
        }
        settle(8).await;

        let processed = store.drain_pending().unwrap();
        assert_eq!(processed.len(), 50);
        assert_eq!(store.state().counter, (0..50).sum::<i32>());
        assert_eq!(store.effects().tracked_ids(), (0, 0));
    }

    #[tokio::test]
    async fn test_reducer_fault_surfaces() {
        let mut store = Store::new(TestState::default(), Faulty);

        let err = store.dispatch(TestAction::Load).unwrap_err();
        assert_eq!(
            err,
            StoreError::Reduce(ReduceError::RoutingMismatch {
                field: "missing",
                action: "Load",
            })
        );

        // The store stays usable
        assert!(store.dispatch(TestAction::Increment).unwrap());
        assert!(store.effects().is_empty());
    }
}
