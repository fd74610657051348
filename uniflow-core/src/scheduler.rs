//! Effect scheduler for async work started by reducers
//!
//! Provides lifecycle management for effect tasks with support for:
//! - Automatic cancellation when starting with an id that is already running
//! - Manual cancellation by id
//! - Cancelling everything when the owning store is torn down
//!
//! # Example
//!
//! ```ignore
//! use uniflow::{EffectId, EffectScheduler, Work};
//!
//! // Start a task; any existing task with the same id is cancelled
//! scheduler.start("timer", Work::new(|emitter| async move {
//!     loop {
//!         clock.sleep(Duration::from_secs(1)).await;
//!         if !emitter.emit(Action::TimerTicked) {
//!             break;
//!         }
//!     }
//! }));
//!
//! // Cancel a specific task
//! scheduler.cancel(&EffectId::new("timer"));
//!
//! // Cancel all tasks (e.g., on teardown)
//! scheduler.cancel_all();
//! ```
//!
//! # Stale deliveries
//!
//! Every started task is stamped with a generation. Starting or cancelling
//! an id retires its previous generation, and the store discards anything a
//! retired generation delivers. Combined with the cancellation token checked
//! by [`Emitter::emit`](crate::Emitter::emit), no action from a cancelled task
//! ever reaches a reducer.
//!
//! A keyed task that finished on its own is forgotten once the store has
//! consumed everything it emitted, so one-shot ids do not accumulate.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::effect::{Delivery, Effect, Emitter, Origin, Work};
use crate::Action;

/// Identifies a long-running effect for cancellation and replacement.
///
/// Effects with the same id are mutually exclusive - starting a new effect
/// with an id that's already running cancels the existing one.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct EffectId(String);

impl EffectId {
    /// Create a new effect id.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the id name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Namespace this id under a scoped field.
    pub fn scoped(&self, field: &str) -> Self {
        Self(format!("{field}.{}", self.0))
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EffectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EffectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&EffectId> for EffectId {
    fn from(id: &EffectId) -> Self {
        id.clone()
    }
}

/// Lifecycle of a keyed effect.
///
/// `Idle -> Running` on start, `Running -> Cancelled` on cancel,
/// `Cancelled -> Idle` once the abort is acknowledged, and
/// `Running -> Idle` on natural completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectStatus {
    Idle,
    Running,
    Cancelled,
}

struct ActiveTask {
    generation: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
    /// Deliveries sent but not yet consumed by the store.
    in_flight: Arc<AtomicUsize>,
}

impl ActiveTask {
    fn stop(&self) {
        self.token.cancel();
        self.handle.abort();
    }

    /// Finished, no emitter left alive and nothing still queued.
    fn is_spent(&self) -> bool {
        self.handle.is_finished()
            && Arc::strong_count(&self.in_flight) == 1
            && self.in_flight.load(Ordering::Acquire) == 0
    }
}

/// Runs effect tasks and routes their actions into a store inbox.
///
/// # Type Parameters
///
/// - `A`: The action type that tasks produce
pub struct EffectScheduler<A> {
    active: HashMap<EffectId, ActiveTask>,
    /// Cancelled keyed tasks whose abort has not been observed yet.
    stopping: HashMap<EffectId, Vec<JoinHandle<()>>>,
    anonymous: Vec<ActiveTask>,
    /// Current valid generation per id. Absent means nothing from that id is accepted.
    generations: HashMap<EffectId, u64>,
    /// Unkeyed tasks started before this generation were cancelled.
    anonymous_floor: u64,
    next_generation: u64,
    tx: mpsc::UnboundedSender<Delivery<A>>,
}

impl<A> fmt::Debug for EffectScheduler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectScheduler")
            .field("active", &self.active.keys().collect::<Vec<_>>())
            .field("anonymous", &self.anonymous.len())
            .finish()
    }
}

impl<A> EffectScheduler<A>
where
    A: Action,
{
    /// Create a scheduler delivering into `tx`.
    pub(crate) fn new(tx: mpsc::UnboundedSender<Delivery<A>>) -> Self {
        Self {
            active: HashMap::new(),
            stopping: HashMap::new(),
            anonymous: Vec::new(),
            generations: HashMap::new(),
            anonymous_floor: 0,
            next_generation: 0,
            tx,
        }
    }

    /// Apply an effect returned by a reducer.
    pub fn apply(&mut self, effect: Effect<A>) {
        match effect {
            Effect::Start { id: Some(id), work } => {
                self.start(id, work);
            }
            Effect::Start { id: None, work } => {
                self.spawn(work);
            }
            Effect::Cancel(id) => self.cancel(&id),
        }
    }

    /// Start a task under `id`, cancelling any existing task with the same id.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, id: impl Into<EffectId>, work: Work<A>) -> &mut Self {
        let id = id.into();

        // Cancel existing task with this id
        self.cancel(&id);

        let generation = self.bump();
        let token = CancellationToken::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let emitter = Emitter::tracked(
            self.tx.clone(),
            Some(Origin {
                id: Some(id.clone()),
                generation,
            }),
            token.clone(),
            in_flight.clone(),
        );
        let handle = tokio::spawn(work.into_future(emitter));

        tracing::trace!(effect = %id, generation, "effect started");
        self.generations.insert(id.clone(), generation);
        self.active.insert(
            id,
            ActiveTask {
                generation,
                token,
                handle,
                in_flight,
            },
        );
        self
    }

    /// Start an unkeyed task. It only stops on its own or via [`cancel_all`](Self::cancel_all).
    pub fn spawn(&mut self, work: Work<A>) -> &mut Self {
        self.anonymous.retain(|task| !task.handle.is_finished());
        self.prune_finished();

        let generation = self.bump();
        let token = CancellationToken::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let emitter = Emitter::tracked(
            self.tx.clone(),
            Some(Origin {
                id: None,
                generation,
            }),
            token.clone(),
            in_flight.clone(),
        );
        let handle = tokio::spawn(work.into_future(emitter));

        self.anonymous.push(ActiveTask {
            generation,
            token,
            handle,
            in_flight,
        });
        self
    }

    /// Cancel a task by id.
    ///
    /// If no task is running under the id, this is a no-op apart from
    /// discarding anything it already delivered.
    pub fn cancel(&mut self, id: &EffectId) {
        self.prune_stopping();
        self.prune_finished();
        self.generations.remove(id);
        if let Some(task) = self.active.remove(id) {
            task.stop();
            tracing::trace!(effect = %id, generation = task.generation, "effect cancelled");
            if !task.handle.is_finished() {
                self.stopping.entry(id.clone()).or_default().push(task.handle);
            }
        }
    }

    /// Cancel all running tasks.
    pub fn cancel_all(&mut self) {
        let ids: Vec<EffectId> = self.active.keys().cloned().collect();
        for id in ids {
            self.cancel(&id);
        }
        self.generations.clear();
        for task in self.anonymous.drain(..) {
            task.stop();
        }
        self.anonymous_floor = self.next_generation;
    }

    /// Whether a delivery from `origin` may still reach the reducer.
    pub(crate) fn accepts(&self, origin: &Origin) -> bool {
        match &origin.id {
            Some(id) => self.generations.get(id) == Some(&origin.generation),
            None => origin.generation >= self.anonymous_floor,
        }
    }

    /// Record that the store consumed an accepted delivery from `origin`.
    ///
    /// Forgets the task once it has finished and this was its last queued
    /// delivery.
    pub(crate) fn delivered(&mut self, origin: &Origin) {
        let Some(id) = &origin.id else {
            return;
        };
        let Some(task) = self.active.get(id) else {
            return;
        };
        if task.generation != origin.generation {
            return;
        }
        // Saturate so an untracked delivery cannot wrap the counter
        let _ = task
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if task.is_spent() {
            self.forget(id);
        }
    }

    /// Current lifecycle state of the task under `id`.
    pub fn status(&self, id: &EffectId) -> EffectStatus {
        if self
            .active
            .get(id)
            .is_some_and(|task| !task.handle.is_finished())
        {
            return EffectStatus::Running;
        }
        let stopping = self
            .stopping
            .get(id)
            .is_some_and(|handles| handles.iter().any(|h| !h.is_finished()));
        if stopping {
            EffectStatus::Cancelled
        } else {
            EffectStatus::Idle
        }
    }

    /// Check if a task with the given id is currently running.
    pub fn is_running(&self, id: &EffectId) -> bool {
        self.status(id) == EffectStatus::Running
    }

    /// Get the number of running keyed tasks.
    pub fn len(&self) -> usize {
        self.active
            .values()
            .filter(|task| !task.handle.is_finished())
            .count()
    }

    /// Check if there are no running keyed tasks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the ids of all running tasks.
    pub fn running_ids(&self) -> impl Iterator<Item = &EffectId> {
        self.active
            .iter()
            .filter(|(_, task)| !task.handle.is_finished())
            .map(|(id, _)| id)
    }

    fn prune_stopping(&mut self) {
        self.stopping.retain(|_, handles| {
            handles.retain(|h| !h.is_finished());
            !handles.is_empty()
        });
    }

    /// Forget keyed tasks that finished and have nothing left in the inbox.
    fn prune_finished(&mut self) {
        let spent: Vec<EffectId> = self
            .active
            .iter()
            .filter(|(_, task)| task.is_spent())
            .map(|(id, _)| id.clone())
            .collect();
        for id in spent {
            self.forget(&id);
        }
    }

    fn forget(&mut self, id: &EffectId) {
        if let Some(task) = self.active.remove(id) {
            tracing::trace!(effect = %id, generation = task.generation, "effect finished");
        }
        self.generations.remove(id);
    }

    /// Number of ids with bookkeeping still held, as `(tasks, generations)`.
    #[cfg(test)]
    pub(crate) fn tracked_ids(&self) -> (usize, usize) {
        (self.active.len(), self.generations.len())
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}

impl<A> Drop for EffectScheduler<A> {
    fn drop(&mut self) {
        // Abort all running tasks on drop
        for (_, task) in self.active.drain() {
            task.stop();
        }
        for task in self.anonymous.drain(..) {
            task.stop();
        }
    }
}
