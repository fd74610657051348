//! Reducer composition over named state fields
//!
//! A parent feature embeds child features as fields of its state and as
//! variants of its action enum. [`Scope`] describes how to reach one child:
//! the field's name, a lens onto the child state, a way to pick the child's
//! action out of a parent action, and the variant constructor that wraps
//! child actions back up. [`Combine`] runs the matching child before the
//! parent for every dispatched action.
//!
//! # Example
//!
//! ```ignore
//! let reducer = Combine::new(from_fn(dashboard))
//!     .scope(Scope::new(
//!         "counter",
//!         from_fn(counter),
//!         |s: &mut DashboardState| &mut s.counter,
//!         |a: &DashboardAction| match a {
//!             DashboardAction::Counter(a) => Some(a),
//!             _ => None,
//!         },
//!         DashboardAction::Counter,
//!     ));
//! ```
//!
//! A child only ever sees its own slice and its own actions. Its effects
//! are re-tagged on the way out: emitted actions are wrapped with the
//! variant constructor and effect ids are namespaced by the field name, so
//! `timer` inside `stopwatch` becomes `stopwatch.timer`.

use std::fmt;

use crate::effect::DispatchResult;
use crate::error::ReduceError;
use crate::reducer::{Reduced, Reducer};
use crate::Action;

enum Lens<P, C> {
    Required(fn(&mut P) -> &mut C),
    Optional(fn(&mut P) -> Option<&mut C>),
}

/// Routing for one child reducer inside a parent.
pub struct Scope<C: Reducer, PS, PA> {
    field: &'static str,
    child: C,
    lens: Lens<PS, C::State>,
    extract: fn(&PA) -> Option<&C::Action>,
    embed: fn(C::Action) -> PA,
}

impl<C: Reducer, PS, PA> fmt::Debug for Scope<C, PS, PA> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("field", &self.field)
            .field("optional", &matches!(self.lens, Lens::Optional(_)))
            .finish()
    }
}

impl<C: Reducer, PS, PA> Scope<C, PS, PA> {
    /// Scope a child whose state is always present.
    pub fn new(
        field: &'static str,
        child: C,
        lens: fn(&mut PS) -> &mut C::State,
        extract: fn(&PA) -> Option<&C::Action>,
        embed: fn(C::Action) -> PA,
    ) -> Self {
        Self {
            field,
            child,
            lens: Lens::Required(lens),
            extract,
            embed,
        }
    }

    /// Scope a child whose state may be absent.
    ///
    /// A child action arriving while the state is `None` is a
    /// [`ReduceError::RoutingMismatch`].
    pub fn optional(
        field: &'static str,
        child: C,
        lens: fn(&mut PS) -> Option<&mut C::State>,
        extract: fn(&PA) -> Option<&C::Action>,
        embed: fn(C::Action) -> PA,
    ) -> Self {
        Self {
            field,
            child,
            lens: Lens::Optional(lens),
            extract,
            embed,
        }
    }

    /// Name of the scoped field.
    pub fn field(&self) -> &'static str {
        self.field
    }
}

/// Object-safe view of a [`Scope`] so children of different types can share a list.
trait ChildReducer<PS, PA> {
    fn field(&self) -> &'static str;

    /// Fault this child would raise for `action`, if any.
    fn check(&self, state: &mut PS, action: &PA) -> Result<(), ReduceError>;

    /// `None` when the action does not target this child.
    fn reduce(&self, state: &mut PS, action: &PA) -> Option<Reduced<PA>>;
}

impl<C, PS, PA> ChildReducer<PS, PA> for Scope<C, PS, PA>
where
    C: Reducer,
    PA: Action,
{
    fn field(&self) -> &'static str {
        self.field
    }

    fn check(&self, state: &mut PS, action: &PA) -> Result<(), ReduceError> {
        match (self.extract)(action) {
            Some(child_action) => {
                let slice = self.slice(state, child_action)?;
                self.child.check(slice, child_action)
            }
            None => Ok(()),
        }
    }

    fn reduce(&self, state: &mut PS, action: &PA) -> Option<Reduced<PA>> {
        let child_action = (self.extract)(action)?;

        let slice = match self.slice(state, child_action) {
            Ok(slice) => slice,
            Err(error) => return Some(Err(error)),
        };

        Some(
            self.child
                .reduce(slice, child_action.clone())
                .map(|result| result.scoped(self.field, self.embed)),
        )
    }
}

impl<C: Reducer, PS, PA> Scope<C, PS, PA> {
    fn slice<'s>(
        &self,
        state: &'s mut PS,
        child_action: &C::Action,
    ) -> Result<&'s mut C::State, ReduceError> {
        match &self.lens {
            Lens::Required(lens) => Ok(lens(state)),
            Lens::Optional(lens) => lens(state).ok_or(ReduceError::RoutingMismatch {
                field: self.field,
                action: child_action.name(),
            }),
        }
    }
}

/// A parent reducer combined with its scoped children.
///
/// For each action, every child whose `extract` matches runs first on its
/// own slice; the parent then runs on the updated state with the original
/// action. Effects are returned in that same order.
///
/// The action is checked against every matching child and the parent
/// before anything runs. If any of them would fault, the action is rejected
/// as a whole: no slice is written and no effect is returned.
pub struct Combine<P: Reducer> {
    parent: P,
    children: Vec<Box<dyn ChildReducer<P::State, P::Action>>>,
}

impl<P: Reducer> fmt::Debug for Combine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combine")
            .field("fields", &self.fields().collect::<Vec<_>>())
            .finish()
    }
}

impl<P> Combine<P>
where
    P: Reducer,
    P::State: 'static,
{
    /// Start a composition from the parent's own reducer.
    pub fn new(parent: P) -> Self {
        Self {
            parent,
            children: Vec::new(),
        }
    }

    /// Attach a child reducer.
    ///
    /// # Panics
    ///
    /// Panics if the field is already scoped on this parent.
    pub fn scope<C>(mut self, scope: Scope<C, P::State, P::Action>) -> Self
    where
        C: Reducer + 'static,
        C::State: 'static,
    {
        assert!(
            self.children.iter().all(|child| child.field() != scope.field),
            "field `{}` is already scoped",
            scope.field
        );
        self.children.push(Box::new(scope));
        self
    }
}

impl<P: Reducer> Combine<P> {
    /// Names of the scoped fields, in attachment order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.children.iter().map(|child| child.field())
    }
}

impl<P: Reducer> Reducer for Combine<P> {
    type State = P::State;
    type Action = P::Action;

    fn reduce(&self, state: &mut P::State, action: P::Action) -> Reduced<P::Action> {
        // Nothing is written until every participant has accepted the action
        self.check(state, &action)?;

        let mut result = DispatchResult::unchanged();

        for child in &self.children {
            if let Some(reduced) = child.reduce(state, &action) {
                result.merge(reduced?);
            }
        }

        result.merge(self.parent.reduce(state, action)?);
        Ok(result)
    }

    fn check(&self, state: &mut P::State, action: &P::Action) -> Result<(), ReduceError> {
        for child in &self.children {
            child.check(state, action)?;
        }
        self.parent.check(state, action)
    }
}
