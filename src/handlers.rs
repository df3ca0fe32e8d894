//! Handlers decide what happens to each failure a scope hands over.
//!
//! A [`Handler`] wraps a sink (a function receiving each [`Failure`]) and two
//! filter sets:
//!
//! - `ignore`: matching failures are dropped silently.
//! - `propagate`: matching failures are raised again instead of being sunk.
//!
//! For every leaf failure, `ignore` is checked first, then `propagate`, and
//! only then is the sink called. This is captured by [`Handler::apply`], which
//! reports the [`Action`] taken. [`Handler::handle`] walks a whole
//! [`Failures`] tree and raises all propagated leaves together once the others
//! have been dealt with.
//!
//! Handlers compose: [`filtered`] restricts a handler to failures matching a
//! filter and [`combine`] fans each failure out to several handlers.
//!
//! # Examples
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use faultscope::{Filter, Handler, Scope, error::Message};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("fatal")]
//! struct Fatal;
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = {
//!     let seen = seen.clone();
//!     Handler::new(move |failure| seen.lock().unwrap().push(failure.source().to_string()))
//! }
//! .ignore("*.optional")
//! .propagate(Filter::error::<Fatal>());
//!
//! let root = Scope::builder("job").handler(sink).build().unwrap();
//! root.run(|root| {
//!     root.child("optional")?.run(|_| Err::<(), _>(Message::new("skipped")))?;
//!     root.child("step")?.run(|_| Err::<(), _>(Message::new("recorded")))?;
//!     Ok::<_, faultscope::Error>(())
//! })
//! .unwrap();
//! assert_eq!(*seen.lock().unwrap(), ["job.step"]);
//!
//! let error = root.run(|_| Err::<(), _>(Fatal)).unwrap_err();
//! assert_eq!(error.label().unwrap(), "job");
//! ```

use alloc::{sync::Arc, vec::Vec};
use core::fmt;

use crate::{
    Error, Failure, Failures, Filter, ValidationError,
    hooks::builtin_hooks::console::ConsoleSink,
};

/// What a handler did with a failure.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    /// The failure was delivered to a sink.
    Handled,
    /// The failure was dropped.
    Ignored,
    /// The failure has to be raised again.
    Propagated,
}

type Sink = Arc<dyn Fn(&Failure) + Send + Sync>;

enum Node {
    Sink(Sink),
    Filtered { handler: Handler, filter: Filter },
    Combined(Vec<Handler>),
}

/// A failure sink with `ignore` and `propagate` filter sets.
///
/// Cloning a handler is cheap; clones share the same sink.
#[derive(Clone)]
pub struct Handler {
    node: Arc<Node>,
    ignore: Vec<Filter>,
    propagate: Vec<Filter>,
}

impl Handler {
    /// Creates a handler delivering every failure to `sink`.
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&Failure) + Send + Sync + 'static,
    {
        Self::from_node(Node::Sink(Arc::new(sink)))
    }

    /// Creates a handler whose sink does nothing.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Creates a handler printing failures with the [`ConsoleSink`]
    /// configured from the environment.
    pub fn console() -> Self {
        ConsoleSink::from_env().into_handler()
    }

    fn from_node(node: Node) -> Self {
        Self {
            node: Arc::new(node),
            ignore: Vec::new(),
            propagate: Vec::new(),
        }
    }

    /// Adds a filter to the `ignore` set.
    #[must_use]
    pub fn ignore(mut self, filter: impl Into<Filter>) -> Self {
        insert_unique(&mut self.ignore, filter.into());
        self
    }

    /// Adds a filter to the `propagate` set.
    #[must_use]
    pub fn propagate(mut self, filter: impl Into<Filter>) -> Self {
        insert_unique(&mut self.propagate, filter.into());
        self
    }

    /// Returns the `ignore` set.
    pub fn ignored(&self) -> &[Filter] {
        &self.ignore
    }

    /// Returns the `propagate` set.
    pub fn propagated(&self) -> &[Filter] {
        &self.propagate
    }

    /// Returns `true` if both handlers share the same sink and filters.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
            && self.ignore == other.ignore
            && self.propagate == other.propagate
    }

    /// Dispatches a single failure.
    pub fn apply(&self, failure: &Failure) -> Action {
        if self.ignore.iter().any(|filter| filter.matches(failure)) {
            return Action::Ignored;
        }
        if self.propagate.iter().any(|filter| filter.matches(failure)) {
            return Action::Propagated;
        }
        match &*self.node {
            Node::Sink(sink) => {
                sink(failure);
                Action::Handled
            }
            Node::Filtered { handler, filter } => {
                if filter.matches(failure) {
                    handler.apply(failure)
                } else {
                    Action::Ignored
                }
            }
            Node::Combined(handlers) => {
                // Every member sees the failure, whatever the others did.
                handlers
                    .iter()
                    .map(|handler| handler.apply(failure))
                    .fold(Action::Ignored, |acc, action| match (acc, action) {
                        (Action::Propagated, _) | (_, Action::Propagated) => Action::Propagated,
                        (Action::Handled, _) | (_, Action::Handled) => Action::Handled,
                        _ => Action::Ignored,
                    })
            }
        }
    }

    /// Dispatches every leaf of `failures`.
    ///
    /// If any leaf holds a [`ValidationError`], it is returned as a
    /// validation error before a single leaf is dispatched, whatever the
    /// filters say. Propagated failures are returned together as one labeled
    /// [`Error`] after all other leaves were dispatched.
    pub fn handle(&self, failures: &Failures) -> Result<(), Error> {
        if let Some(validation) = failures
            .iter()
            .find_map(|failure| failure.error().downcast_ref::<ValidationError>())
        {
            return Err(validation.clone().into());
        }

        let mut propagated = Vec::new();
        for failure in failures {
            if self.apply(failure) == Action::Propagated {
                propagated.push(Failures::Single(failure.clone()));
            }
        }
        match Failures::from_vec(propagated) {
            None => Ok(()),
            Some(failures) => Err(Error::from(failures)),
        }
    }

    /// Handles the labeled failures of a raised [`Error`].
    ///
    /// `Ok` values are passed through as `Some`. An error carrying labeled
    /// failures is handled and turned into `Ok(None)` unless the handler
    /// propagates some of them. Other errors are returned unchanged.
    pub fn catch<T>(&self, result: Result<T, Error>) -> Result<Option<T>, Error> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                let failures = error.into_failures()?;
                self.handle(&failures)?;
                Ok(None)
            }
        }
    }
}

impl Default for Handler {
    /// The console handler.
    fn default() -> Self {
        Self::console()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Handler");
        match &*self.node {
            Node::Sink(_) => debug.field("sink", &format_args!("..")),
            Node::Filtered { handler, filter } => debug
                .field("handler", handler)
                .field("filter", filter),
            Node::Combined(handlers) => debug.field("combined", handlers),
        };
        debug
            .field("ignore", &self.ignore)
            .field("propagate", &self.propagate)
            .finish()
    }
}

fn insert_unique(filters: &mut Vec<Filter>, filter: Filter) {
    if !filters.contains(&filter) {
        filters.push(filter);
    }
}

/// Extends `base` with additional `ignore` and `propagate` filters.
///
/// The filter sets are merged into the existing ones, so wrapping a handler
/// repeatedly never nests it.
pub fn handler(
    base: Handler,
    ignore: impl IntoIterator<Item = Filter>,
    propagate: impl IntoIterator<Item = Filter>,
) -> Handler {
    let base = ignore.into_iter().fold(base, Handler::ignore);
    propagate.into_iter().fold(base, Handler::propagate)
}

/// Restricts `handler` to the failures matching `filter`.
///
/// Failures not matching the filter are ignored. Filtering by
/// [`Filter::everything`] returns the handler unchanged.
pub fn filtered(handler: Handler, filter: impl Into<Filter>) -> Handler {
    let filter = filter.into();
    if filter.is_everything() {
        return handler;
    }
    Handler::from_node(Node::Filtered { handler, filter })
}

/// Builds a handler calling each of `handlers` in order for every failure.
///
/// The members run independently: one ignoring or propagating a failure does
/// not stop the next from seeing it. Fails with a [`ValidationError`] of kind
/// [`Type`](crate::error::ValidationKind::Type) if `handlers` is empty.
pub fn combine(handlers: impl IntoIterator<Item = Handler>) -> Result<Handler, ValidationError> {
    let mut members = Vec::new();
    for handler in handlers {
        match &*handler.node {
            Node::Combined(nested) if handler.ignore.is_empty() && handler.propagate.is_empty() => {
                members.extend(nested.iter().cloned());
            }
            _ => members.push(handler),
        }
    }
    match members.len() {
        0 => Err(ValidationError::type_error(
            "cannot define an empty list of failure handlers",
        )),
        1 => Ok(members.remove(0)),
        _ => Ok(Handler::from_node(Node::Combined(members))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{Label, error::ValidationKind};

    #[derive(Debug, thiserror::Error)]
    #[error("value")]
    struct ValueError;

    #[derive(Debug, thiserror::Error)]
    #[error("other")]
    struct OtherError;

    fn recorder() -> (Handler, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = {
            let seen = seen.clone();
            Handler::new(move |failure| seen.lock().unwrap().push(failure.source().to_string()))
        };
        (handler, seen)
    }

    fn failure(source: &str, error: impl core::error::Error + Send + Sync + 'static) -> Failure {
        Failure::new(Label::new(source).unwrap(), error)
    }

    #[test]
    fn test_ignore_takes_precedence_over_propagate() {
        let (sink, seen) = recorder();
        let handler = sink
            .ignore(Filter::error::<ValueError>())
            .propagate(Filter::everything());

        assert_eq!(handler.apply(&failure("a", ValueError)), Action::Ignored);
        assert_eq!(handler.apply(&failure("b", OtherError)), Action::Propagated);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_handle_raises_propagated_after_sinking() {
        let (sink, seen) = recorder();
        let handler = sink.propagate(Filter::error::<OtherError>());
        let failures = Failures::from_vec(vec![
            failure("a", OtherError).into(),
            failure("b", ValueError).into(),
            failure("c", OtherError).into(),
        ])
        .unwrap();

        let error = handler.handle(&failures).unwrap_err();
        assert_eq!(*seen.lock().unwrap(), ["b"]);
        let sources: Vec<_> = error
            .failures()
            .unwrap()
            .iter()
            .map(|f| f.source().to_string())
            .collect();
        assert_eq!(sources, ["a", "c"]);
    }

    #[test]
    fn test_validation_errors_are_never_handled() {
        let (sink, seen) = recorder();
        let handler = sink.ignore(Filter::everything());
        let failures = Failures::Single(failure("a", ValidationError::value("nope")));
        let error = handler.handle(&failures).unwrap_err();
        assert!(error.is_validation());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_validation_leaf_stops_dispatch_up_front() {
        let (sink, seen) = recorder();
        let failures = Failures::from_vec(vec![
            failure("a", ValueError).into(),
            failure("b", ValidationError::type_error("late")).into(),
        ])
        .unwrap();
        let error = sink.handle(&failures).unwrap_err();
        assert_eq!(error.validation(), Some(&ValidationError::type_error("late")));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_wrapping_unions_filters() {
        let (sink, _) = recorder();
        let wrapped = handler(
            handler(sink.clone(), [Filter::from("a")], []),
            [Filter::from("a"), Filter::from("b")],
            [Filter::error::<ValueError>()],
        );
        assert_eq!(wrapped.ignored(), [Filter::from("a"), Filter::from("b")]);
        assert_eq!(wrapped.propagated(), [Filter::error::<ValueError>()]);
        assert!(Arc::ptr_eq(&wrapped.node, &sink.node));
    }

    #[test]
    fn test_filtered_and_combined() {
        let (first, first_seen) = recorder();
        let (second, second_seen) = recorder();
        let combined = combine([
            filtered(first, "x.*"),
            second.propagate(Filter::error::<OtherError>()),
        ])
        .unwrap();

        assert_eq!(combined.apply(&failure("x.y", ValueError)), Action::Handled);
        assert_eq!(combined.apply(&failure("z", ValueError)), Action::Handled);
        assert_eq!(combined.apply(&failure("x.w", OtherError)), Action::Propagated);
        assert_eq!(*first_seen.lock().unwrap(), ["x.y", "x.w"]);
        assert_eq!(*second_seen.lock().unwrap(), ["x.y", "z"]);
    }

    #[test]
    fn test_combine_validation() {
        let error = combine(Vec::new()).unwrap_err();
        assert_eq!(error.kind(), ValidationKind::Type);

        let (sink, _) = recorder();
        assert!(combine([sink.clone()]).unwrap().ptr_eq(&sink));
        assert!(filtered(sink.clone(), "*").ptr_eq(&sink));
    }

    #[test]
    fn test_catch() {
        let (sink, seen) = recorder();
        let caught = sink.catch(Err::<(), _>(Error::from(failure("a.b", ValueError))));
        assert_eq!(caught.unwrap(), None);
        assert_eq!(*seen.lock().unwrap(), ["a.b"]);

        assert_eq!(sink.catch(Ok::<_, Error>(3)).unwrap(), Some(3));
        assert!(sink.catch(Err::<(), _>(Error::from(ValueError))).is_err());
    }

    #[test]
    fn test_handler_send_sync() {
        static_assertions::assert_impl_all!(Handler: Send, Sync, Clone);
    }
}
