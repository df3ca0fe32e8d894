//! Scopes label the code they run and decide what happens to its failures.
//!
//! A [`Scope`] is a node in a tree of named contexts. Its label is the label
//! of its parent followed by its own name, so the scope `"step[2]"` derived
//! from `"import.files"` is labeled `"import.files.step[2]"`.
//!
//! # Where failures go
//!
//! Failures are stored at *aggregation points*: the root of a tree and every
//! scope that was given its own [`Handler`] or [`Severity`]. Every other
//! scope forwards what it captures to the nearest aggregation point above it
//! and never raises anything itself. This lets a single outer scope collect
//! the failures of many inner steps without any of them aborting the caller.
//!
//! When a scope exits (see [`Scope::run`] and [`Scope::handle`]):
//!
//! 1. A [`ValidationError`](crate::ValidationError) is returned unchanged.
//! 2. Any other error is captured as a [`Failure`] labeled with this scope.
//!    Failures raised by another scope tree are relabeled under this scope;
//!    failures raised earlier in the same tree already carry their full
//!    label.
//! 3. A non-aggregating scope forwards the failure and is done.
//! 4. An aggregation point takes everything it collected, appends its own
//!    failure and either hands the lot to its handler or, without a handler,
//!    raises it as a labeled [`Error`].
//!
//! Panics are never caught: they unwind through every scope untouched.
//!
//! # Examples
//!
//! ```
//! use faultscope::{Scope, error::Message};
//!
//! let root = Scope::new("import").unwrap();
//! let error = root
//!     .run(|root| {
//!         for index in 0..3 {
//!             let step = root.child(&format!("step[{index}]"))?;
//!             step.run(|_| {
//!                 if index == 1 {
//!                     return Err(Message::new("corrupt"));
//!                 }
//!                 Ok(())
//!             })?;
//!         }
//!         Ok::<_, faultscope::Error>(())
//!     })
//!     .unwrap_err();
//!
//! assert_eq!(error.label().unwrap(), "import.step[1]");
//! ```

mod builder;
mod call;

use alloc::vec::Vec;
use core::{
    cell::RefCell,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;

pub use self::{
    builder::ScopeBuilder,
    call::{ParentScope, scoped, scoped_with},
};
use crate::{
    Details, Error, Failure, Failures, Filter, Handler, Label, ValidationError, details::Value,
    error::Repr,
};

/// Identifies the tree a scope belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct TreeId(u64);

impl TreeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        TreeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// How strictly a scope treats its failures.
///
/// Severity is shorthand for handler configuration:
///
/// - [`Optional`](Severity::Optional) ignores every failure.
/// - [`Normal`](Severity::Normal) leaves the handler as configured.
/// - [`Required`](Severity::Required) raises every failure.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Severity {
    /// Failures are dropped.
    Optional,
    /// Failures go to the configured handler, or are raised without one.
    #[default]
    Normal,
    /// Failures are raised.
    Required,
}

impl Severity {
    /// Returns the handler a scope with this severity uses, given the
    /// configured one.
    pub fn apply(self, handler: Option<Handler>) -> Option<Handler> {
        match self {
            Severity::Normal => handler,
            Severity::Optional => Some(handler.unwrap_or_else(Handler::noop).ignore(Filter::EVERYTHING)),
            Severity::Required => {
                Some(handler.unwrap_or_else(Handler::noop).propagate(Filter::EVERYTHING))
            }
        }
    }
}

/// A labeled context collecting and dispatching failures.
///
/// Scopes are cheap to create. A child borrows its parent, so the borrow
/// checker guarantees that parents outlive their children. Scopes are meant
/// to follow the call stack and are neither [`Send`] nor [`Sync`].
pub struct Scope<'p> {
    name: Label,
    label: Label,
    parent: Option<&'p Scope<'p>>,
    tree: TreeId,
    details: Details,
    handler: Option<Handler>,
    severity: Severity,
    aggregates: bool,
    children: RefCell<HashSet<Label, FxBuildHasher>>,
    failures: RefCell<Vec<Failures>>,
}

/// Another name for [`Scope`].
///
/// Roots created with [`Scope::reporter`] use the default handler, those
/// created with [`Scope::new`] have none.
pub type Reporter<'p> = Scope<'p>;

impl Scope<'static> {
    /// Creates a root scope without a handler.
    ///
    /// Failures reaching a root scope without a handler are raised as a
    /// labeled [`Error`] when it exits.
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        ScopeBuilder::new(name).build()
    }

    /// Starts building a root scope.
    pub fn builder(name: &str) -> ScopeBuilder<'static> {
        ScopeBuilder::new(name)
    }

    /// Creates a root scope handled by [`hooks::default_handler`].
    ///
    /// Unlike [`Scope::new`], failures reaching it are sunk rather than
    /// raised: by the first registered handler, or by the console handler
    /// when none is registered.
    ///
    /// [`hooks::default_handler`]: crate::hooks::default_handler
    pub fn reporter(name: &str) -> Result<Self, ValidationError> {
        ScopeBuilder::new(name).default_handler().build()
    }
}

impl<'p> Scope<'p> {
    /// Derives a child scope inheriting this scope's details, handler and
    /// severity.
    ///
    /// Fails if `name` is not a valid label or if a child with the same name
    /// was derived before.
    pub fn child(&self, name: &str) -> Result<Scope<'_>, ValidationError> {
        self.derive(name).build()
    }

    /// Starts building a child scope.
    pub fn derive(&self, name: &str) -> ScopeBuilder<'_> {
        ScopeBuilder::with_parent(name, self)
    }

    /// Returns the name of this scope.
    pub fn name(&self) -> &Label {
        &self.name
    }

    /// Returns the fully qualified label of this scope.
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Returns the parent scope.
    pub fn parent(&self) -> Option<&'p Scope<'p>> {
        self.parent
    }

    /// Returns the root of the tree this scope belongs to.
    pub fn root(&self) -> &Scope<'_> {
        let mut node: &Scope<'_> = self;
        while let Some(parent) = node.parent {
            node = parent;
        }
        node
    }

    /// Returns `true` if this scope has a parent.
    pub fn is_bound(&self) -> bool {
        self.parent.is_some()
    }

    /// Returns `true` if failures are stored in this scope rather than
    /// forwarded to its parent.
    pub fn is_aggregation_point(&self) -> bool {
        self.aggregates
    }

    /// Returns the configured handler, before [`Severity`] is applied.
    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    /// Returns the severity of this scope.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the details attached to failures of this scope, inherited ones
    /// included.
    pub fn details(&self) -> &Details {
        &self.details
    }

    /// Returns the failures collected so far by the aggregation point this
    /// scope reports to.
    pub fn failures(&self) -> Vec<Failure> {
        self.aggregator()
            .failures
            .borrow()
            .iter()
            .flat_map(|failures| failures.iter().cloned())
            .collect()
    }

    /// Records `error` as a failure of this scope without exiting it.
    ///
    /// `details` are added on top of the scope details. Validation errors are
    /// returned instead of being recorded.
    pub fn report(&self, error: impl Into<Error>, details: Details) -> Result<(), Error> {
        let failures = match error.into().into_repr() {
            Repr::Domain(cause) => Failure::new(self.label.clone(), cause)
                .with_details(self.details.merged(&details))
                .into(),
            repr => {
                let mut failures = self.capture(Error::from_repr(repr))?;
                failures.inherit_details(&details);
                failures
            }
        };
        self.aggregator().store(reject_validation(failures)?);
        Ok(())
    }

    /// Records `error` under this scope without exiting it.
    ///
    /// A plain error needs a `label`, relative to this scope; without one a
    /// [`ValidationError`] is returned. Labeled failures raised by another
    /// scope tree are relabeled with `label` (when given) and this scope.
    /// Labeled failures raised by this tree already carry their full label and
    /// are stored as they are.
    pub fn add_failure(&self, error: impl Into<Error>, label: Option<&str>) -> Result<(), Error> {
        let error = error.into();
        let label = label.map(Label::new).transpose()?;
        let failures = match error.into_repr() {
            Repr::Validation(validation) => return Err(validation.into()),
            Repr::Domain(cause) => {
                if let Some(validation) = cause.downcast_ref::<ValidationError>() {
                    return Err(validation.clone().into());
                }
                let Some(label) = label else {
                    return Err(ValidationError::value("the error must be labeled").into());
                };
                Failure::new(self.label.join(&label), cause)
                    .with_details(self.details.clone())
                    .into()
            }
            Repr::Failed { origin, failures } if origin == Some(self.tree) => failures,
            Repr::Failed { mut failures, .. } => {
                if let Some(label) = &label {
                    failures = failures.within(label);
                }
                failures.inherit_details(&self.details);
                failures.within(&self.label)
            }
        };
        self.aggregator().store(reject_validation(failures)?);
        Ok(())
    }

    /// Runs the exit protocol of this scope.
    ///
    /// `raised` is the error the scope body ended with, if any. Returns `Ok`
    /// when every failure was forwarded, handled or ignored, and `Err` when
    /// something has to be raised to the caller.
    pub fn handle(&self, raised: Option<Error>) -> Result<(), Error> {
        let own = raised.map(|error| self.capture(error)).transpose()?;

        if !self.aggregates {
            if let Some(failures) = own {
                self.aggregator().store(failures);
            }
            return Ok(());
        }

        let mut collected = self.failures.take();
        collected.extend(own);
        let Some(failures) = Failures::from_vec(collected) else {
            return Ok(());
        };

        match self.severity.apply(self.handler.clone()) {
            Some(handler) => handler.handle(&failures).map_err(|error| self.claim(error)),
            None => Err(Error::failed(Some(self.tree), failures)),
        }
    }

    /// Turns a raised error into failures labeled for this scope.
    ///
    /// Validation errors are returned as such, including those wrapped in a
    /// [`Cause`](crate::Cause) or hidden in a leaf of a failure group.
    fn capture(&self, error: Error) -> Result<Failures, Error> {
        let failures = match error.into_repr() {
            Repr::Validation(validation) => return Err(validation.into()),
            Repr::Failed { origin, failures } if origin == Some(self.tree) => failures,
            Repr::Failed { mut failures, .. } => {
                failures.inherit_details(&self.details);
                failures.within(&self.label)
            }
            Repr::Domain(cause) => Failure::new(self.label.clone(), cause)
                .with_details(self.details.clone())
                .into(),
        };
        reject_validation(failures)
    }

    /// Marks failures raised by this scope's handler as coming from this
    /// tree.
    fn claim(&self, error: Error) -> Error {
        match error.into_repr() {
            Repr::Failed { failures, .. } => Error::failed(Some(self.tree), failures),
            repr => Error::from_repr(repr),
        }
    }

    fn aggregator(&self) -> &Scope<'_> {
        let mut node: &Scope<'_> = self;
        while !node.aggregates {
            match node.parent {
                Some(parent) => node = parent,
                None => break,
            }
        }
        node
    }

    fn store(&self, failures: Failures) {
        self.failures.borrow_mut().push(failures);
    }

    fn register_child(&self, name: &Label) -> Result<(), ValidationError> {
        if self.children.borrow_mut().insert(name.clone()) {
            Ok(())
        } else {
            Err(ValidationError::value(alloc::format!(
                "'{}' label has been used previously",
                self.label.join(name)
            )))
        }
    }

    /// Adds a detail to this scope.
    ///
    /// Only failures captured after the call carry it. Children derived
    /// before the call do not see it.
    pub fn set_detail(&mut self, key: impl Into<alloc::string::String>, value: impl Into<Value>) {
        self.details.insert(key, value);
    }
}

fn reject_validation(failures: Failures) -> Result<Failures, Error> {
    if let Some(validation) = failures
        .iter()
        .find_map(|failure| failure.error().downcast_ref::<ValidationError>())
    {
        return Err(validation.clone().into());
    }
    Ok(failures)
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Scope").field(&self.label.as_str()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Message, ValidationKind};

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    fn sources(failures: &[Failure]) -> Vec<String> {
        failures.iter().map(|f| f.source().to_string()).collect()
    }

    #[test]
    fn test_labels_and_tree() {
        let root = Scope::new("root").unwrap();
        let child = root.child("sub").unwrap();
        let grandchild = child.child("step[1]").unwrap();

        assert_eq!(grandchild.label(), "root.sub.step[1]");
        assert_eq!(grandchild.name(), "step[1]");
        assert_eq!(grandchild.root().label(), "root");
        assert_eq!(grandchild.parent().unwrap().label(), "root.sub");
        assert!(grandchild.is_bound());
        assert!(!root.is_bound());
        assert!(root.is_aggregation_point());
        assert!(!grandchild.is_aggregation_point());
        assert_eq!(alloc::format!("{grandchild:?}"), r#"Scope("root.sub.step[1]")"#);
    }

    #[test]
    fn test_reporter_has_the_default_handler() {
        let plain = Scope::new("plain").unwrap();
        assert!(plain.handler().is_none());

        let reporter = Scope::reporter("reporter").unwrap();
        assert!(reporter.handler().is_some());
        assert!(reporter.is_aggregation_point());
        let child = reporter.child("step").unwrap();
        assert!(child.handler().unwrap().ptr_eq(reporter.handler().unwrap()));

        assert!(Scope::reporter("bad name").is_err());
    }

    #[test]
    fn test_duplicate_child_names_are_rejected() {
        let root = Scope::new("root").unwrap();
        let _first = root.child("sub").unwrap();
        let error = root.child("sub").unwrap_err();
        assert_eq!(error.kind(), ValidationKind::Value);
        assert_eq!(error.message(), "'root.sub' label has been used previously");

        // Other parents may reuse the name
        let other = root.child("other").unwrap();
        assert!(other.child("sub").is_ok());
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        assert!(Scope::new("").is_err());
        let root = Scope::new("root").unwrap();
        assert!(root.child("a.").is_err());
        // A rejected name is not registered
        assert!(root.child("a").is_ok());
    }

    #[test]
    fn test_details_are_inherited() {
        let root = Scope::builder("root")
            .detail("run", 7)
            .detail("who", "root")
            .build()
            .unwrap();
        let child = root.derive("sub").detail("who", "sub").build().unwrap();
        assert_eq!(child.details().get("run"), Some(&Value::Int(7)));
        assert_eq!(child.details().get("who").unwrap(), "sub");
        assert_eq!(root.details().get("who").unwrap(), "root");
    }

    #[test]
    fn test_children_forward_to_the_root() {
        let root = Scope::new("root").unwrap();
        {
            let child = root.child("a").unwrap();
            assert!(child.handle(Some(Boom.into())).is_ok());
            let grandchild = child.child("b").unwrap();
            assert!(grandchild.handle(Some(Message::new("x").into())).is_ok());
        }
        assert_eq!(sources(&root.failures()), ["root.a", "root.a.b"]);

        let error = root.handle(None).unwrap_err();
        let leaves = error.failures().unwrap().to_vec();
        assert_eq!(sources(&leaves), ["root.a", "root.a.b"]);
        assert!(root.failures().is_empty());
    }

    #[test]
    fn test_root_failure_comes_last() {
        let root = Scope::new("root").unwrap();
        root.child("a").unwrap().handle(Some(Boom.into())).unwrap();
        let error = root.handle(Some(Boom.into())).unwrap_err();
        assert_eq!(
            sources(&error.failures().unwrap().to_vec()),
            ["root.a", "root"]
        );
    }

    #[test]
    fn test_validation_errors_pass_through() {
        let root = Scope::new("root").unwrap();
        let child = root.child("a").unwrap();
        let error = child
            .handle(Some(ValidationError::value("bad").into()))
            .unwrap_err();
        assert_eq!(error.validation(), Some(&ValidationError::value("bad")));
        assert!(root.failures().is_empty());
    }

    #[test]
    fn test_wrapped_validation_errors_pass_through() {
        let root = Scope::new("root").unwrap();
        let child = root.child("a").unwrap();

        let wrapped = crate::Cause::new(ValidationError::value("bad"));
        let error = child.handle(Some(wrapped.clone().into())).unwrap_err();
        assert_eq!(error.validation(), Some(&ValidationError::value("bad")));

        let error = root.report(wrapped.clone(), Details::new()).unwrap_err();
        assert!(error.is_validation());
        let error = root.add_failure(wrapped, None).unwrap_err();
        assert_eq!(error.validation(), Some(&ValidationError::value("bad")));

        let hidden = Failure::new(
            Label::new("x").unwrap(),
            ValidationError::type_error("hidden"),
        );
        let error = root.add_failure(hidden.clone(), None).unwrap_err();
        assert_eq!(error.validation(), Some(&ValidationError::type_error("hidden")));
        let error = root.handle(Some(hidden.into())).unwrap_err();
        assert!(error.is_validation());

        assert!(root.failures().is_empty());
    }

    #[test]
    fn test_collected_failures_survive_a_rejected_exit() {
        let root = Scope::new("root").unwrap();
        root.child("a").unwrap().handle(Some(Boom.into())).unwrap();

        let error = root
            .handle(Some(ValidationError::value("bad").into()))
            .unwrap_err();
        assert!(error.is_validation());
        assert_eq!(sources(&root.failures()), ["root.a"]);
    }

    #[test]
    fn test_same_tree_failures_are_not_relabeled() {
        let root = Scope::new("root").unwrap();
        let error = root.handle(Some(Boom.into())).unwrap_err();
        // Raised by `root`, seen again by `root`
        let again = root.handle(Some(error)).unwrap_err();
        assert_eq!(again.label().unwrap(), "root");
    }

    #[test]
    fn test_foreign_failures_are_relabeled_with_details() {
        let inner = Scope::builder("inner").detail("k", "inner").build().unwrap();
        let error = inner.handle(Some(Boom.into())).unwrap_err();

        let outer = Scope::builder("outer")
            .detail("k", "outer")
            .detail("o", true)
            .build()
            .unwrap();
        let error = outer.handle(Some(error)).unwrap_err();
        let failure = error.failure().unwrap();
        assert_eq!(failure.source(), "outer.inner");
        assert_eq!(failure.details().get("k").unwrap(), "inner");
        assert_eq!(failure.details().get("o"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_report_and_add_failure() {
        let root = Scope::builder("root").detail("d", 1).build().unwrap();
        root.report(Boom, details! { "extra" => "yes" }).unwrap();
        root.add_failure(Boom, Some("labeled")).unwrap();

        let foreign = Scope::new("fail").unwrap().handle(Some(Boom.into())).unwrap_err();
        root.add_failure(foreign, Some("labeled")).unwrap();

        let error = root.add_failure(Boom, None).unwrap_err();
        assert!(error.is_validation());
        let error = root.add_failure(Boom, Some("bad label")).unwrap_err();
        assert!(error.is_validation());

        let failures = root.failures();
        assert_eq!(sources(&failures), ["root", "root.labeled", "root.labeled.fail"]);
        assert_eq!(failures[0].details().get("extra").unwrap(), "yes");
        assert_eq!(failures[0].details().get("d"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_handler_bearing_child_aggregates() {
        let seen = alloc::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            Handler::new(move |failure| seen.lock().unwrap().push(failure.source().to_string()))
        };
        let root = Scope::new("root").unwrap();
        let child = root.derive("handled").handler(sink).build().unwrap();
        let grandchild = child.child("step").unwrap();

        grandchild.handle(Some(Boom.into())).unwrap();
        assert_eq!(sources(&grandchild.failures()), ["root.handled.step"]);
        child.handle(None).unwrap();

        assert_eq!(*seen.lock().unwrap(), ["root.handled.step"]);
        assert!(root.failures().is_empty());
        assert!(child.failures().is_empty());
    }

    #[test]
    fn test_severity() {
        let root = Scope::new("root").unwrap();

        let optional = root.derive("optional").severity(Severity::Optional).build().unwrap();
        assert!(optional.handle(Some(Boom.into())).is_ok());

        let required = root.derive("required").severity(Severity::Required).build().unwrap();
        let error = required.handle(Some(Boom.into())).unwrap_err();
        assert_eq!(error.label().unwrap(), "root.required");

        // Raised within the same tree, so the root keeps the label as is
        let error = root.handle(Some(error)).unwrap_err();
        assert_eq!(error.label().unwrap(), "root.required");

        let inherited = optional.child("inner").unwrap();
        assert_eq!(inherited.severity(), Severity::Optional);
    }

    #[test]
    fn test_scope_is_not_shareable() {
        static_assertions::assert_not_impl_any!(Scope<'static>: Send, Sync);
        static_assertions::assert_impl_all!(Severity: Send, Sync, Copy);
    }
}
