//! Labeled failures and groups of failures.
//!
//! A [`Failure`] is a leaf record: the label of the scope where an error
//! happened, the error itself and the details bound at that point. Failures
//! collected by a scope are kept in a [`FailureGroup`], which may nest other
//! groups. Iterating a group always yields the leaves only, depth-first and in
//! insertion order.
//!
//! [`Failures`] is either a single leaf or a group. It is what scopes hand to
//! handlers and what a raised [`Error`](crate::Error) carries.
//!
//! # Examples
//!
//! ```
//! use faultscope::{Failure, FailureGroup, Label, error::Message};
//!
//! let first = Failure::new(Label::new("parse").unwrap(), Message::new("bad header"));
//! let second = Failure::new(Label::new("load").unwrap(), Message::new("missing"));
//!
//! let inner = FailureGroup::from_iter([second]);
//! let group = FailureGroup::from_members([first.into(), inner.into()])
//!     .within(&Label::new("import").unwrap());
//!
//! let sources: Vec<_> = group.iter().map(|f| f.source().to_string()).collect();
//! assert_eq!(sources, ["import.parse", "import.load"]);
//! ```

mod group;
mod iter;

use alloc::vec::Vec;
use core::fmt;

pub use self::{
    group::FailureGroup,
    iter::{IntoIter, Iter},
};
use crate::{Cause, Details, Label};

/// A labeled error together with its details.
///
/// Two failures are equal when their sources and details are equal and they
/// share the same error instance.
#[derive(Clone, PartialEq, Debug)]
pub struct Failure {
    source: Label,
    error: Cause,
    details: Details,
}

impl Failure {
    /// Creates a failure without details.
    pub fn new(source: Label, error: impl Into<Cause>) -> Self {
        Self {
            source,
            error: error.into(),
            details: Details::new(),
        }
    }

    /// Replaces the details of this failure.
    #[must_use]
    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    /// Returns the label of the place where the error happened.
    pub fn source(&self) -> &Label {
        &self.source
    }

    /// Returns the error.
    pub fn error(&self) -> &Cause {
        &self.error
    }

    /// Returns the details bound when the error happened.
    pub fn details(&self) -> &Details {
        &self.details
    }

    /// Prepends `prefix` to the source of this failure.
    ///
    /// Applying `within` repeatedly keeps prepending, so nothing of the inner
    /// label is ever lost.
    #[must_use]
    pub fn within(mut self, prefix: &Label) -> Self {
        self.source = prefix.join(&self.source);
        self
    }

    /// Merges `base` under the details of this failure. Keys already present
    /// on the failure win.
    pub fn inherit_details(&mut self, base: &Details) {
        if !base.is_empty() {
            self.details = base.merged(&self.details);
        }
    }

    /// Splits the failure into its source, error and details.
    pub fn into_parts(self) -> (Label, Cause, Details) {
        (self.source, self.error, self.details)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} :: {}({})",
            self.source,
            self.error.short_type_name(),
            self.error
        )
    }
}

/// A single failure or a group of failures.
#[derive(Clone, PartialEq, Debug)]
pub enum Failures {
    /// A single leaf.
    Single(Failure),
    /// A possibly nested group.
    Group(FailureGroup),
}

impl Failures {
    /// Collapses a list of failures: an empty list yields `None`, a single
    /// member is returned as is and anything longer becomes a group.
    pub fn from_vec(mut members: Vec<Failures>) -> Option<Failures> {
        match members.len() {
            0 => None,
            1 => members.pop(),
            _ => Some(Failures::Group(FailureGroup::from_members(members))),
        }
    }

    /// Iterates over the leaves depth-first.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Returns the first leaf, if any.
    pub fn first(&self) -> Option<&Failure> {
        self.iter().next()
    }

    /// Returns the number of leaves.
    pub fn len(&self) -> usize {
        match self {
            Failures::Single(_) => 1,
            Failures::Group(group) => group.len(),
        }
    }

    /// Returns `true` if this is a group without leaves.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prepends `prefix` to the source of every leaf.
    #[must_use]
    pub fn within(self, prefix: &Label) -> Self {
        match self {
            Failures::Single(failure) => Failures::Single(failure.within(prefix)),
            Failures::Group(group) => Failures::Group(group.within(prefix)),
        }
    }

    /// Merges `base` under the details of every leaf.
    pub fn inherit_details(&mut self, base: &Details) {
        if base.is_empty() {
            return;
        }
        match self {
            Failures::Single(failure) => failure.inherit_details(base),
            Failures::Group(group) => group.inherit_details(base),
        }
    }

    /// Collects clones of all leaves.
    pub fn to_vec(&self) -> Vec<Failure> {
        self.iter().cloned().collect()
    }
}

impl From<Failure> for Failures {
    fn from(failure: Failure) -> Self {
        Failures::Single(failure)
    }
}

impl From<FailureGroup> for Failures {
    fn from(group: FailureGroup) -> Self {
        Failures::Group(group)
    }
}

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failures::Single(failure) => fmt::Display::fmt(failure, f),
            Failures::Group(group) => fmt::Display::fmt(group, f),
        }
    }
}

impl<'a> IntoIterator for &'a Failures {
    type Item = &'a Failure;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Failures {
    type Item = Failure;
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Message;

    fn leaf(source: &str) -> Failure {
        Failure::new(Label::new(source).unwrap(), Message::new(source.to_string()))
    }

    fn sources<'a>(failures: impl IntoIterator<Item = &'a Failure>) -> Vec<String> {
        failures.into_iter().map(|f| f.source().to_string()).collect()
    }

    #[test]
    fn test_nested_within_keeps_order() {
        let failure = leaf("origin")
            .within(&Label::new("l3").unwrap())
            .within(&Label::new("l2").unwrap())
            .within(&Label::new("l1").unwrap());
        assert_eq!(failure.source(), "l1.l2.l3.origin");
    }

    #[test]
    fn test_group_flattening_is_depth_first() {
        let deep = FailureGroup::from_iter([leaf("c"), leaf("d")]);
        let middle = FailureGroup::from_members([leaf("b").into(), deep.into(), leaf("e").into()]);
        let group = FailureGroup::from_members([
            leaf("a").into(),
            middle.into(),
            FailureGroup::new().into(),
            leaf("f").into(),
        ]);

        assert_eq!(group.len(), 6);
        assert_eq!(sources(&group), ["a", "b", "c", "d", "e", "f"]);
        // Restartable
        assert_eq!(sources(group.iter()), sources(group.iter()));

        let owned: Vec<_> = Failures::from(group.clone())
            .into_iter()
            .map(|f| f.source().to_string())
            .collect();
        assert_eq!(owned, ["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_group_within_relabels_every_leaf() {
        let group = FailureGroup::from_members([
            leaf("a").into(),
            FailureGroup::from_iter([leaf("b")]).into(),
        ])
        .within(&Label::new("root").unwrap());
        assert_eq!(sources(&group), ["root.a", "root.b"]);
    }

    #[test]
    fn test_from_vec_collapses() {
        assert_eq!(Failures::from_vec(vec![]), None);

        let single = leaf("a");
        assert_eq!(
            Failures::from_vec(vec![single.clone().into()]),
            Some(Failures::Single(single))
        );

        let many = Failures::from_vec(vec![leaf("a").into(), leaf("b").into()]).unwrap();
        assert!(matches!(many, Failures::Group(_)));
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn test_inherit_details_inner_wins() {
        let mut failures: Failures = leaf("a")
            .with_details(details! { "k" => "inner" })
            .into();
        failures.inherit_details(&details! { "k" => "outer", "x" => 1 });
        let failure = failures.first().unwrap();
        assert_eq!(failure.details().get("k").unwrap(), "inner");
        assert_eq!(failure.details().get("x"), Some(&crate::details::Value::Int(1)));
    }

    #[test]
    fn test_equality() {
        let failure = leaf("a");
        assert_eq!(failure, failure.clone());
        // Same label and message, different error instance
        assert_ne!(failure, leaf("a"));
        assert_ne!(
            failure.clone(),
            failure.clone().with_details(details! { "k" => 1 })
        );
    }

    #[test]
    fn test_display() {
        let failure = leaf("root.step");
        assert_eq!(failure.to_string(), "root.step :: Message(root.step)");
    }

    #[test]
    fn test_failure_send_sync() {
        static_assertions::assert_impl_all!(Failure: Send, Sync, Clone);
        static_assertions::assert_impl_all!(FailureGroup: Send, Sync, Clone);
        static_assertions::assert_impl_all!(Failures: Send, Sync, Clone);
    }
}
