use alloc::vec::Vec;
use core::fmt;

use super::{Failure, Failures, IntoIter, Iter};
use crate::{Details, Label};

/// An ordered collection of failures that may contain nested groups.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FailureGroup {
    members: Vec<Failures>,
}

impl FailureGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group from its direct members.
    pub fn from_members(members: impl IntoIterator<Item = Failures>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    /// Appends a member.
    pub fn push(&mut self, member: impl Into<Failures>) {
        self.members.push(member.into());
    }

    /// Returns the direct members, groups included.
    pub fn members(&self) -> &[Failures] {
        &self.members
    }

    /// Consumes the group, returning its direct members.
    pub fn into_members(self) -> Vec<Failures> {
        self.members
    }

    /// Iterates over the leaves depth-first.
    pub fn iter(&self) -> Iter<'_> {
        Iter::from_members(&self.members)
    }

    /// Returns the number of leaves.
    pub fn len(&self) -> usize {
        self.members.iter().map(Failures::len).sum()
    }

    /// Returns `true` if the group has no leaves.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prepends `prefix` to the source of every leaf.
    #[must_use]
    pub fn within(self, prefix: &Label) -> Self {
        Self {
            members: self
                .members
                .into_iter()
                .map(|member| member.within(prefix))
                .collect(),
        }
    }

    /// Merges `base` under the details of every leaf.
    pub fn inherit_details(&mut self, base: &Details) {
        for member in &mut self.members {
            member.inherit_details(base);
        }
    }

    /// Collects clones of all leaves.
    pub fn to_vec(&self) -> Vec<Failure> {
        self.iter().cloned().collect()
    }
}

impl fmt::Display for FailureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.len();
        write!(f, "{len} failure{}", if len == 1 { "" } else { "s" })?;
        for failure in self {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

impl FromIterator<Failure> for FailureGroup {
    fn from_iter<I: IntoIterator<Item = Failure>>(iter: I) -> Self {
        Self::from_members(iter.into_iter().map(Failures::Single))
    }
}

impl FromIterator<Failures> for FailureGroup {
    fn from_iter<I: IntoIterator<Item = Failures>>(iter: I) -> Self {
        Self::from_members(iter)
    }
}

impl<'a> IntoIterator for &'a FailureGroup {
    type Item = &'a Failure;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for FailureGroup {
    type Item = Failure;
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::from_members(self.members)
    }
}
