use alloc::vec::Vec;
use core::iter::FusedIterator;

use super::{Failure, Failures};

/// An iterator over the leaves of a [`Failures`] tree in depth-first order.
///
/// Groups are expanded lazily as the iterator reaches them. The iterator is
/// cheap to clone, so a sequence can be walked again from any point.
#[derive(Clone)]
#[must_use]
pub struct Iter<'a> {
    stack: Vec<&'a Failures>,
}

impl<'a> Iter<'a> {
    pub(super) fn new(root: &'a Failures) -> Self {
        Self { stack: vec![root] }
    }

    pub(super) fn from_members(members: &'a [Failures]) -> Self {
        Self {
            stack: members.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Failure;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                Failures::Single(failure) => return Some(failure),
                Failures::Group(group) => self.stack.extend(group.members().iter().rev()),
            }
        }
    }
}

impl FusedIterator for Iter<'_> {}

/// An owning iterator over the leaves of a [`Failures`] tree in depth-first
/// order.
#[must_use]
pub struct IntoIter {
    stack: Vec<Failures>,
}

impl IntoIter {
    pub(super) fn new(root: Failures) -> Self {
        Self { stack: vec![root] }
    }

    pub(super) fn from_members(mut members: Vec<Failures>) -> Self {
        members.reverse();
        Self { stack: members }
    }
}

impl Iterator for IntoIter {
    type Item = Failure;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                Failures::Single(failure) => return Some(failure),
                Failures::Group(group) => self.stack.extend(group.into_members().into_iter().rev()),
            }
        }
    }
}

impl FusedIterator for IntoIter {}
