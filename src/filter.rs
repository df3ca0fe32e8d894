//! Predicates selecting failures by label or by error type.
//!
//! A [`Filter`] decides whether a [`Failure`] is of interest. Filters are
//! built from a small grammar:
//!
//! - [`Filter::everything`] (also `"*"`) matches every failure.
//! - A label string matches that exact source. A string containing `*` is a
//!   glob where `*` matches any run of characters, dots included.
//! - [`Filter::error`] matches failures whose error has a given type.
//! - [`Filter::any_of`] and [`Filter::all_of`] combine filters with OR and
//!   AND semantics. [`Filter::not`] and [`Filter::none_of`] negate them.
//!
//! Building a filter that can never be right is rejected with a
//! [`ValidationError`]: combining an empty list, or negating a filter that
//! matches everything.
//!
//! # Examples
//!
//! ```
//! use faultscope::{Failure, Filter, Label, error::Message};
//!
//! let failure = Failure::new(Label::new("sync.fetch.decode").unwrap(), Message::new("bad"));
//!
//! assert!(Filter::from("sync.*").matches(&failure));
//! assert!(Filter::from("*.decode").matches(&failure));
//! assert!(!Filter::from("sync.fetch").matches(&failure));
//!
//! let decoding = Filter::all_of(["*.decode".into(), Filter::error::<Message>()]).unwrap();
//! assert!(decoding.matches(&failure));
//!
//! assert!(Filter::not("*").is_err());
//! ```

use alloc::{boxed::Box, string::String, sync::Arc, vec::Vec};
use core::{any::TypeId, fmt};

use regex::Regex;

use crate::{Cause, Failure, Label, ValidationError};

type ErrorPredicate = Arc<dyn Fn(&Cause) -> bool + Send + Sync>;
type FailurePredicate = Arc<dyn Fn(&Failure) -> bool + Send + Sync>;

/// A predicate over failures.
#[derive(Clone)]
pub struct Filter(Kind);

#[derive(Clone)]
enum Kind {
    Everything,
    Label(Arc<str>),
    Pattern {
        glob: Arc<str>,
        regex: Regex,
    },
    Error {
        type_id: TypeId,
        type_name: &'static str,
        predicate: Option<ErrorPredicate>,
    },
    AnyOf(Vec<Filter>),
    AllOf(Vec<Filter>),
    Not(Box<Filter>),
    Custom(FailurePredicate),
}

fn glob_to_regex(glob: &str) -> Regex {
    let pattern = alloc::format!("(?s)^{}$", regex::escape(glob).replace(r"\*", ".*"));
    Regex::new(&pattern).expect("an escaped glob is a valid regex")
}

impl Filter {
    /// A filter matching every failure.
    pub const EVERYTHING: Filter = Filter(Kind::Everything);

    /// Returns a filter matching every failure.
    pub const fn everything() -> Self {
        Self::EVERYTHING
    }

    /// Returns a filter on the failure source.
    ///
    /// `"*"` matches everything, a string containing `*` is a glob and any
    /// other string must equal the source exactly. Globs are case-sensitive
    /// and must match the whole source.
    pub fn label(pattern: impl AsRef<str>) -> Self {
        let pattern = pattern.as_ref();
        if pattern == "*" {
            Self::EVERYTHING
        } else if pattern.contains('*') {
            Filter(Kind::Pattern {
                glob: Arc::from(pattern),
                regex: glob_to_regex(pattern),
            })
        } else {
            Filter(Kind::Label(Arc::from(pattern)))
        }
    }

    /// Returns a filter matching failures caused by an `E`.
    pub fn error<E: core::error::Error + 'static>() -> Self {
        Filter(Kind::Error {
            type_id: TypeId::of::<E>(),
            type_name: core::any::type_name::<E>(),
            predicate: None,
        })
    }

    /// Returns a filter matching failures caused by an `E` for which
    /// `predicate` holds.
    pub fn error_where<E, P>(predicate: P) -> Self
    where
        E: core::error::Error + 'static,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Filter(Kind::Error {
            type_id: TypeId::of::<E>(),
            type_name: core::any::type_name::<E>(),
            predicate: Some(Arc::new(move |cause: &Cause| {
                cause.downcast_ref::<E>().is_some_and(&predicate)
            })),
        })
    }

    /// Returns a filter backed by an arbitrary predicate.
    pub fn custom<P>(predicate: P) -> Self
    where
        P: Fn(&Failure) -> bool + Send + Sync + 'static,
    {
        Filter(Kind::Custom(Arc::new(predicate)))
    }

    /// Returns a filter matching failures matched by any of `filters`.
    ///
    /// Fails with a [`ValidationError`] of kind
    /// [`Type`](crate::error::ValidationKind::Type) if `filters` is empty.
    pub fn any_of<I>(filters: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator,
        I::Item: Into<Filter>,
    {
        let mut filters: Vec<Filter> = filters.into_iter().map(Into::into).collect();
        if filters.is_empty() {
            return Err(ValidationError::type_error(
                "cannot use an empty list as failure filter",
            ));
        }
        if filters.iter().any(Filter::is_everything) {
            return Ok(Self::EVERYTHING);
        }
        dedup(&mut filters);
        Ok(match filters.len() {
            1 => filters.remove(0),
            _ => Filter(Kind::AnyOf(filters)),
        })
    }

    /// Returns a filter matching failures matched by all of `filters`.
    ///
    /// Fails with a [`ValidationError`] of kind
    /// [`Type`](crate::error::ValidationKind::Type) if `filters` is empty.
    pub fn all_of<I>(filters: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator,
        I::Item: Into<Filter>,
    {
        let mut filters: Vec<Filter> = filters.into_iter().map(Into::into).collect();
        if filters.is_empty() {
            return Err(ValidationError::type_error(
                "cannot use an empty tuple as failure filter",
            ));
        }
        filters.retain(|filter| !filter.is_everything());
        dedup(&mut filters);
        Ok(match filters.len() {
            0 => Self::EVERYTHING,
            1 => filters.remove(0),
            _ => Filter(Kind::AllOf(filters)),
        })
    }

    /// Returns the negation of `filter`.
    ///
    /// Negating a filter that matches everything fails with a
    /// [`ValidationError`] of kind [`Value`](crate::error::ValidationKind::Value).
    pub fn not(filter: impl Into<Filter>) -> Result<Self, ValidationError> {
        match filter.into() {
            Filter(Kind::Everything) => Err(ValidationError::value("cannot filter out all failures")),
            Filter(Kind::Not(inner)) => Ok(*inner),
            filter => Ok(Filter(Kind::Not(Box::new(filter)))),
        }
    }

    /// Returns a filter matching failures matched by none of `filters`.
    pub fn none_of<I>(filters: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator,
        I::Item: Into<Filter>,
    {
        Self::not(Self::any_of(filters)?)
    }

    /// Returns `true` if this filter matches every failure.
    pub fn is_everything(&self) -> bool {
        matches!(self.0, Kind::Everything)
    }

    /// Checks `failure` against this filter.
    pub fn matches(&self, failure: &Failure) -> bool {
        match &self.0 {
            Kind::Everything => true,
            Kind::Label(label) => failure.source().as_str() == &**label,
            Kind::Pattern { regex, .. } => regex.is_match(failure.source()),
            Kind::Error {
                type_id, predicate, ..
            } => {
                failure.error().type_id() == *type_id
                    && predicate
                        .as_ref()
                        .is_none_or(|predicate| predicate(failure.error()))
            }
            Kind::AnyOf(filters) => filters.iter().any(|filter| filter.matches(failure)),
            Kind::AllOf(filters) => filters.iter().all(|filter| filter.matches(failure)),
            Kind::Not(filter) => !filter.matches(failure),
            Kind::Custom(predicate) => predicate(failure),
        }
    }
}

fn dedup(filters: &mut Vec<Filter>) {
    let mut unique: Vec<Filter> = Vec::with_capacity(filters.len());
    for filter in filters.drain(..) {
        if !unique.contains(&filter) {
            unique.push(filter);
        }
    }
    *filters = unique;
}

fn same_predicate<T: ?Sized>(left: &Arc<T>, right: &Arc<T>) -> bool {
    core::ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Kind::Everything, Kind::Everything) => true,
            (Kind::Label(left), Kind::Label(right)) => left == right,
            (Kind::Pattern { glob: left, .. }, Kind::Pattern { glob: right, .. }) => left == right,
            (
                Kind::Error {
                    type_id: left_type,
                    predicate: left,
                    ..
                },
                Kind::Error {
                    type_id: right_type,
                    predicate: right,
                    ..
                },
            ) => {
                left_type == right_type
                    && match (left, right) {
                        (None, None) => true,
                        (Some(left), Some(right)) => same_predicate(left, right),
                        _ => false,
                    }
            }
            (Kind::AnyOf(left), Kind::AnyOf(right)) | (Kind::AllOf(left), Kind::AllOf(right)) => {
                left == right
            }
            (Kind::Not(left), Kind::Not(right)) => left == right,
            (Kind::Custom(left), Kind::Custom(right)) => same_predicate(left, right),
            _ => false,
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Kind::Everything => f.write_str("Everything"),
            Kind::Label(label) => f.debug_tuple("Label").field(label).finish(),
            Kind::Pattern { glob, .. } => f.debug_tuple("Pattern").field(glob).finish(),
            Kind::Error {
                type_name,
                predicate,
                ..
            } => {
                let mut tuple = f.debug_tuple("Error");
                tuple.field(&format_args!("{type_name}"));
                if predicate.is_some() {
                    tuple.field(&format_args!("<predicate>"));
                }
                tuple.finish()
            }
            Kind::AnyOf(filters) => f.debug_tuple("AnyOf").field(filters).finish(),
            Kind::AllOf(filters) => f.debug_tuple("AllOf").field(filters).finish(),
            Kind::Not(filter) => f.debug_tuple("Not").field(filter).finish(),
            Kind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<&str> for Filter {
    fn from(pattern: &str) -> Self {
        Filter::label(pattern)
    }
}

impl From<String> for Filter {
    fn from(pattern: String) -> Self {
        Filter::label(pattern)
    }
}

impl From<&String> for Filter {
    fn from(pattern: &String) -> Self {
        Filter::label(pattern)
    }
}

impl From<&Label> for Filter {
    fn from(label: &Label) -> Self {
        Filter(Kind::Label(Arc::from(label.as_str())))
    }
}

impl From<Label> for Filter {
    fn from(label: Label) -> Self {
        Filter::from(&label)
    }
}

impl From<&Filter> for Filter {
    fn from(filter: &Filter) -> Self {
        filter.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Message, ValidationKind};

    #[derive(Debug, thiserror::Error)]
    #[error("value: {0}")]
    struct ValueError(&'static str);

    #[derive(Debug, thiserror::Error)]
    #[error("type: {0}")]
    struct TypeError(&'static str);

    fn failure(source: &str, error: impl core::error::Error + Send + Sync + 'static) -> Failure {
        Failure::new(Label::new(source).unwrap(), error)
    }

    #[test]
    fn test_label_and_globs() {
        let target = failure("root.step[1].load", Message::new("x"));
        assert!(Filter::from("root.step[1].load").matches(&target));
        assert!(!Filter::from("root.step[1]").matches(&target));
        assert!(Filter::from("root.*").matches(&target));
        assert!(Filter::from("*.load").matches(&target));
        assert!(Filter::from("root.step[*].load").matches(&target));
        assert!(!Filter::from("Root.*").matches(&target));
        // Globs are anchored on both sides
        assert!(!Filter::from("*.step").matches(&target));
        assert!(Filter::from("*").is_everything());
    }

    #[test]
    fn test_error_types() {
        let value = failure("a", ValueError("v"));
        let kind = failure("a", TypeError("t"));

        let either = Filter::any_of([Filter::error::<ValueError>(), Filter::error::<TypeError>()]).unwrap();
        assert!(either.matches(&value));
        assert!(either.matches(&kind));

        let both = Filter::all_of([Filter::error::<ValueError>(), Filter::error::<TypeError>()]).unwrap();
        assert!(!both.matches(&value));
        assert!(!both.matches(&kind));

        let picky = Filter::error_where(|error: &ValueError| error.0 == "v");
        assert!(picky.matches(&value));
        assert!(!picky.matches(&failure("a", ValueError("w"))));
    }

    #[test]
    fn test_validation() {
        let error = Filter::any_of(Vec::<Filter>::new()).unwrap_err();
        assert_eq!(error.kind(), ValidationKind::Type);
        let error = Filter::all_of(Vec::<Filter>::new()).unwrap_err();
        assert_eq!(error.kind(), ValidationKind::Type);

        for everything in [
            Filter::from("*"),
            Filter::everything(),
            Filter::any_of([Filter::error::<ValueError>(), "*".into()]).unwrap(),
        ] {
            let error = Filter::not(everything).unwrap_err();
            assert_eq!(error.kind(), ValidationKind::Value);
            assert_eq!(error.message(), "cannot filter out all failures");
        }
    }

    #[test]
    fn test_simplifications() {
        let single = Filter::any_of(["a.b"]).unwrap();
        assert_eq!(single, Filter::from("a.b"));

        let deduped = Filter::any_of(["a", "b", "a"]).unwrap();
        assert_eq!(deduped, Filter::any_of(["a", "b"]).unwrap());

        let anded = Filter::all_of([Filter::everything(), "a".into()]).unwrap();
        assert_eq!(anded, Filter::from("a"));

        let negated = Filter::not(Filter::not("a").unwrap()).unwrap();
        assert_eq!(negated, Filter::from("a"));

        let custom = Filter::custom(|_| true);
        assert_eq!(custom, custom.clone());
        assert_ne!(custom, Filter::custom(|_| true));
    }

    #[test]
    fn test_debug() {
        let filter = Filter::none_of(["a.*", "b"]).unwrap();
        assert_eq!(alloc::format!("{filter:?}"), r#"Not(AnyOf([Pattern("a.*"), Label("b")]))"#);
    }

    #[test]
    fn test_filter_send_sync() {
        static_assertions::assert_impl_all!(Filter: Send, Sync, Clone);
    }
}
