//! Hierarchical, dot-separated labels.
//!
//! A [`Label`] names the place where a failure happened, such as
//! `"import.files[3].parse"`. Labels are validated once, on construction, and
//! are immutable afterwards: every `Label` value in a program satisfies the
//! grammar
//!
//! ```text
//! label   = segment ("." segment)*
//! segment = word ("[" word "]" | "(" word ")")?
//! word    = [A-Za-z0-9_]+
//! ```
//!
//! # Examples
//!
//! ```
//! use faultscope::Label;
//!
//! let parent = Label::new("import").unwrap();
//! let child = Label::new("files[3]").unwrap();
//! assert_eq!(parent.join(&child), "import.files[3]");
//!
//! assert!(Label::new("import..files").is_err());
//! assert!(Label::new(".import").is_err());
//! ```

use alloc::{string::String, sync::Arc};
use core::{fmt, ops::Deref, str::FromStr};
use std::sync::OnceLock;

use crate::error::ValidationError;

/// A validated hierarchical label.
///
/// Cloning a label is cheap: the text is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(Arc<str>);

fn grammar() -> &'static regex::Regex {
    static GRAMMAR: OnceLock<regex::Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        regex::Regex::new(
            r"^[A-Za-z0-9_]+(?:\[[A-Za-z0-9_]+\]|\([A-Za-z0-9_]+\))?(?:\.[A-Za-z0-9_]+(?:\[[A-Za-z0-9_]+\]|\([A-Za-z0-9_]+\))?)*$",
        )
        .expect("label grammar is a valid regex")
    })
}

/// Validates `name` against the label grammar and returns it as a [`Label`].
///
/// The returned error is a [`ValidationError`] of kind
/// [`Value`](crate::error::ValidationKind::Value). Validation errors mark
/// programmer mistakes; scopes never capture them as failures.
pub fn validate(name: &str) -> Result<Label, ValidationError> {
    if grammar().is_match(name) {
        Ok(Label(Arc::from(name)))
    } else {
        Err(ValidationError::value(alloc::format!("invalid label: '{name}'")))
    }
}

impl Label {
    /// Creates a label, validating its syntax.
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        validate(name)
    }

    /// Returns `self + "." + child`.
    ///
    /// Both sides are valid labels, so the result is valid as well.
    #[must_use]
    pub fn join(&self, child: &Label) -> Label {
        let mut joined = String::with_capacity(self.0.len() + 1 + child.0.len());
        joined.push_str(&self.0);
        joined.push('.');
        joined.push_str(&child.0);
        Label(Arc::from(joined))
    }

    /// Returns the label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the dot-separated segments of this label.
    pub fn segments(&self) -> core::str::Split<'_, char> {
        self.0.split('.')
    }

    /// Returns the last segment of this label.
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl Deref for Label {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl FromStr for Label {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)
    }
}

impl TryFrom<&str> for Label {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate(value)
    }
}

impl TryFrom<String> for Label {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate(&value)
    }
}

impl TryFrom<&String> for Label {
    type Error = ValidationError;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        validate(value)
    }
}

impl TryFrom<&Label> for Label {
    type Error = ValidationError;

    fn try_from(value: &Label) -> Result<Self, Self::Error> {
        Ok(value.clone())
    }
}

impl PartialEq<str> for Label {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Label {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl PartialEq<Label> for &str {
    fn eq(&self, other: &Label) -> bool {
        *self == &*other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationKind;

    #[test]
    fn test_valid_labels() {
        for name in [
            "root",
            "root.sub",
            "root.sub_scope",
            "root.sub.sub.sub",
            "root.scope1",
            "scope2",
            "scope.iteration[5].func",
            "scope.func(1)",
            "iter[255]",
            "r",
        ] {
            let label = Label::new(name).unwrap();
            assert_eq!(label, name);
        }
    }

    #[test]
    fn test_invalid_labels() {
        for name in [
            "",
            "name..sub",
            ".name",
            "name.",
            "na me",
            "name[",
            "name[1](2)",
            "name[]",
            "name-sub",
        ] {
            let error = Label::new(name).unwrap_err();
            assert_eq!(error.kind(), ValidationKind::Value);
            assert!(error.message().starts_with("invalid label"), "{name:?}");
        }
    }

    #[test]
    fn test_join_and_segments() {
        let parent = Label::new("root.sub").unwrap();
        let child = Label::new("step[2]").unwrap();
        let joined = parent.join(&child);
        assert_eq!(joined, "root.sub.step[2]");
        assert_eq!(joined.segments().collect::<Vec<_>>(), ["root", "sub", "step[2]"]);
        assert_eq!(joined.last_segment(), "step[2]");
        assert!(Label::new(&joined).is_ok());
    }

    #[test]
    fn test_label_composition_for_many_pairs() {
        for parent in ["a", "a.b", "x[1].y(z)"] {
            for child in ["c", "d_e", "f(0)"] {
                let joined = Label::new(parent).unwrap().join(&Label::new(child).unwrap());
                assert_eq!(joined.as_str(), alloc::format!("{parent}.{child}"));
            }
        }
    }

    #[test]
    fn test_label_send_sync() {
        static_assertions::assert_impl_all!(Label: Send, Sync, Clone);
        static_assertions::assert_not_impl_any!(Label: Copy);
    }
}
