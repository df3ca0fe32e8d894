//! Structured metadata attached to scopes and failures.
//!
//! Every scope carries a [`Details`] map. A child scope starts from its
//! parent's details and adds its own on top, so a failure labeled at
//! `"import.files[3]"` carries everything bound at `"import"` as well.
//!
//! # Examples
//!
//! ```
//! use faultscope::{details, details::Value};
//!
//! let outer = details! { "job" => "import", "attempt" => 1 };
//! let inner = details! { "attempt" => 2, "file" => "a.csv" };
//!
//! let merged = outer.merged(&inner);
//! assert_eq!(merged.get("job").unwrap(), "import");
//! assert_eq!(merged.get("attempt"), Some(&Value::Int(2)));
//! assert_eq!(merged.len(), 3);
//! ```

use alloc::{borrow::Cow, string::String};
use core::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

/// A single detail value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(Cow<'static, str>),
}

impl Value {
    /// Returns the string content if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => fmt::Display::fmt(v, f),
            Value::Int(v) => fmt::Display::fmt(v, f),
            Value::UInt(v) => fmt::Display::fmt(v, f),
            Value::Float(v) => fmt::Display::fmt(v, f),
            Value::Str(v) => fmt::Display::fmt(v, f),
        }
    }
}

macro_rules! impl_from_value {
    ($variant:ident($target:ty): $($source:ty),*) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

impl_from_value!(Bool(bool): bool);
impl_from_value!(Int(i64): i8, i16, i32, i64);
impl_from_value!(UInt(u64): u8, u16, u32, u64);
impl_from_value!(Float(f64): f32, f64);

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::UInt(value as u64)
    }
}

impl From<isize> for Value {
    fn from(value: isize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Cow::Owned(value))
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(Cow::Owned(value.clone()))
    }
}

impl From<Cow<'static, str>> for Value {
    fn from(value: Cow<'static, str>) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

/// An insertion-ordered mapping from names to [`Value`]s.
///
/// Equality ignores insertion order.
#[derive(Clone, Default)]
pub struct Details {
    entries: IndexMap<String, Value, FxBuildHasher>,
}

impl Details {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value for `key` if there was
    /// one. Replacing a key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value stored for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copies every entry of `other` into `self`, overwriting existing keys.
    pub fn extend_from(&mut self, other: &Details) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Returns `self` overlaid with `other`; `other` wins on collisions.
    #[must_use]
    pub fn merged(&self, other: &Details) -> Details {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut merged = self.clone();
        merged.extend_from(other);
        merged
    }
}

impl PartialEq for Details {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.entries.get(k) == Some(v))
    }
}

impl fmt::Debug for Details {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl fmt::Display for Details {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Details {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut details = Details::new();
        details.extend(iter);
        details
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Details {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a> IntoIterator for &'a Details {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
