//! The error type returned by scopes, handlers and wrappers.
//!
//! An [`Error`] is one of three things:
//!
//! - a **validation error**: a [`ValidationError`] describing a programming
//!   mistake, such as an invalid label or a duplicate child scope. These are
//!   never captured, relabeled or handled; every scope passes them on as is.
//! - a **failure**: one or more labeled [`Failure`]s raised by a scope that
//!   had nowhere else to put them.
//! - a **domain error**: any other error that has not crossed a scope yet.
//!
//! Any `E: core::error::Error + Send + Sync + 'static` converts into an
//! [`Error`] through `?`, so closures run inside a scope can use their own
//! error types.
//!
//! # Examples
//!
//! ```
//! use faultscope::{Error, Scope};
//!
//! let scope = Scope::new("import").unwrap();
//! let error = scope
//!     .run(|_| Err::<(), _>(std::io::Error::other("disk on fire")))
//!     .unwrap_err();
//!
//! assert_eq!(error.label().unwrap(), "import");
//! assert!(error.downcast_ref::<std::io::Error>().is_some());
//!
//! let error = Error::from(faultscope::label::validate("bad..label").unwrap_err());
//! assert!(error.is_validation());
//! ```

use alloc::{borrow::Cow, boxed::Box};
use core::{any::Any, fmt};

use crate::{
    Cause, Details, Failure, FailureGroup, Failures, Label, compat::ErrorAsStd, scope::TreeId,
};

/// The category of a [`ValidationError`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ValidationKind {
    /// An argument had the wrong shape, such as an empty filter list.
    Type,
    /// An argument had an invalid value, such as a malformed label.
    Value,
}

/// A programming mistake detected by the library.
///
/// Validation errors are never turned into failures: scopes, wrappers and
/// handlers always hand them back to the caller untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidationError {
    kind: ValidationKind,
    message: Cow<'static, str>,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(kind: ValidationKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a validation error of kind [`ValidationKind::Type`].
    pub fn type_error(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ValidationKind::Type, message)
    }

    /// Creates a validation error of kind [`ValidationKind::Value`].
    pub fn value(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ValidationKind::Value, message)
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ValidationKind {
        self.kind
    }

    /// Returns the message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl core::error::Error for ValidationError {}

/// A plain error carrying only a message.
///
/// This is what [`Error::msg`] and the [`bail!`](crate::bail) macro create.
#[derive(Clone, PartialEq, Eq)]
pub struct Message(Cow<'static, str>);

impl Message {
    /// Creates a message error.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self(message.into())
    }

    /// Returns the message.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::error::Error for Message {}

pub(crate) enum Repr {
    Validation(ValidationError),
    Failed {
        origin: Option<TreeId>,
        failures: Failures,
    },
    Domain(Cause),
}

/// The error type of this crate.
///
/// See the [module documentation](self) for the three kinds of errors it
/// represents.
pub struct Error {
    repr: Box<Repr>,
}

impl Error {
    pub(crate) fn from_repr(repr: Repr) -> Self {
        Self {
            repr: Box::new(repr),
        }
    }

    pub(crate) fn into_repr(self) -> Repr {
        *self.repr
    }

    pub(crate) fn failed(origin: Option<TreeId>, failures: Failures) -> Self {
        Self::from_repr(Repr::Failed { origin, failures })
    }

    /// Wraps any error.
    ///
    /// This is the same as [`Error::from`].
    pub fn new<E>(error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self::from(error)
    }

    /// Creates a domain error from a message.
    pub fn msg(message: impl Into<Cow<'static, str>>) -> Self {
        Self::from_repr(Repr::Domain(Cause::new(Message::new(message))))
    }

    /// Returns `true` if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(*self.repr, Repr::Validation(_))
    }

    /// Returns `true` if this error carries labeled failures.
    pub fn is_failure(&self) -> bool {
        matches!(*self.repr, Repr::Failed { .. })
    }

    /// Returns the validation error, if this is one.
    pub fn validation(&self) -> Option<&ValidationError> {
        match &*self.repr {
            Repr::Validation(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the labeled failures, if this error carries any.
    pub fn failures(&self) -> Option<&Failures> {
        match &*self.repr {
            Repr::Failed { failures, .. } => Some(failures),
            _ => None,
        }
    }

    /// Returns the first labeled failure.
    pub fn failure(&self) -> Option<&Failure> {
        self.failures()?.first()
    }

    /// Returns the label of the first failure.
    pub fn label(&self) -> Option<&Label> {
        self.failure().map(Failure::source)
    }

    /// Returns the details of the first failure.
    pub fn details(&self) -> Option<&Details> {
        self.failure().map(Failure::details)
    }

    /// Returns the underlying error of a domain error, or of the first
    /// failure.
    pub fn cause(&self) -> Option<&Cause> {
        match &*self.repr {
            Repr::Domain(cause) => Some(cause),
            Repr::Failed { failures, .. } => failures.first().map(Failure::error),
            Repr::Validation(_) => None,
        }
    }

    /// Returns the underlying error as an `E`, if it is one.
    pub fn downcast_ref<E: core::error::Error + 'static>(&self) -> Option<&E> {
        match &*self.repr {
            Repr::Validation(error) => (error as &dyn Any).downcast_ref::<E>(),
            _ => self.cause()?.downcast_ref::<E>(),
        }
    }

    /// Returns `true` if the underlying error is an `E`.
    pub fn is<E: core::error::Error + 'static>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }

    /// Takes the labeled failures out of this error, or returns the error
    /// unchanged if it carries none.
    pub fn into_failures(self) -> Result<Failures, Self> {
        match *self.repr {
            Repr::Failed { failures, .. } => Ok(failures),
            repr => Err(Self::from_repr(repr)),
        }
    }

    /// Converts this error into a type implementing
    /// [`core::error::Error`].
    pub fn into_std(self) -> ErrorAsStd {
        ErrorAsStd(self)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.repr {
            Repr::Validation(error) => fmt::Display::fmt(error, f),
            Repr::Failed { failures, .. } => fmt::Display::fmt(failures, f),
            Repr::Domain(cause) => fmt::Display::fmt(cause, f),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.repr {
            Repr::Validation(error) => f.debug_tuple("Validation").field(error).finish(),
            Repr::Failed { failures, .. } => f.debug_tuple("Failed").field(failures).finish(),
            Repr::Domain(cause) => f.debug_tuple("Domain").field(cause).finish(),
        }
    }
}

impl<E> From<E> for Error
where
    E: core::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        let boxed: Box<dyn core::error::Error + Send + Sync> = Box::new(error);
        let boxed = match boxed.downcast::<ValidationError>() {
            Ok(validation) => return Self::from_repr(Repr::Validation(*validation)),
            Err(other) => other,
        };
        match boxed.downcast::<ErrorAsStd>() {
            Ok(wrapper) => wrapper.0,
            Err(other) => Self::from_repr(Repr::Domain(Cause::from_boxed::<E>(other))),
        }
    }
}

impl From<Cause> for Error {
    fn from(cause: Cause) -> Self {
        Self::from_repr(Repr::Domain(cause))
    }
}

impl From<Failure> for Error {
    fn from(failure: Failure) -> Self {
        Self::failed(None, Failures::Single(failure))
    }
}

impl From<FailureGroup> for Error {
    fn from(group: FailureGroup) -> Self {
        Self::failed(None, Failures::Group(group))
    }
}

impl From<Failures> for Error {
    fn from(failures: Failures) -> Self {
        Self::failed(None, failures)
    }
}

impl From<Error> for Box<dyn core::error::Error + Send + Sync> {
    fn from(error: Error) -> Self {
        match error.into_repr() {
            Repr::Validation(validation) => Box::new(validation),
            repr => Box::new(ErrorAsStd(Error::from_repr(repr))),
        }
    }
}

impl From<Error> for Box<dyn core::error::Error> {
    fn from(error: Error) -> Self {
        Box::<dyn core::error::Error + Send + Sync>::from(error)
    }
}
