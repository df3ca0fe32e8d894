//! Shared handles to the error that caused a failure.
//!
//! A [`Cause`] owns the original error behind an [`Arc`], so cloning a
//! failure never clones the error itself. Two causes compare equal only when
//! they point at the same error instance.
//!
//! # Examples
//!
//! ```
//! use faultscope::Cause;
//!
//! let cause = Cause::new(std::io::Error::other("disk on fire"));
//! assert!(cause.is::<std::io::Error>());
//! assert_eq!(cause.short_type_name(), "Error");
//! assert_eq!(cause.to_string(), "disk on fire");
//!
//! let copy = cause.clone();
//! assert_eq!(cause, copy);
//! ```

use alloc::{boxed::Box, sync::Arc};
use core::{any::TypeId, fmt};

type DynError = dyn core::error::Error + Send + Sync + 'static;

/// A cheaply clonable handle to a type-erased error.
#[derive(Clone)]
pub struct Cause {
    inner: Arc<DynError>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Cause {
    /// Wraps `error`, remembering its concrete type.
    pub fn new<E>(error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
            type_id: TypeId::of::<E>(),
            type_name: core::any::type_name::<E>(),
        }
    }

    /// Wraps an already boxed `E`.
    pub(crate) fn from_boxed<E: 'static>(error: Box<DynError>) -> Self {
        Self {
            inner: Arc::from(error),
            type_id: TypeId::of::<E>(),
            type_name: core::any::type_name::<E>(),
        }
    }

    /// Returns the full type name of the wrapped error.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name without its module path or generic arguments,
    /// such as `Error` for `std::io::error::Error`.
    pub fn short_type_name(&self) -> &'static str {
        let base = self.type_name.split('<').next().unwrap_or(self.type_name);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Returns the [`TypeId`] of the wrapped error.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns `true` if the wrapped error is an `E`.
    pub fn is<E: core::error::Error + 'static>(&self) -> bool {
        self.inner.is::<E>()
    }

    /// Returns a reference to the wrapped error if it is an `E`.
    pub fn downcast_ref<E: core::error::Error + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Returns `true` if both causes share the same error instance.
    pub fn ptr_eq(&self, other: &Cause) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the wrapped error.
    pub fn as_error(&self) -> &(dyn core::error::Error + Send + Sync + 'static) {
        &*self.inner
    }

    /// Returns the shared handle to the wrapped error.
    pub fn into_arc(self) -> Arc<DynError> {
        self.inner
    }
}

impl PartialEq for Cause {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Cause {}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl<E> From<E> for Cause
where
    E: core::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Cause::new(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Message;

    #[derive(Debug, thiserror::Error)]
    #[error("generic {0}")]
    struct Generic<T: fmt::Debug + fmt::Display>(T);

    #[test]
    fn test_identity_equality() {
        let first = Cause::new(Message::new("x"));
        let second = Cause::new(Message::new("x"));
        assert_eq!(first, first.clone());
        assert_ne!(first, second);
    }

    #[test]
    fn test_type_names() {
        let cause = Cause::new(Generic(1u8));
        assert!(cause.type_name().ends_with("Generic<u8>"));
        assert_eq!(cause.short_type_name(), "Generic");
        assert_eq!(cause.to_string(), "generic 1");
        assert_eq!(cause.type_id(), TypeId::of::<Generic<u8>>());
        assert!(cause.downcast_ref::<Generic<u8>>().is_some());
        assert!(!cause.is::<Message>());
    }

    #[test]
    fn test_cause_send_sync() {
        static_assertions::assert_impl_all!(Cause: Send, Sync, Clone);
    }
}
