//! Process-wide registry of named failure handlers.
//!
//! Applications register the handlers they want to make available once, at
//! startup, and scopes pick them up by name or through
//! [`default_handler`]. Nothing is discovered automatically: whatever is in
//! the registry was put there by [`register_handler`].
//!
//! The default handler is the first handler that was registered. When the
//! registry is empty it is the [`ConsoleSink`] configured from the
//! environment.
//!
//! # Examples
//!
//! ```
//! use faultscope::{Handler, Scope, hooks};
//!
//! hooks::register_handler("quiet", Handler::noop()).unwrap();
//! assert!(hooks::register_handler("quiet", Handler::noop()).is_err());
//!
//! let scope = Scope::builder("job")
//!     .handler(hooks::registered_handler("quiet").unwrap())
//!     .build()
//!     .unwrap();
//! assert!(scope.run(|_| Err::<(), _>(std::io::Error::other("lost"))).is_ok());
//! ```
//!
//! [`ConsoleSink`]: builtin_hooks::console::ConsoleSink

pub mod builtin_hooks;

use alloc::{string::String, vec::Vec};
use core::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::Handler;

type HandlerMap = IndexMap<String, Handler, FxBuildHasher>;

// Stays `None` until the first registration.
static HANDLERS: RwLock<Option<HandlerMap>> = RwLock::new(None);

fn read_handlers() -> RwLockReadGuard<'static, Option<HandlerMap>> {
    HANDLERS.read().expect("Unable to acquire handler registry lock")
}

fn write_handlers() -> RwLockWriteGuard<'static, Option<HandlerMap>> {
    HANDLERS.write().expect("Unable to acquire handler registry lock")
}

/// Error returned by [`register_handler`] when the name is already taken.
///
/// It gives back the handler that could not be registered.
pub struct HandlerRegistrationError {
    name: String,
    handler: Handler,
}

impl HandlerRegistrationError {
    /// Returns the name that was already taken.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the handler that could not be registered.
    pub fn into_handler(self) -> Handler {
        self.handler
    }
}

impl fmt::Debug for HandlerRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistrationError")
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for HandlerRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a handler named '{}' is already registered", self.name)
    }
}

impl core::error::Error for HandlerRegistrationError {}

/// Registers `handler` under `name`.
///
/// Fails if a handler with the same name is already registered. Use
/// [`replace_handler`] to overwrite an existing registration.
pub fn register_handler(
    name: impl Into<String>,
    handler: Handler,
) -> Result<(), HandlerRegistrationError> {
    let name = name.into();
    let mut guard = write_handlers();
    let handlers = guard.get_or_insert_default();
    if handlers.contains_key(&name) {
        return Err(HandlerRegistrationError { name, handler });
    }
    handlers.insert(name, handler);
    Ok(())
}

/// Registers `handler` under `name`, returning the handler it replaces.
///
/// A replaced handler keeps its position in the registration order.
pub fn replace_handler(name: impl Into<String>, handler: Handler) -> Option<Handler> {
    write_handlers()
        .get_or_insert_default()
        .insert(name.into(), handler)
}

/// Returns the handler registered under `name`.
pub fn registered_handler(name: &str) -> Option<Handler> {
    read_handlers().as_ref()?.get(name).cloned()
}

/// Removes the handler registered under `name`.
pub fn unregister_handler(name: &str) -> Option<Handler> {
    write_handlers().as_mut()?.shift_remove(name)
}

/// Returns the names of all registered handlers in registration order.
pub fn registered_handlers() -> Vec<String> {
    read_handlers()
        .as_ref()
        .map(|handlers| handlers.keys().cloned().collect())
        .unwrap_or_default()
}

/// Returns the handler scopes use when asked for the default one.
///
/// This is the first registered handler, or the console handler when none
/// is registered.
pub fn default_handler() -> Handler {
    let registered = read_handlers()
        .as_ref()
        .and_then(|handlers| handlers.first())
        .map(|(_, handler)| handler.clone());
    registered.unwrap_or_else(Handler::console)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_lookup_unregister() {
        let handler = Handler::noop();
        register_handler("hooks-test-first", handler.clone()).unwrap();

        let error = register_handler("hooks-test-first", Handler::noop()).unwrap_err();
        assert_eq!(error.name(), "hooks-test-first");
        assert_eq!(
            error.to_string(),
            "a handler named 'hooks-test-first' is already registered"
        );

        assert!(registered_handler("hooks-test-first").unwrap().ptr_eq(&handler));
        assert!(registered_handlers().contains(&String::from("hooks-test-first")));

        let replaced = replace_handler("hooks-test-first", Handler::noop()).unwrap();
        assert!(replaced.ptr_eq(&handler));

        assert!(unregister_handler("hooks-test-first").is_some());
        assert!(registered_handler("hooks-test-first").is_none());
        assert!(unregister_handler("hooks-test-first").is_none());
    }

    #[test]
    fn test_registration_error_send_sync() {
        static_assertions::assert_impl_all!(HandlerRegistrationError: Send, Sync);
    }
}
