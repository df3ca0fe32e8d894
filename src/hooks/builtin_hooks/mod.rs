//! Built-in handlers provided by faultscope.
//!
//! ## Console Sink
//!
//! - **[`console`]**: Prints one line per failure to standard output. This is
//!   the sink behind [`Handler::default`] and behind [`default_handler`]
//!   while no handler is registered.
//!
//! To customize, pick one of the [`ConsoleSink`] presets or build your own
//! configuration, then turn it into a handler with
//! [`ConsoleSink::into_handler`].
//!
//! [`Handler::default`]: crate::Handler::default
//! [`default_handler`]: crate::hooks::default_handler
//! [`ConsoleSink`]: crate::hooks::builtin_hooks::console::ConsoleSink
//! [`ConsoleSink::into_handler`]: crate::hooks::builtin_hooks::console::ConsoleSink::into_handler

pub mod console;
