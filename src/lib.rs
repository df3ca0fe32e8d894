#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Labeled failure collection and reporting for Rust.
//!
//! ## Overview
//!
//! Long-running jobs often have many independent steps: files to import,
//! records to convert, endpoints to poll. One broken step should not stop the
//! others, yet every broken step must be accounted for. This crate gives each
//! step a *label* describing where it lives in the job, collects the errors
//! of failed steps as labeled [`Failure`]s and hands them to a [`Handler`]
//! once the job is done.
//!
//! ## Quick Example
//!
//! ```
//! use faultscope::{Filter, Handler, Scope};
//!
//! let printed = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
//! let handler = {
//!     let printed = printed.clone();
//!     Handler::new(move |failure| printed.lock().unwrap().push(failure.to_string()))
//! }
//! .ignore(Filter::label("import.cache.*"));
//!
//! let root = Scope::builder("import").handler(handler).build().unwrap();
//! root.run(|root| {
//!     for (index, name) in ["a.csv", "b.csv"].into_iter().enumerate() {
//!         let step = root.child(&format!("file[{index}]"))?;
//!         step.run(|_| std::fs::read_to_string(format!("/nonexistent/{name}")))?;
//!     }
//!     Ok::<_, faultscope::Error>(())
//! })
//! .unwrap();
//!
//! let printed = printed.lock().unwrap();
//! assert_eq!(printed.len(), 2);
//! assert!(printed[0].starts_with("import.file[0] :: Error("));
//! ```
//!
//! ## Core Concepts
//!
//! - A [`Label`] is a dot-separated path such as `import.file[0]`.
//!   Every segment is an identifier, optionally followed by an index in
//!   square brackets.
//! - A [`Failure`] is an error tagged with the label of the place it happened
//!   and a set of [`Details`]. Several failures travel together as a
//!   [`FailureGroup`]; [`Failures`] is either one of them.
//! - A [`Scope`] labels a block of code. Scopes form trees: a child's label is
//!   its parent's label followed by its own name. Failures are collected at
//!   the root of the tree and at every scope with its own handler or
//!   [`Severity`]. See the [`scope`] module for the exit protocol.
//! - A [`Filter`] selects failures by label, label pattern, error type or any
//!   predicate, and can be combined with [`Filter::any_of`],
//!   [`Filter::all_of`] and [`Filter::not`].
//! - A [`Handler`] decides what happens to each failure: sink it, ignore it
//!   or propagate it to the caller. Handlers are built with
//!   [`Handler::ignore`], [`Handler::propagate`], [`filtered`] and
//!   [`combine`].
//!
//! ## Errors
//!
//! Everything that can fail returns [`Error`]. It is either a labeled set of
//! failures, a plain error that was not captured by any scope yet, or a
//! [`ValidationError`]: a misuse of this crate, such as an invalid label or
//! an empty filter list. Validation errors are never turned into failures;
//! they pass through every scope and handler untouched.
//!
//! ## Panics
//!
//! Panics are not failures. They unwind through scopes without being
//! recorded.
//!
//! ## Feature Flags
//!
//! - `compat-anyhow1`: Conversions between [`Error`] and `anyhow::Error`, see
//!   [`compat`].
//!
//! ## Environment Variables
//!
//! - `FAULTSCOPE_CONSOLE`: configures the console sink used by
//!   [`Handler::default`], see [`hooks::builtin_hooks::console`].

extern crate alloc;

#[macro_use]
mod macros;

pub mod compat;
pub mod details;
pub mod error;
pub mod failure;
pub mod filter;
pub mod handlers;
pub mod hooks;
pub mod label;
pub mod prelude;
pub mod scope;

mod cause;

pub use self::{
    cause::Cause,
    details::Details,
    error::{Error, ValidationError},
    failure::{Failure, FailureGroup, Failures},
    filter::Filter,
    handlers::{Action, Handler, combine, filtered, handler},
    label::Label,
    scope::{Reporter, Scope, ScopeBuilder, Severity, scoped, scoped_with},
};

/// A [`Result`](core::result::Result) type alias where the error is [`Error`].
///
/// # Examples
///
/// ```
/// use faultscope::bail;
///
/// fn ratio(a: u32, b: u32) -> faultscope::Result<u32> {
///     if b == 0 {
///         bail!("cannot divide {a} by zero");
///     }
///     Ok(a / b)
/// }
///
/// assert_eq!(ratio(6, 3).unwrap(), 2);
/// assert_eq!(ratio(6, 0).unwrap_err().to_string(), "cannot divide 6 by zero");
/// ```
pub type Result<T, E = Error> = core::result::Result<T, E>;

// Not public API. Referenced by macro-generated code.
#[doc(hidden)]
pub mod __private {
    use alloc::fmt;
    #[doc(hidden)]
    pub use alloc::format;
    #[doc(hidden)]
    pub use core::{
        any::type_name_of_val,
        format_args,
        option::Option::{None, Some},
        result::Result::Err,
    };

    use crate::Error;

    #[doc(hidden)]
    #[inline]
    #[cold]
    #[must_use]
    pub fn format_error(args: fmt::Arguments<'_>) -> Error {
        if let Some(message) = args.as_str() {
            Error::msg(message)
        } else {
            Error::msg(fmt::format(args))
        }
    }

    /// Extracts the function name from the type name of an item declared
    /// inside it.
    #[doc(hidden)]
    #[must_use]
    pub fn function_name(item: &'static str) -> &'static str {
        let mut path = item.strip_suffix("::f").unwrap_or(item);
        while let Some(outer) = path.strip_suffix("::{{closure}}") {
            path = outer;
        }
        path.rsplit("::").next().unwrap_or(path)
    }

}
