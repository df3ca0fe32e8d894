//! Commonly used items for convenient importing.
//!
//! # Usage
//!
//! ```rust
//! use faultscope::prelude::*;
//!
//! fn parse(input: &str) -> Result<u32, Error> {
//!     if input.is_empty() {
//!         bail!("empty input");
//!     }
//!     Ok(input.parse()?)
//! }
//!
//! let root = Scope::builder("parse").handler(Handler::noop()).build().unwrap();
//! assert_eq!(root.run(|_| parse("7")).unwrap(), Some(7));
//! ```
//!
//! # What's Included
//!
//! - **[`Scope`]** and **[`Severity`]**: Labeling and collecting failures
//! - **[`Handler`]** and **[`Filter`]**: Dispatching failures
//! - **[`Error`]**, **[`Failure`]** and **[`Details`]**: The data that flows
//!   between them
//! - **[`fault!`]**, **[`bail!`]**, **[`details!`]** and **[`scoped!`]**:
//!   Macros for creating errors, details and scopes

pub use crate::{
    Details, Error, Failure, Filter, Handler, Scope, Severity, bail, details, fault, scoped,
};
