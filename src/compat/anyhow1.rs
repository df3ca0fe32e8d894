//! Bidirectional integration with the [`anyhow`] 1.x error handling library.
//!
//! To enable this integration, add the `compat-anyhow1` feature flag to your
//! `Cargo.toml`.
//!
//! # Converting from Anyhow
//!
//! Use the [`IntoFaultscope`] trait to bring `anyhow` errors into a scope. A
//! [`ValidationError`] that travelled through `anyhow` is recognised again, so
//! it keeps bypassing every scope.
//!
//! ```
//! use faultscope::{Scope, compat::IntoFaultscope};
//!
//! fn anyhow_function() -> anyhow::Result<u32> {
//!     anyhow::bail!("connection refused");
//! }
//!
//! let scope = Scope::new("sync").unwrap();
//! let error = scope
//!     .run(|_| anyhow_function().into_faultscope())
//!     .unwrap_err();
//! assert_eq!(error.label().unwrap(), "sync");
//! assert_eq!(error.cause().unwrap().to_string(), "connection refused");
//! ```
//!
//! # Converting to Anyhow
//!
//! [`Error`] converts into [`anyhow::Error`] through `From`, so `?` works in
//! functions returning [`anyhow::Result`]:
//!
//! ```
//! use faultscope::Scope;
//!
//! fn anyhow_function() -> anyhow::Result<()> {
//!     let scope = Scope::new("sync")?;
//!     scope.run(|_| Err::<(), _>(std::io::Error::other("timeout")))?;
//!     Ok(())
//! }
//!
//! let error = anyhow_function().unwrap_err();
//! assert_eq!(error.to_string(), "sync :: Error(timeout)");
//! ```

use core::fmt;

use super::{ErrorAsStd, IntoFaultscope};
use crate::{Error, ValidationError};

/// An [`anyhow::Error`] wrapped so that it implements
/// [`core::error::Error`].
pub struct AnyhowError(pub anyhow::Error);

impl fmt::Debug for AnyhowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for AnyhowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl core::error::Error for AnyhowError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.0.source()
    }
}

impl IntoFaultscope for anyhow::Error {
    type Output = Error;

    fn into_faultscope(self) -> Self::Output {
        let error = match self.downcast::<ValidationError>() {
            Ok(validation) => return Error::from(validation),
            Err(error) => error,
        };
        match error.downcast::<ErrorAsStd>() {
            Ok(wrapper) => wrapper.0,
            Err(error) => Error::from(AnyhowError(error)),
        }
    }
}

impl<T> IntoFaultscope for anyhow::Result<T> {
    type Output = Result<T, Error>;

    fn into_faultscope(self) -> Self::Output {
        self.map_err(IntoFaultscope::into_faultscope)
    }
}

/// Converts [`Error`]s into [`anyhow::Error`]s.
pub trait IntoAnyhow {
    /// The converted type.
    type Output;

    /// Performs the conversion.
    fn into_anyhow(self) -> Self::Output;
}

impl IntoAnyhow for Error {
    type Output = anyhow::Error;

    fn into_anyhow(self) -> Self::Output {
        anyhow::Error::from(self)
    }
}

impl<T> IntoAnyhow for Result<T, Error> {
    type Output = anyhow::Result<T>;

    fn into_anyhow(self) -> Self::Output {
        self.map_err(IntoAnyhow::into_anyhow)
    }
}

impl From<Error> for anyhow::Error {
    fn from(error: Error) -> Self {
        match error.validation() {
            Some(validation) => anyhow::Error::new(validation.clone()),
            None => anyhow::Error::new(ErrorAsStd(error)),
        }
    }
}
