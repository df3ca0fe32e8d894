//! Interoperability with other error handling approaches.
//!
//! [`Error`] deliberately does not implement [`core::error::Error`], because
//! every standard error converts into it. [`ErrorAsStd`] bridges the gap when
//! a standard error is required, and `Box<dyn Error + Send + Sync>` can be
//! obtained directly through `From`.
//!
//! # Available Integrations
//!
//! - [`anyhow1`] - Conversions to and from `anyhow` 1.x (requires the
//!   `compat-anyhow1` feature flag)
//!
//! # Examples
//!
//! ```
//! use faultscope::{Error, compat::ErrorAsStd};
//!
//! fn std_only() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     Err(Error::msg("not found"))?;
//!     Ok(())
//! }
//!
//! assert_eq!(std_only().unwrap_err().to_string(), "not found");
//!
//! let wrapped: ErrorAsStd = Error::msg("not found").into();
//! assert_eq!(wrapped.to_string(), "not found");
//! ```

use crate::Error;

/// Converts errors of other error handling libraries into [`Error`]s.
///
/// Implemented for single errors and for `Result`s, so a foreign `Result`
/// can be turned into a `Result<T, faultscope::Error>` with one call.
pub trait IntoFaultscope {
    /// The converted type.
    type Output;

    /// Performs the conversion.
    fn into_faultscope(self) -> Self::Output;
}

#[cfg(feature = "compat-anyhow1")]
#[cfg_attr(docsrs, doc(cfg(feature = "compat-anyhow1")))]
pub mod anyhow1;

/// A wrapper that implements [`core::error::Error`] for an [`Error`].
///
/// The source of the wrapper is the underlying error of a domain error or of
/// the first labeled failure. Converting the wrapper back into an [`Error`]
/// unwraps it again.
pub struct ErrorAsStd(pub Error);

impl core::fmt::Debug for ErrorAsStd {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.0, f)
    }
}

impl core::fmt::Display for ErrorAsStd {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::error::Error for ErrorAsStd {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self.0.validation() {
            Some(validation) => Some(validation),
            None => self.0.cause().map(|cause| cause.as_error() as _),
        }
    }
}

impl From<Error> for ErrorAsStd {
    fn from(error: Error) -> Self {
        ErrorAsStd(error)
    }
}
