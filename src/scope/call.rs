use core::future::Future;

use super::Scope;
use crate::{Details, Error, Handler};

impl<'p> Scope<'p> {
    /// Runs `body` inside this scope and then runs the exit protocol.
    ///
    /// Returns `Ok(Some(value))` when `body` succeeds and nothing has to be
    /// raised, `Ok(None)` when its error was collected, handled or ignored,
    /// and `Err` when an error has to reach the caller. Panics are not
    /// caught.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultscope::{Handler, Scope};
    ///
    /// let scope = Scope::builder("parse").handler(Handler::noop()).build().unwrap();
    /// let value = scope.run(|_| "42".parse::<u32>()).unwrap();
    /// assert_eq!(value, Some(42));
    ///
    /// let value = scope.run(|_| "forty-two".parse::<u32>()).unwrap();
    /// assert_eq!(value, None);
    /// ```
    pub fn run<T, E>(&self, body: impl FnOnce(&Self) -> Result<T, E>) -> Result<Option<T>, Error>
    where
        E: Into<Error>,
    {
        match body(self) {
            Ok(value) => {
                self.handle(None)?;
                Ok(Some(value))
            }
            Err(error) => {
                self.handle(Some(error.into()))?;
                Ok(None)
            }
        }
    }

    /// Awaits `body` inside this scope and then runs the exit protocol.
    ///
    /// Behaves like [`Scope::run`].
    pub async fn run_async<T, E>(
        &self,
        body: impl Future<Output = Result<T, E>>,
    ) -> Result<Option<T>, Error>
    where
        E: Into<Error>,
    {
        match body.await {
            Ok(value) => {
                self.handle(None)?;
                Ok(Some(value))
            }
            Err(error) => {
                self.handle(Some(error.into()))?;
                Ok(None)
            }
        }
    }

    /// Calls `f`, recording its error as a failure of this scope.
    ///
    /// Unlike [`Scope::run`] this does not exit the scope: the failure waits
    /// at the aggregation point like one passed to [`Scope::report`].
    pub fn safe<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<Option<T>, Error>
    where
        E: Into<Error>,
    {
        match f() {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                self.report(error, Details::new())?;
                Ok(None)
            }
        }
    }

    /// Awaits `f`, recording its error as a failure of this scope.
    pub async fn safe_async<T, E>(
        &self,
        f: impl Future<Output = Result<T, E>>,
    ) -> Result<Option<T>, Error>
    where
        E: Into<Error>,
    {
        match f.await {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                self.report(error, Details::new())?;
                Ok(None)
            }
        }
    }

    /// Calls `f`, dropping its error.
    ///
    /// Validation errors are still returned.
    pub fn optional<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<Option<T>, Error>
    where
        E: Into<Error>,
    {
        f().map(Some).or_else(drop_unless_validation)
    }

    /// Awaits `f`, dropping its error.
    ///
    /// Validation errors are still returned.
    pub async fn optional_async<T, E>(
        f: impl Future<Output = Result<T, E>>,
    ) -> Result<Option<T>, Error>
    where
        E: Into<Error>,
    {
        f.await.map(Some).or_else(drop_unless_validation)
    }

    /// Calls `f`, turning its error into a failure labeled with this scope.
    ///
    /// The failure is returned to the caller rather than collected.
    pub fn required<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, Error>
    where
        E: Into<Error>,
    {
        f().map_err(|error| self.raise(error.into()))
    }

    /// Awaits `f`, turning its error into a failure labeled with this scope.
    pub async fn required_async<T, E>(
        &self,
        f: impl Future<Output = Result<T, E>>,
    ) -> Result<T, Error>
    where
        E: Into<Error>,
    {
        f.await.map_err(|error| self.raise(error.into()))
    }

    fn raise(&self, error: Error) -> Error {
        match self.capture(error) {
            Ok(failures) => Error::failed(Some(self.tree), failures),
            Err(error) => error,
        }
    }
}

fn drop_unless_validation<T, E: Into<Error>>(error: E) -> Result<Option<T>, Error> {
    let error = error.into();
    if error.is_validation() {
        Err(error)
    } else {
        Ok(None)
    }
}

/// Values accepted as the parent of a [`scoped`] call.
///
/// Implemented for scope references and optional scope references.
pub trait ParentScope<'a> {
    /// Returns the parent scope, if any.
    fn into_parent(self) -> Option<&'a Scope<'a>>;
}

impl<'a, 'p: 'a> ParentScope<'a> for &'a Scope<'p> {
    fn into_parent(self) -> Option<&'a Scope<'a>> {
        Some(self)
    }
}

impl<'a, 'p: 'a> ParentScope<'a> for Option<&'a Scope<'p>> {
    fn into_parent(self) -> Option<&'a Scope<'a>> {
        self.map(|scope| -> &'a Scope<'a> { scope })
    }
}

/// Runs `body` inside a scope named `name`.
///
/// The scope is a child of `parent` when one is given, and an unbound root
/// scope otherwise. See the [`scoped!`](crate::scoped!) macro, which names the
/// scope after the enclosing function.
///
/// # Examples
///
/// ```
/// use faultscope::{Scope, scoped};
///
/// let root = Scope::new("job").unwrap();
/// let value = scoped("load", &root, |scope| {
///     assert_eq!(scope.label(), "job.load");
///     Ok::<_, faultscope::Error>(1)
/// })
/// .unwrap();
/// assert_eq!(value, Some(1));
///
/// let error = scoped("standalone", None::<&Scope<'_>>, |_| {
///     Err::<(), _>(std::io::Error::other("gone"))
/// })
/// .unwrap_err();
/// assert_eq!(error.label().unwrap(), "standalone");
/// ```
pub fn scoped<'a, T, E, F>(
    name: &str,
    parent: impl ParentScope<'a>,
    body: F,
) -> Result<Option<T>, Error>
where
    F: FnOnce(&Scope<'_>) -> Result<T, E>,
    E: Into<Error>,
{
    scoped_with(name, parent, None, body)
}

/// Runs `body` inside a scope named `name`, optionally with its own handler.
///
/// A scope given a handler is an aggregation point: the failures of `body`
/// and of every scope it derives go to that handler instead of travelling to
/// `parent`. Without a handler this is [`scoped`].
///
/// # Examples
///
/// ```
/// use faultscope::{Handler, Scope, scoped_with};
///
/// let root = Scope::new("job").unwrap();
/// let value = scoped_with("cleanup", &root, Some(Handler::noop()), |_| {
///     Err::<(), _>(std::io::Error::other("busy"))
/// })
/// .unwrap();
/// assert_eq!(value, None);
/// assert!(root.failures().is_empty());
/// ```
pub fn scoped_with<'a, T, E, F>(
    name: &str,
    parent: impl ParentScope<'a>,
    handler: Option<Handler>,
    body: F,
) -> Result<Option<T>, Error>
where
    F: FnOnce(&Scope<'_>) -> Result<T, E>,
    E: Into<Error>,
{
    let builder = match parent.into_parent() {
        Some(parent) => parent.derive(name),
        None => Scope::builder(name),
    };
    let builder = match handler {
        Some(handler) => builder.handler(handler),
        None => builder,
    };
    builder.build()?.run(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Handler, ValidationError, error::Message};

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_run_collects_into_the_root() {
        let root = Scope::new("root").unwrap();
        let child = root.child("child").unwrap();
        assert_eq!(child.run(|_| Err::<(), _>(Boom)).unwrap(), None);
        assert_eq!(child.run(|_| Ok::<_, Boom>(3)).unwrap(), Some(3));
        assert_eq!(root.failures().len(), 1);
    }

    #[test]
    fn test_safe_reports_without_exiting() {
        let root = Scope::builder("root").handler(Handler::noop()).build().unwrap();
        assert_eq!(root.safe(|| Err::<u8, _>(Boom)).unwrap(), None);
        assert_eq!(root.safe(|| Ok::<_, Boom>(2)).unwrap(), Some(2));
        assert_eq!(root.failures().len(), 1);
        assert_eq!(root.failures()[0].source(), "root");

        let error = root
            .safe(|| Err::<u8, _>(ValidationError::value("bad")))
            .unwrap_err();
        assert!(error.is_validation());
    }

    #[test]
    fn test_optional() {
        assert_eq!(Scope::optional(|| Err::<u8, _>(Boom)).unwrap(), None);
        assert_eq!(Scope::optional(|| Ok::<_, Boom>(1)).unwrap(), Some(1));
        assert!(
            Scope::optional(|| Err::<u8, _>(ValidationError::type_error("bad")))
                .unwrap_err()
                .is_validation()
        );
    }

    #[test]
    fn test_required() {
        let root = Scope::new("root").unwrap();
        let child = root.child("needed").unwrap();
        let error = child.required(|| Err::<u8, _>(Message::new("no"))).unwrap_err();
        assert_eq!(error.label().unwrap(), "root.needed");
        assert!(root.failures().is_empty());

        // Raised by this tree, so the root keeps the label
        let error = root.handle(Some(error)).unwrap_err();
        assert_eq!(error.label().unwrap(), "root.needed");
    }

    #[test]
    fn test_scoped_binds_to_the_parent() {
        let root = Scope::new("root").unwrap();
        let result = scoped("inner", &root, |scope| {
            assert_eq!(scope.label(), "root.inner");
            Err::<(), _>(Boom)
        });
        assert_eq!(result.unwrap(), None);
        assert_eq!(root.failures()[0].source(), "root.inner");
    }

    #[test]
    fn test_scoped_with_handler_aggregates() {
        let seen = alloc::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            Handler::new(move |failure| seen.lock().unwrap().push(failure.source().to_string()))
        };

        let root = Scope::new("root").unwrap();
        let result = scoped_with("handled", &root, Some(sink.clone()), |scope| {
            assert!(scope.is_aggregation_point());
            scope.child("step")?.run(|_| Err::<(), _>(Boom))?;
            Err::<(), _>(Error::from(Boom))
        });
        assert_eq!(result.unwrap(), None);
        assert_eq!(*seen.lock().unwrap(), ["root.handled.step", "root.handled"]);
        assert!(root.failures().is_empty());

        let result = scoped_with("alone", None::<&Scope<'_>>, Some(sink), |_| Err::<(), _>(Boom));
        assert_eq!(result.unwrap(), None);
        assert_eq!(seen.lock().unwrap().last().unwrap(), "alone");

        let error = scoped_with("bad name", &root, None, |_| Ok::<_, Boom>(())).unwrap_err();
        assert!(error.is_validation());
    }
}
