/// Creates an [`Error`](crate::Error).
///
/// When invoked with a literal as the first argument, the arguments are
/// evaluated like those of [`format!()`] and the resulting string becomes a
/// [`Message`](crate::error::Message) error. Any other expression is
/// converted with [`Error::from`](crate::Error).
///
/// [`format!()`]: std::format
///
/// # Examples
///
/// ```
/// use faultscope::{Error, fault};
///
/// let error: Error = fault!("disk full");
/// assert_eq!(error.to_string(), "disk full");
///
/// let error: Error = fault!("{} bytes missing", 12);
/// assert_eq!(error.to_string(), "12 bytes missing");
///
/// let error: Error = fault!(std::io::Error::other("closed"));
/// assert!(error.is::<std::io::Error>());
/// ```
#[macro_export]
macro_rules! fault {
    ($msg:literal $(,)?) => {
        $crate::__private::format_error($crate::__private::format_args!($msg))
    };
    ($error:expr $(,)?) => {
        $crate::Error::from($error)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::msg($crate::__private::format!($fmt, $($arg)*))
    };
}

/// Return early with an error.
///
/// This is equivalent to writing `return Err(fault!(...).into());`
///
/// # Examples
///
/// ```
/// use faultscope::{Scope, bail};
///
/// fn check(value: i32) -> faultscope::Result<i32> {
///     if value < 0 {
///         bail!("value must be non-negative, got {}", value);
///     }
///     Ok(value)
/// }
///
/// let scope = Scope::new("check").unwrap();
/// let error = scope.run(|_| check(-1)).unwrap_err();
/// assert_eq!(error.label().unwrap(), "check");
/// ```
#[macro_export]
macro_rules! bail {
    ($($args:tt)*) => {
        return $crate::__private::Err($crate::fault!($($args)*).into())
    };
}

/// Builds a [`Details`](crate::Details) map.
///
/// # Examples
///
/// ```
/// use faultscope::details;
///
/// let details = details! {
///     "path" => "/tmp/input.csv",
///     "line" => 12,
/// };
/// assert_eq!(details.len(), 2);
/// assert!(details!().is_empty());
/// ```
#[macro_export]
macro_rules! details {
    () => {
        $crate::Details::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut details = $crate::Details::new();
        $(details.insert($key, $value);)+
        details
    }};
}

/// Runs a block inside a scope named after the enclosing function.
///
/// - `scoped!(parent, body)` binds the scope to `parent`, a `&Scope` or an
///   `Option<&Scope>`.
/// - `scoped!(body)` runs `body` in a new unbound root scope.
/// - `scoped!("name", parent, body)` uses an explicit name.
/// - `scoped!(handler = h, parent, body)` and `scoped!(handler = h, body)`
///   give the scope its own [`Handler`](crate::Handler), see
///   [`scoped_with`](crate::scoped_with).
///
/// `body` receives the new scope. The result is the one of
/// [`Scope::run`](crate::Scope::run).
///
/// # Examples
///
/// ```
/// use faultscope::{Scope, scoped};
///
/// fn load(parent: &Scope<'_>) -> faultscope::Result<Option<u32>> {
///     scoped!(parent, |scope| {
///         assert_eq!(scope.label(), "job.load");
///         "12".parse::<u32>()
///     })
/// }
///
/// let root = Scope::new("job").unwrap();
/// assert_eq!(load(&root).unwrap(), Some(12));
/// ```
#[macro_export]
macro_rules! scoped {
    (handler = $handler:expr, $parent:expr, $body:expr $(,)?) => {
        $crate::scoped_with(
            $crate::__function_name!(),
            $parent,
            $crate::__private::Some($handler),
            $body,
        )
    };
    (handler = $handler:expr, $body:expr $(,)?) => {
        $crate::scoped_with(
            $crate::__function_name!(),
            $crate::__private::None::<&$crate::Scope<'_>>,
            $crate::__private::Some($handler),
            $body,
        )
    };
    ($name:literal, $parent:expr, $body:expr $(,)?) => {
        $crate::scoped($name, $parent, $body)
    };
    ($parent:expr, $body:expr $(,)?) => {
        $crate::scoped($crate::__function_name!(), $parent, $body)
    };
    ($body:expr $(,)?) => {
        $crate::scoped(
            $crate::__function_name!(),
            $crate::__private::None::<&$crate::Scope<'_>>,
            $body,
        )
    };
}

// Expands to the name of the enclosing function.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        $crate::__private::function_name($crate::__private::type_name_of_val(&f))
    }};
}
