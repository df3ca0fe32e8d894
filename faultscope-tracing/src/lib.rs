#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Tracing integration for faultscope.
//!
//! This crate connects faultscope to the `tracing` ecosystem in two
//! directions:
//!
//! - [`tracing_handler`] returns a [`Handler`] that emits one `tracing` event
//!   per failure, so failures end up wherever your subscriber sends its logs.
//! - [`FaultscopeLayer`] captures span field values, and [`SpanDetailsExt`]
//!   attaches the current span chain to the details of a scope.
//!
//! # Quick Start
//!
//! ```
//! use faultscope::Scope;
//! use faultscope_tracing::{FaultscopeLayer, SpanDetailsExt, tracing_handler};
//! use tracing_subscriber::{Registry, layer::SubscriberExt};
//!
//! // 1. Set up tracing with FaultscopeLayer
//! let subscriber = Registry::default()
//!     .with(FaultscopeLayer) // Captures span field values for failure details
//!     .with(tracing_subscriber::fmt::layer()); // Your normal console output
//! tracing::subscriber::set_global_default(subscriber).expect("failed to set subscriber");
//!
//! // 2. Send failures to tracing
//! #[tracing::instrument(fields(user_id = 42))]
//! fn sync_user() -> faultscope::Result<Option<()>> {
//!     let scope = Scope::builder("sync")
//!         .handler(tracing_handler())
//!         .span_details()
//!         .build()?;
//!     scope.run(|_| Err::<(), _>(std::io::Error::other("connection reset")))
//! }
//! sync_user().unwrap();
//! ```
//!
//! Output:
//! ```text
//! ERROR sync_user{user_id=42}: faultscope: connection reset source="sync" error_type="Error" details={span=sync_user{user_id=42}}
//! ```
//!
//! # Environment Variables
//!
//! - `FAULTSCOPE_TRACING` - Comma-separated options:
//!   - `warn` - Emit failures at the `WARN` level instead of `ERROR`

use std::{
    fmt::{self, Write as _},
    sync::OnceLock,
};

use faultscope::{Failure, Handler, ScopeBuilder};
use tracing::{
    Level, Span,
    field::{Field, Visit},
};
use tracing_subscriber::registry::LookupSpan;

/// The target of the events emitted by [`TracingSink`].
pub const TARGET: &str = "faultscope";

/// Captured field values for a span.
#[derive(Clone)]
struct CapturedFields(String);

struct FieldVisitor<'a> {
    output: &'a mut String,
}

impl Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if !self.output.is_empty() {
            self.output.push(' ');
        }
        let _ = write!(self.output, "{}={:?}", field.name(), value);
    }
}

/// A tracing layer that captures span field values for failure details.
///
/// **Required for [`current_span_chain`] and [`SpanDetailsExt`] to include
/// field values.** Without it only span names are available.
///
/// # Examples
///
/// ```
/// use faultscope_tracing::FaultscopeLayer;
/// use tracing_subscriber::{Registry, layer::SubscriberExt};
///
/// let subscriber = Registry::default()
///     .with(FaultscopeLayer) // Captures span data for failure details
///     .with(tracing_subscriber::fmt::layer()); // Example: console output
///
/// tracing::subscriber::set_global_default(subscriber).expect("failed to set subscriber");
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct FaultscopeLayer;

impl<S> tracing_subscriber::Layer<S> for FaultscopeLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut buf = String::new();
        attrs.record(&mut FieldVisitor { output: &mut buf });
        span.extensions_mut().insert(CapturedFields(buf));
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<CapturedFields>() {
            Some(fields) => values.record(&mut FieldVisitor {
                output: &mut fields.0,
            }),
            None => {
                let mut buf = String::new();
                values.record(&mut FieldVisitor { output: &mut buf });
                extensions.insert(CapturedFields(buf));
            }
        }
    }
}

/// Renders the current span and its ancestors, outermost first.
///
/// Spans are separated by `:` and followed by their captured fields, as in
/// `job{id=7}:step`. Returns `None` outside of any span or when the current
/// subscriber is not built on a [`Registry`](tracing_subscriber::Registry).
pub fn current_span_chain() -> Option<String> {
    let span = Span::current();
    span.with_subscriber(|(span_id, dispatch)| {
        let registry = dispatch.downcast_ref::<tracing_subscriber::Registry>()?;
        let span_ref = registry.span(span_id)?;

        let mut segments: Vec<String> = span_ref
            .scope()
            .map(|ancestor| {
                let mut segment = String::from(ancestor.name());
                if let Some(fields) = ancestor.extensions().get::<CapturedFields>() {
                    if !fields.0.is_empty() {
                        let _ = write!(segment, "{{{}}}", fields.0);
                    }
                }
                segment
            })
            .collect();
        segments.reverse();
        Some(segments.join(":"))
    })
    .flatten()
}

/// Extension trait adding the current span chain to the details of a scope.
///
/// # Examples
///
/// ```
/// use faultscope::Scope;
/// use faultscope_tracing::SpanDetailsExt;
///
/// #[tracing::instrument]
/// fn example() {
///     let scope = Scope::builder("example").span_details().build().unwrap();
/// }
/// ```
pub trait SpanDetailsExt: Sized {
    /// Adds the current span chain as the `span` detail.
    ///
    /// Nothing is added outside of any span.
    fn span_details(self) -> Self;
}

impl SpanDetailsExt for ScopeBuilder<'_> {
    fn span_details(self) -> Self {
        match current_span_chain() {
            Some(chain) => self.detail("span", chain),
            None => self,
        }
    }
}

#[derive(Debug)]
struct FaultscopeTracingEnvOptions {
    warn: bool,
}

impl FaultscopeTracingEnvOptions {
    fn get() -> &'static Self {
        static FAULTSCOPE_TRACING_FLAGS: OnceLock<FaultscopeTracingEnvOptions> = OnceLock::new();

        FAULTSCOPE_TRACING_FLAGS.get_or_init(|| {
            let mut warn = false;

            if let Some(var) = std::env::var_os("FAULTSCOPE_TRACING") {
                for v in var.to_string_lossy().split(',') {
                    if v.trim().eq_ignore_ascii_case("warn") {
                        warn = true;
                    }
                }
            }

            FaultscopeTracingEnvOptions { warn }
        })
    }
}

/// Emits failures as `tracing` events.
///
/// Every event has the target [`TARGET`], the error message as its message
/// and the fields `source`, `error_type` and `details`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TracingSink {
    /// Level of the emitted events
    pub level: Level,
}

impl TracingSink {
    /// Creates a sink emitting at the level selected by `FAULTSCOPE_TRACING`.
    ///
    /// # Environment Variables
    ///
    /// - `FAULTSCOPE_TRACING` - Comma-separated options:
    ///   - `warn` - Emit at the `WARN` level instead of `ERROR`
    pub fn new() -> Self {
        let level = if FaultscopeTracingEnvOptions::get().warn {
            Level::WARN
        } else {
            Level::ERROR
        };
        Self { level }
    }

    /// Emits the event for `failure`.
    pub fn emit(&self, failure: &Failure) {
        let source = failure.source().as_str();
        let error_type = failure.error().short_type_name();
        let details = failure.details();
        let error = failure.error();

        macro_rules! emit {
            ($event:ident) => {
                tracing::$event!(
                    target: TARGET,
                    source = source,
                    error_type = error_type,
                    details = %details,
                    "{}",
                    error
                )
            };
        }

        if self.level == Level::ERROR {
            emit!(error);
        } else if self.level == Level::WARN {
            emit!(warn);
        } else if self.level == Level::INFO {
            emit!(info);
        } else if self.level == Level::DEBUG {
            emit!(debug);
        } else {
            emit!(trace);
        }
    }

    /// Creates a handler emitting every failure with this sink.
    pub fn into_handler(self) -> Handler {
        Handler::new(move |failure| self.emit(failure))
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns a handler emitting every failure as a `tracing` event.
///
/// Shorthand for `TracingSink::new().into_handler()`.
pub fn tracing_handler() -> Handler {
    TracingSink::new().into_handler()
}
