use alloc::string::String;
use core::cell::RefCell;

use super::{Scope, Severity, TreeId};
use crate::{Details, Handler, Label, ValidationError, details::Value, hooks};

/// Builder for [`Scope`]s, created with [`Scope::builder`] or
/// [`Scope::derive`].
///
/// # Examples
///
/// ```
/// use faultscope::{Handler, Scope, Severity};
///
/// let root = Scope::builder("sync")
///     .handler(Handler::noop())
///     .detail("attempt", 3)
///     .build()
///     .unwrap();
/// let step = root
///     .derive("upload")
///     .severity(Severity::Required)
///     .build()
///     .unwrap();
///
/// assert_eq!(step.label(), "sync.upload");
/// assert_eq!(step.details().get("attempt").unwrap().to_string(), "3");
/// ```
#[must_use]
pub struct ScopeBuilder<'p> {
    name: String,
    parent: Option<&'p Scope<'p>>,
    handler: Option<Handler>,
    severity: Option<Severity>,
    details: Details,
}

impl ScopeBuilder<'static> {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            parent: None,
            handler: None,
            severity: None,
            details: Details::new(),
        }
    }
}

impl<'p> ScopeBuilder<'p> {
    pub(crate) fn with_parent(name: &str, parent: &'p Scope<'p>) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent),
            handler: None,
            severity: None,
            details: Details::new(),
        }
    }

    /// Sets the handler of the scope, making it an aggregation point.
    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Uses [`hooks::default_handler`] as the handler of the scope.
    pub fn default_handler(self) -> Self {
        self.handler(hooks::default_handler())
    }

    /// Sets the severity of the scope, making it an aggregation point.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Adds a detail attached to every failure captured by the scope.
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key, value);
        self
    }

    /// Adds several details at once. Later values override earlier ones.
    pub fn details(mut self, details: Details) -> Self {
        self.details.extend_from(&details);
        self
    }

    /// Creates the scope.
    ///
    /// Fails if the name is not a valid label, or if the parent already has
    /// a child with the same name.
    pub fn build(self) -> Result<Scope<'p>, ValidationError> {
        let name = Label::new(&self.name)?;
        let aggregates =
            self.parent.is_none() || self.handler.is_some() || self.severity.is_some();

        let Some(parent) = self.parent else {
            return Ok(Scope {
                label: name.clone(),
                name,
                parent: None,
                tree: TreeId::next(),
                details: self.details,
                handler: self.handler,
                severity: self.severity.unwrap_or_default(),
                aggregates,
                children: RefCell::default(),
                failures: RefCell::default(),
            });
        };

        parent.register_child(&name)?;
        Ok(Scope {
            label: parent.label.join(&name),
            name,
            parent: Some(parent),
            tree: parent.tree,
            details: parent.details.merged(&self.details),
            handler: self.handler.or_else(|| parent.handler.clone()),
            severity: self.severity.unwrap_or(parent.severity),
            aggregates,
            children: RefCell::default(),
            failures: RefCell::default(),
        })
    }
}
