//! Error types for xsdbind
//!
//! This module defines all error types used throughout the library.
//! Every engine is fail-fast: the first error aborts the whole call.

use std::fmt;
use thiserror::Error;

/// Result type alias using xsdbind Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xsdbind operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or unclosed schema tags, kind-mismatched closes
    #[error("schema syntax error: {0}")]
    SchemaSyntax(#[from] ParseError),

    /// A reference could not be resolved within the retry budget
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// Two structurally different definitions share one name
    #[error("duplicate definition: {0}")]
    DuplicateDefinition(String),

    /// Element, attribute or choice occurrence count violated
    #[error("cardinality error: {0}")]
    Cardinality(ValidationError),

    /// A required attribute is absent or empty
    #[error("missing required attribute: {0}")]
    MissingRequiredAttribute(ValidationError),

    /// A value could not be converted to or from its lexical form
    #[error("type conversion error: {0}")]
    TypeConversion(String),

    /// A restriction facet rejected a value, or does not apply to the type
    #[error("restriction violation: {0}")]
    RestrictionViolation(ValidationError),

    /// An unexpected element where another one was required
    #[error("structure mismatch: {0}")]
    StructureMismatch(ValidationError),

    /// A mapped member or class is unreachable on the host side
    #[error("accessor error: {0}")]
    Accessor(String),

    /// Malformed document text
    #[error("XML error: {0}")]
    Xml(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Invalid settings
    #[error("configuration error: {0}")]
    Config(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of an [`Error`], stable for matching in callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::SchemaSyntax`]
    SchemaSyntax,
    /// See [`Error::UnresolvedReference`]
    UnresolvedReference,
    /// See [`Error::DuplicateDefinition`]
    DuplicateDefinition,
    /// See [`Error::Cardinality`]
    Cardinality,
    /// See [`Error::MissingRequiredAttribute`]
    MissingRequiredAttribute,
    /// See [`Error::TypeConversion`]
    TypeConversion,
    /// See [`Error::RestrictionViolation`]
    RestrictionViolation,
    /// See [`Error::StructureMismatch`]
    StructureMismatch,
    /// See [`Error::Accessor`]
    Accessor,
    /// See [`Error::Xml`]
    Xml,
    /// See [`Error::LimitExceeded`]
    LimitExceeded,
    /// See [`Error::Config`]
    Config,
    /// See [`Error::Resource`]
    Resource,
    /// See [`Error::Io`]
    Io,
}

impl Error {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SchemaSyntax(_) => ErrorKind::SchemaSyntax,
            Error::UnresolvedReference(_) => ErrorKind::UnresolvedReference,
            Error::DuplicateDefinition(_) => ErrorKind::DuplicateDefinition,
            Error::Cardinality(_) => ErrorKind::Cardinality,
            Error::MissingRequiredAttribute(_) => ErrorKind::MissingRequiredAttribute,
            Error::TypeConversion(_) => ErrorKind::TypeConversion,
            Error::RestrictionViolation(_) => ErrorKind::RestrictionViolation,
            Error::StructureMismatch(_) => ErrorKind::StructureMismatch,
            Error::Accessor(_) => ErrorKind::Accessor,
            Error::Xml(_) => ErrorKind::Xml,
            Error::LimitExceeded(_) => ErrorKind::LimitExceeded,
            Error::Config(_) => ErrorKind::Config,
            Error::Resource(_) => ErrorKind::Resource,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Shorthand for a schema syntax error
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Error::SchemaSyntax(ParseError::new(message))
    }

    /// Attach an element path to validation and conversion errors
    pub(crate) fn at_path(self, path: &str) -> Self {
        match self {
            Error::Cardinality(e) => Error::Cardinality(e.or_path(path)),
            Error::MissingRequiredAttribute(e) => Error::MissingRequiredAttribute(e.or_path(path)),
            Error::RestrictionViolation(e) => Error::RestrictionViolation(e.or_path(path)),
            Error::StructureMismatch(e) => Error::StructureMismatch(e.or_path(path)),
            Error::TypeConversion(message) if !message.starts_with('/') => {
                Error::TypeConversion(format!("{}: {}", path, message))
            }
            other => other,
        }
    }
}

/// Data validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Path to the element that failed validation
    pub path: Option<String>,
    /// Offending value or tag
    pub instance: Option<String>,
    /// Original failure reason
    pub reason: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            instance: None,
            reason: None,
        }
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the instance snippet
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    // The innermost path wins: it is the most precise location.
    fn or_path(self, path: &str) -> Self {
        if self.path.is_some() {
            self
        } else {
            self.with_path(path)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref reason) = self.reason {
            write!(f, " (reason: {})", reason)?;
        }

        if let Some(ref path) = self.path {
            write!(f, " at {}", path)?;
        }

        if let Some(ref instance) = self.instance {
            write!(f, " [instance: {}]", instance)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Schema parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Index of the offending tag in the token stream
    pub location: Option<usize>,
    /// Tag text that caused the error
    pub source: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the token index
    pub fn with_location(mut self, location: usize) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the source tag
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(loc) = self.location {
            write!(f, " at tag #{}", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}
