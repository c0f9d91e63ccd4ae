//! Validation error types with miette integration

use miette::Diagnostic;
use thiserror::Error;

/// Broad classification of a validation failure.
///
/// The two structural kinds are never swallowed, not even in collect mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Structural,
    ClosedSchema,
    Reference,
    Consistency,
}

impl ErrorKind {
    pub fn is_structural(self) -> bool {
        matches!(self, ErrorKind::Structural | ErrorKind::ClosedSchema)
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ValidationError {
    /// Wrong or missing `type`, malformed id, wrongly typed attribute values
    #[error("{0}")]
    #[diagnostic(code(modelguard::structural))]
    Structural(String),

    /// Attribute not recognized, or not allowed for the declared type
    #[error("{0}")]
    #[diagnostic(
        code(modelguard::closed_schema),
        help("model and property attributes form a closed set; remove or rename the attribute")
    )]
    ClosedSchema(String),

    /// Dangling `ref`, `subClassOf`, `interfaces` or form entry
    #[error("{0}")]
    #[diagnostic(
        code(modelguard::reference),
        help("make sure the referenced model is part of the validated model set")
    )]
    Reference(String),

    /// Rules spanning several attributes or models
    #[error("{0}")]
    #[diagnostic(code(modelguard::consistency))]
    Consistency(String),

    /// Positional context (model, property, group) around an inner failure
    #[error("{context}: {inner}")]
    #[diagnostic(code(modelguard::invalid))]
    Context {
        context: String,
        inner: Box<ValidationError>,
    },

    #[error("{} validation errors", .0.len())]
    #[diagnostic(code(modelguard::aggregate))]
    Aggregate(#[related] Vec<ValidationError>),
}

impl ValidationError {
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    pub fn closed_schema(message: impl Into<String>) -> Self {
        Self::ClosedSchema(message.into())
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::Reference(message.into())
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }

    /// Prepend positional context, keeping this error as the inner cause
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            inner: Box::new(self),
        }
    }

    /// The innermost error underneath any context wrappers
    pub fn root(&self) -> &ValidationError {
        match self {
            Self::Context { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Kind of the underlying failure. An aggregate reports its most severe member.
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Self::Structural(_) => ErrorKind::Structural,
            Self::ClosedSchema(_) => ErrorKind::ClosedSchema,
            Self::Reference(_) => ErrorKind::Reference,
            Self::Consistency(_) => ErrorKind::Consistency,
            Self::Aggregate(errors) => errors
                .iter()
                .map(ValidationError::kind)
                .min_by_key(|kind| match kind {
                    ErrorKind::Structural => 0,
                    ErrorKind::ClosedSchema => 1,
                    ErrorKind::Reference => 2,
                    ErrorKind::Consistency => 3,
                })
                .unwrap_or(ErrorKind::Consistency),
            Self::Context { .. } => unreachable!("root() strips context wrappers"),
        }
    }

    /// Collapse a list of errors into a single error
    pub fn from_many(mut errors: Vec<ValidationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Aggregate(errors)),
        }
    }
}

/// Message fragment for a reference to an unknown model
pub(crate) fn references_unknown_model(id: &str) -> String {
    format!("references non-existent model \"{id}\"")
}
