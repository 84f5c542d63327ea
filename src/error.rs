//! Top-level error taxonomy.
//!
//! Every fallible operation in the crate ultimately returns a [`RepolexError`]
//! so callers (CLI, TUI, docs emitter) can match on a stable set of kinds
//! instead of threading module-specific error types through their own code.

use thiserror::Error;

/// A single, stable error kind, independent of which module raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Security,
    NotFound,
    Storage,
    Processing,
    Export,
}

/// The crate-wide error type.
///
/// Carries a human message and a list of remediation suggestions, per the
/// error handling design: callers are expected to surface both rather than
/// retry autonomously.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RepolexError {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl RepolexError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Security, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Processing, message)
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Export, message)
    }
}

pub type RepolexResult<T> = Result<T, RepolexError>;

impl From<crate::store::StoreError> for RepolexError {
    fn from(e: crate::store::StoreError) -> Self {
        match e {
            crate::store::StoreError::GraphNotFound(g) => {
                RepolexError::not_found(format!("graph not found: {g}"))
            }
            crate::store::StoreError::Io(msg) => RepolexError::storage(msg),
            crate::store::StoreError::Sparql(msg) => RepolexError::storage(msg),
        }
    }
}

impl From<crate::schema::SanitiserError> for RepolexError {
    fn from(e: crate::schema::SanitiserError) -> Self {
        RepolexError::validation(e.to_string())
    }
}

impl From<crate::sparql::SparqlError> for RepolexError {
    fn from(e: crate::sparql::SparqlError) -> Self {
        match e {
            crate::sparql::SparqlError::Rejected(msg) => RepolexError::security(msg),
            crate::sparql::SparqlError::TooLong(msg) => RepolexError::validation(msg),
            crate::sparql::SparqlError::Parse(msg) => RepolexError::validation(msg),
            crate::sparql::SparqlError::Execution(msg) => RepolexError::storage(msg),
        }
    }
}
