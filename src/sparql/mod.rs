//! Read-only SPARQL query surface (spec §4.5, §6.3).
//!
//! [`SparqlExecutor`] is the only way the rest of the crate (and, through
//! it, any collaborator) runs a SPARQL query: it enforces the length cap,
//! rejects the update-family grammar on the parsed AST rather than by
//! substring match, and dispatches into [`crate::store::QuadStoreClient`].
//! [`results`] renders a [`crate::store::QueryOutcome`] into one of the
//! SPARQL 1.1 result formats.

mod executor;
mod results;

pub use executor::SparqlExecutor;
pub use results::{serialize, term_to_string};

use thiserror::Error;

/// SPARQL-surface errors, narrower than [`crate::error::RepolexError`] so
/// the executor doesn't need to depend on the crate-wide error type;
/// `crate::error` converts these at the boundary.
#[derive(Debug, Error)]
pub enum SparqlError {
    #[error("query rejected: {0}")]
    Rejected(String),
    #[error("query too long: {0}")]
    TooLong(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("execution error: {0}")]
    Execution(String),
}

pub type SparqlResult<T> = Result<T, SparqlError>;
