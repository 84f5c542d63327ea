//! Repolex: a semantic graph engine for source repositories.
//!
//! Repolex ingests the facts a language-specific parser extracts from one
//! version of a repository (functions, classes, imports, files, git
//! metadata) and persists them as RDF named graphs in an embedded quad
//! store. Two identities exist for every function: a stable identity that
//! survives renames and refactors across versions, and a versioned
//! implementation identity scoped to exactly one ingested release. Queries
//! run over the store through a read-only SPARQL surface or a weighted
//! natural-language search; a compact MessagePack "semantic DNA" export
//! summarizes a release for consumption outside the store entirely.
//!
//! # Modules
//!
//! - [`model`] — the facts a caller hands to [`coordinator::Coordinator`].
//! - [`ontology`] — the `woc:`/`git:`/`evolution:`/`files:` vocabulary.
//! - [`schema`] — IRI sanitisation and every graph/IRI builder function.
//! - [`store`] — the embedded quad store client.
//! - [`builder`] — facts to quads: stable/implementation resolution.
//! - [`classify`] — file kind/category classification for `files:` quads.
//! - [`abc`] — added/removed/modified/renamed diffing across versions.
//! - [`coordinator`] — the orchestration surface: repo/graph lifecycle,
//!   locking, the nuclear-update protocol, evolution statistics.
//! - [`sparql`] — the read-only SPARQL executor and result serialization.
//! - [`search`] — natural-language function search.
//! - [`dna`] — the semantic-DNA MessagePack export.
//! - [`config`] — on-disk layout and process configuration.
//! - [`error`] — the crate-wide error type.

pub mod abc;
pub mod builder;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod dna;
pub mod error;
pub mod model;
pub mod ontology;
pub mod schema;
pub mod search;
pub mod sparql;
pub mod store;

pub use coordinator::Coordinator;
pub use error::{ErrorKind, RepolexError, RepolexResult};
pub use model::{
    ClassFact, DirectoryFact, FactBag, FileFact, FunctionFact, GitSnapshot, ImportFact,
    RepoMetadata, Visibility,
};
pub use store::{QuadStoreClient, QueryLimits, QueryOutcome};

/// Crate version, matching `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the default `tracing` subscriber, honouring `RUST_LOG`.
///
/// The engine itself only emits `tracing` events; a collaborator (CLI, TUI,
/// docs emitter) decides how those are rendered by calling this once at
/// startup, mirroring the teacher's own `tracing_subscriber::fmt::init()`
/// call in its binary entry point.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
