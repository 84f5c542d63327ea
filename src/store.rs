//! Quad store client (spec §4.1).
//!
//! Wraps an embedded `oxigraph::store::Store` and exposes exactly the
//! operations the rest of the crate needs: bulk insert with dedup,
//! all-or-nothing graph replacement, graph deletion, read-only SPARQL query,
//! named-graph enumeration, and per-graph stats. Nothing here inspects query
//! *content* — safety filtering lives in [`crate::sparql`].

use std::collections::HashSet;

use oxigraph::model::{GraphName, GraphNameRef, NamedNode, NamedOrBlankNode, Quad};
use oxigraph::sparql::{EvaluationError, Query, QueryResults};
use oxigraph::store::{self, Store};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph not found: {0}")]
    GraphNotFound(String),
    #[error("storage I/O error: {0}")]
    Io(String),
    #[error("SPARQL evaluation error: {0}")]
    Sparql(String),
}

impl From<store::StorageError> for StoreError {
    fn from(e: store::StorageError) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<store::LoaderError> for StoreError {
    fn from(e: store::LoaderError) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<EvaluationError> for StoreError {
    fn from(e: EvaluationError) -> Self {
        StoreError::Sparql(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Discriminated result of a read-only SPARQL execution, mirroring the
/// SELECT/ASK/CONSTRUCT/DESCRIBE split of spec §4.5.
pub enum QueryOutcome {
    Rows {
        variables: Vec<String>,
        solutions: Vec<Vec<(String, oxigraph::model::Term)>>,
        truncated: bool,
    },
    Boolean(bool),
    Graph(Vec<oxigraph::model::Triple>),
}

/// Quad counts and an approximate byte footprint for one named graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphStats {
    pub quad_count: usize,
    pub approx_bytes: usize,
}

/// Execution bounds applied to every `query` call (spec §4.5).
#[derive(Debug, Clone, Copy)]
pub struct QueryLimits {
    pub row_cap: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self { row_cap: 100_000 }
    }
}

/// The embedded quad store client.
pub struct QuadStoreClient {
    store: Store,
    limits: QueryLimits,
}

impl QuadStoreClient {
    /// Open (or create) a persistent store at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> StoreResult<Self> {
        let store = Store::open(path)?;
        info!("opened quad store");
        Ok(Self {
            store,
            limits: QueryLimits::default(),
        })
    }

    /// An ephemeral in-memory store, used by tests and by short-lived export
    /// tooling that never needs to persist across a process restart.
    pub fn in_memory() -> StoreResult<Self> {
        Ok(Self {
            store: Store::new()?,
            limits: QueryLimits::default(),
        })
    }

    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    fn graph_name(graph_iri: &str) -> StoreResult<GraphName> {
        Ok(GraphName::NamedNode(
            NamedNode::new(graph_iri).map_err(|e| StoreError::Io(e.to_string()))?,
        ))
    }

    /// Bulk insert, deduplicating against existing contents (the store's
    /// quad set already dedups; this just reports how many were new).
    pub fn insert_quads(&self, graph_iri: &str, quads: &[Quad]) -> StoreResult<usize> {
        let graph = Self::graph_name(graph_iri)?;
        let mut inserted = 0usize;
        for q in quads {
            let q = Quad::new(
                q.subject.clone(),
                q.predicate.clone(),
                q.object.clone(),
                graph.clone(),
            );
            if self.store.insert(&q)? {
                inserted += 1;
            }
        }
        debug!(graph = graph_iri, inserted, "insert_quads");
        Ok(inserted)
    }

    /// Remove specific quads from a graph, if present. Used for targeted
    /// attribute corrections (e.g. a stable function's visibility becoming
    /// more permissive) without a full nuclear `replace_graph` — the
    /// existence triples untouched here remain additive per spec §4.3.
    pub fn remove_quads(&self, graph_iri: &str, quads: &[Quad]) -> StoreResult<usize> {
        let graph = Self::graph_name(graph_iri)?;
        let mut removed = 0usize;
        for q in quads {
            let q = Quad::new(
                q.subject.clone(),
                q.predicate.clone(),
                q.object.clone(),
                graph.clone(),
            );
            if self.store.remove(&q)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Atomic: either the graph contains exactly `quads` after the call, or
    /// it is unchanged and an error is returned (spec I5).
    pub fn replace_graph(&self, graph_iri: &str, quads: &[Quad]) -> StoreResult<()> {
        let graph = Self::graph_name(graph_iri)?;
        let owned: Vec<Quad> = quads
            .iter()
            .map(|q| {
                Quad::new(
                    q.subject.clone(),
                    q.predicate.clone(),
                    q.object.clone(),
                    graph.clone(),
                )
            })
            .collect();
        self.store
            .transaction(|mut txn| -> Result<(), store::StorageError> {
                txn.clear_graph(graph.as_ref());
                for q in &owned {
                    txn.insert(q)?;
                }
                Ok(())
            })?;
        info!(graph = graph_iri, quads = owned.len(), "replace_graph");
        Ok(())
    }

    pub fn delete_graph(&self, graph_iri: &str) -> StoreResult<()> {
        let graph = Self::graph_name(graph_iri)?;
        self.store.clear_graph(graph.as_ref())?;
        self.store.remove_named_graph(graph.as_ref())?;
        info!(graph = graph_iri, "delete_graph");
        Ok(())
    }

    /// Execute a read-only SPARQL query. Safety filtering has already
    /// happened by the time a query reaches this method (see
    /// [`crate::sparql::SparqlExecutor`]); this is the raw execution path.
    pub fn query(&self, parsed: Query) -> StoreResult<QueryOutcome> {
        match self.store.query(parsed)? {
            QueryResults::Solutions(iter) => {
                let variables: Vec<String> =
                    iter.variables().iter().map(|v| v.as_str().to_string()).collect();
                let mut solutions = Vec::new();
                let mut truncated = false;
                for sol in iter {
                    if solutions.len() >= self.limits.row_cap {
                        truncated = true;
                        break;
                    }
                    let sol = sol?;
                    let row: Vec<(String, oxigraph::model::Term)> = variables
                        .iter()
                        .filter_map(|v| sol.get(v.as_str()).map(|t| (v.clone(), t.clone())))
                        .collect();
                    solutions.push(row);
                }
                if truncated {
                    warn!(row_cap = self.limits.row_cap, "query results truncated");
                }
                Ok(QueryOutcome::Rows {
                    variables,
                    solutions,
                    truncated,
                })
            }
            QueryResults::Boolean(b) => Ok(QueryOutcome::Boolean(b)),
            QueryResults::Graph(iter) => {
                let mut triples = Vec::new();
                for t in iter {
                    if triples.len() >= self.limits.row_cap {
                        break;
                    }
                    triples.push(t?);
                }
                Ok(QueryOutcome::Graph(triples))
            }
        }
    }

    /// Enumerate named graphs whose IRI begins with `prefix`.
    pub fn iter_graph_iris(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut out = Vec::new();
        for g in self.store.named_graphs() {
            let g = g?;
            if let NamedOrBlankNode::NamedNode(n) = g {
                if n.as_str().starts_with(prefix) {
                    out.push(n.into_string());
                }
            }
        }
        out.sort();
        Ok(out)
    }

    pub fn stats(&self, graph_iri: &str) -> StoreResult<GraphStats> {
        let graph = Self::graph_name(graph_iri)?;
        let graph_ref: GraphNameRef = graph.as_ref();
        let mut quad_count = 0usize;
        let mut approx_bytes = 0usize;
        for q in self.store.quads_for_pattern(None, None, None, Some(graph_ref)) {
            let q = q?;
            approx_bytes += q.subject.to_string().len()
                + q.predicate.to_string().len()
                + q.object.to_string().len();
            quad_count += 1;
        }
        Ok(GraphStats {
            quad_count,
            approx_bytes,
        })
    }

    /// All quads currently in a named graph, as plain triples (graph
    /// component dropped), in insertion-independent sorted order.
    pub fn graph_triples(&self, graph_iri: &str) -> StoreResult<Vec<oxigraph::model::Triple>> {
        let graph = Self::graph_name(graph_iri)?;
        let graph_ref: GraphNameRef = graph.as_ref();
        let mut triples: Vec<oxigraph::model::Triple> = self
            .store
            .quads_for_pattern(None, None, None, Some(graph_ref))
            .map(|q| q.map(|q| q.into()))
            .collect::<Result<_, _>>()?;
        triples.sort_by(|a, b| {
            a.subject
                .to_string()
                .cmp(&b.subject.to_string())
                .then_with(|| a.predicate.to_string().cmp(&b.predicate.to_string()))
                .then_with(|| a.object.to_string().cmp(&b.object.to_string()))
        });
        Ok(triples)
    }

    /// Distinct subjects of implementation quads, for invariant checks.
    pub fn subjects_in_graph(&self, graph_iri: &str) -> StoreResult<HashSet<String>> {
        Ok(self
            .graph_triples(graph_iri)?
            .into_iter()
            .map(|t| t.subject.to_string())
            .collect())
    }
}
