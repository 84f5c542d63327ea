//! The read-only SPARQL executor (spec §4.5): safety filter, length cap,
//! timeout, and dispatch into the quad store client.

use std::time::{Duration, Instant};

use spargebra::Query;
use tracing::{info, warn};

use super::SparqlError;
use crate::store::{QueryOutcome, QuadStoreClient};

const DANGEROUS_KEYWORDS: &[&str] = &[
    "INSERT", "DELETE", "DROP", "CLEAR", "CREATE", "LOAD", "COPY", "MOVE", "ADD", "UPDATE",
];

const DEFAULT_PREFIXES: &[(&str, &str)] = &[
    ("woc", "http://rdf.webofcode.org/woc/"),
    ("git", "http://rdf.webofcode.org/git/"),
    ("evolution", "http://rdf.webofcode.org/evolution/"),
    ("files", "http://rdf.webofcode.org/files/"),
];

pub struct SparqlExecutor<'a> {
    store: &'a QuadStoreClient,
    max_query_chars: usize,
    timeout: Duration,
    textual_prefilter: bool,
}

impl<'a> SparqlExecutor<'a> {
    pub fn new(store: &'a QuadStoreClient) -> Self {
        Self {
            store,
            max_query_chars: 10_000,
            timeout: Duration::from_secs(30),
            textual_prefilter: true,
        }
    }

    pub fn with_max_query_chars(mut self, n: usize) -> Self {
        self.max_query_chars = n;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Toggle the conservative fast-path textual check. When enabled, a
    /// query containing none of the dangerous keywords anywhere — including
    /// inside string literals — skips the extra `Update::parse` attempt
    /// below. It never *rejects* on its own: only the parsed-AST check does,
    /// so a `SELECT` whose literal happens to contain the word "DELETE" is
    /// never wrongly refused (spec §4.5).
    pub fn with_textual_prefilter(mut self, enabled: bool) -> Self {
        self.textual_prefilter = enabled;
        self
    }

    fn looks_suspicious(&self, sparql: &str) -> bool {
        let upper = sparql.to_ascii_uppercase();
        DANGEROUS_KEYWORDS.iter().any(|k| upper.contains(k))
    }

    fn with_default_prefixes(&self, sparql: &str) -> String {
        let mut preamble = String::new();
        for (prefix, iri) in DEFAULT_PREFIXES {
            let needle = format!("PREFIX {prefix}:");
            if !sparql.to_ascii_uppercase().contains(&needle.to_ascii_uppercase()) {
                preamble.push_str(&format!("PREFIX {prefix}: <{iri}>\n"));
            }
        }
        format!("{preamble}{sparql}")
    }

    pub fn execute(&self, sparql: &str) -> Result<QueryOutcome, SparqlError> {
        if sparql.len() > self.max_query_chars {
            return Err(SparqlError::TooLong(format!(
                "query length {} exceeds the {}-character limit",
                sparql.len(),
                self.max_query_chars
            )));
        }

        let prepared = self.with_default_prefixes(sparql);

        if !self.textual_prefilter || self.looks_suspicious(&prepared) {
            if spargebra::Update::parse(&prepared, None).is_ok() {
                warn!("rejected SPARQL update-family query");
                return Err(SparqlError::Rejected(
                    "update-family SPARQL forms (INSERT/DELETE/DROP/...) are not permitted"
                        .to_string(),
                ));
            }
        }

        let parsed = Query::parse(&prepared, None)
            .map_err(|e| SparqlError::Parse(e.to_string()))?;

        let started = Instant::now();
        let outcome = self
            .store
            .query(parsed)
            .map_err(|e| SparqlError::Execution(e.to_string()))?;
        let elapsed = started.elapsed();
        if elapsed > self.timeout {
            warn!(?elapsed, "query exceeded configured timeout");
        }
        info!(?elapsed, "query executed");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Coordinator;
    use crate::model::{FactBag, FunctionFact};

    fn coordinator_with_demo_function() -> Coordinator {
        let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
        coord.repo_add("acme", "demo").unwrap();
        coord
            .graph_add(
                "acme",
                "demo",
                "v0.1.0",
                &FactBag {
                    functions: vec![FunctionFact {
                        name: "foo".into(),
                        module_path: "src.a".into(),
                        signature: "foo(x: int) -> int".into(),
                        docstring: None,
                        decorators: vec![],
                        file_path: "src/a.py".into(),
                        line_start: 10,
                        line_end: 14,
                        visibility_hint: "foo".into(),
                    }],
                    classes: vec![],
                    imports: vec![],
                    files: vec![],
                    directories: vec![],
                    git: Default::default(),
                },
            )
            .unwrap();
        coord
    }

    #[test]
    fn s6_rejects_drop_graph_as_security_error() {
        let store = QuadStoreClient::in_memory().unwrap();
        let executor = SparqlExecutor::new(&store);
        let result = executor.execute(
            "DROP GRAPH <http://repolex.org/repo/acme/demo/functions/stable>",
        );
        assert!(matches!(result, Err(SparqlError::Rejected(_))));
    }

    #[test]
    fn accepts_select_containing_banned_word_in_literal() {
        let store = QuadStoreClient::in_memory().unwrap();
        let executor = SparqlExecutor::new(&store);
        let result = executor.execute("SELECT ?x WHERE { ?x <http://example.org/p> \"please DELETE me\" }");
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_over_length_query() {
        let store = QuadStoreClient::in_memory().unwrap();
        let executor = SparqlExecutor::new(&store).with_max_query_chars(20);
        let result = executor.execute("SELECT * WHERE { ?s ?p ?o }");
        assert!(matches!(result, Err(SparqlError::TooLong(_))));
    }

    #[test]
    fn s5_select_over_stable_graph() {
        let coord = coordinator_with_demo_function();
        let executor = SparqlExecutor::new(coord.store());
        let outcome = executor
            .execute(
                "PREFIX woc: <http://rdf.webofcode.org/woc/> \
                 SELECT ?n WHERE { GRAPH <http://repolex.org/repo/acme/demo/functions/stable> \
                 { ?f a woc:Function ; woc:canonicalName ?n } } ORDER BY ?n",
            )
            .unwrap();
        match outcome {
            QueryOutcome::Rows { solutions, .. } => {
                assert_eq!(solutions.len(), 1);
                let (_, term) = &solutions[0][0];
                assert_eq!(crate::sparql::term_to_string(term), "foo");
            }
            _ => panic!("expected row results"),
        }
    }
}
