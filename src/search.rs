//! Natural-language function search (spec §4.5).
//!
//! Grounded on `examples/original_source/repolex/queries/function_search.py`
//! (`FunctionSearchEngine`): synonym expansion, six-class intent detection,
//! and a capped LRU result cache carry over directly; the scoring formula
//! itself follows spec §4.5 exactly rather than the simpler name/docstring
//! weighting the original used, since the spec is normative where the two
//! disagree.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use regex::Regex;
use tracing::debug;

use crate::error::RepolexResult;
use crate::sparql::SparqlExecutor;
use crate::store::{QuadStoreClient, QueryOutcome};

/// One of the six intent classes a query (or a candidate function) can
/// express (spec §4.5).
const INTENTS: [&str; 6] = ["create", "read", "update", "delete", "process", "analyze"];

fn synonym_table() -> &'static HashMap<&'static str, &'static [&'static str]> {
    use std::sync::OnceLock;
    static TABLE: OnceLock<HashMap<&'static str, &'static [&'static str]>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("create", &["make", "build", "new", "add", "generate", "construct"]);
        m.insert("read", &["get", "fetch", "retrieve", "find"]);
        m.insert("update", &["modify", "change", "edit", "set"]);
        m.insert("delete", &["remove", "drop", "clear", "destroy"]);
        m
    })
}

fn technical_nouns() -> &'static HashSet<&'static str> {
    use std::sync::OnceLock;
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        ["table", "image", "video", "file", "data", "json", "http", "ml"]
            .into_iter()
            .collect()
    })
}

fn tokenize(text: &str) -> Vec<String> {
    static WORD_RE_SRC: &str = r"[A-Za-z0-9_]+";
    let re = Regex::new(WORD_RE_SRC).unwrap();
    re.find_iter(&text.to_ascii_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Expand a token set against the synonym table in both directions: a
/// canonical word pulls in its synonyms, and a synonym pulls in its
/// canonical word.
fn expand_synonyms(tokens: &HashSet<String>) -> HashSet<String> {
    let table = synonym_table();
    let mut expanded = tokens.clone();
    for token in tokens {
        if let Some(syns) = table.get(token.as_str()) {
            expanded.extend(syns.iter().map(|s| s.to_string()));
        }
        for (canon, syns) in table {
            if syns.contains(&token.as_str()) {
                expanded.insert(canon.to_string());
            }
        }
    }
    expanded
}

/// A six-slot intent vector, normalised to sum to 1.0 (or all-zero when no
/// intent keyword fired).
fn intent_vector(tokens: &HashSet<String>) -> [f64; 6] {
    let mut raw = [0.0f64; 6];
    let expanded = expand_synonyms(tokens);
    for (i, intent) in INTENTS.iter().enumerate() {
        if expanded.contains(*intent) {
            raw[i] += 1.0;
        }
    }
    let total: f64 = raw.iter().sum();
    if total > 0.0 {
        for v in &mut raw {
            *v /= total;
        }
    }
    raw
}

fn technical_tokens(tokens: &HashSet<String>) -> HashSet<String> {
    let nouns = technical_nouns();
    tokens
        .iter()
        .filter(|t| nouns.contains(t.as_str()))
        .cloned()
        .collect()
}

/// Longest-common-subsequence length via classic O(n*m) DP, used for the
/// character-level similarity term of `name_similarity` (spec §4.5).
fn lcs_len(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[a.len()][b.len()]
}

fn name_similarity(query: &str, name: &str) -> f64 {
    let query_lower = query.to_ascii_lowercase();
    let name_lower = name.to_ascii_lowercase();

    let mut best = 0.0f64;
    if name_lower.contains(&query_lower) || query_lower.contains(&name_lower) {
        best = 1.0f64.max(best);
    }
    let lcs = lcs_len(&query_lower, &name_lower) as f64;
    let denom = query_lower.chars().count().max(name_lower.chars().count()).max(1) as f64;
    best = best.max(lcs / denom);
    for token in tokenize(&query_lower) {
        if token.chars().count() >= 4 && name_lower.contains(&token) {
            best = best.max(0.8);
        }
    }
    best.min(1.0)
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        inter / union
    }
}

fn docstring_similarity(query_tokens: &HashSet<String>, doc_tokens: &HashSet<String>) -> f64 {
    let base = jaccard(query_tokens, doc_tokens);
    let extra_matches = query_tokens.intersection(doc_tokens).count().saturating_sub(1);
    (base + 0.02 * extra_matches as f64).min(0.5)
}

/// A single candidate returned by [`search_functions`], ranked descending
/// by `relevance_score` with ties broken by ascending `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionMatch {
    pub stable_iri: String,
    pub name: String,
    pub module_path: String,
    pub signature: String,
    pub docstring: Option<String>,
    pub relevance_score: f64,
}

const MIN_RELEVANCE: f64 = 0.1;

fn build_sparql(org: &str, repo: &str, release_filter: Option<&str>) -> String {
    let stable_graph = crate::schema::functions_stable_uri(org, repo);
    let impl_graph = crate::schema::functions_implementations_uri(org, repo);
    let version_filter = release_filter
        .map(|v| format!("    FILTER(?version = \"{v}\")\n"))
        .unwrap_or_default();
    format!(
        "PREFIX woc: <http://rdf.webofcode.org/woc/>\n\
         SELECT ?stable ?name ?module ?signature ?docstring WHERE {{\n  \
         GRAPH <{impl_graph}> {{\n    \
         ?impl woc:implementsFunction ?stable ;\n          \
         woc:hasSignature ?signature ;\n          \
         woc:implementationVersion ?version .\n    \
         OPTIONAL {{ ?impl woc:hasDocstring ?docstring }}\n{version_filter}  }}\n  \
         GRAPH <{stable_graph}> {{\n    \
         ?stable woc:canonicalName ?name ;\n            \
         woc:modulePath ?module .\n  }}\n}}"
    )
}

/// Cache of prior search results, capped at 50 entries per spec §5, keyed
/// by the full filter+query tuple so distinct scopes never collide.
pub struct FunctionSearchEngine {
    cache: Mutex<lru::LruCache<String, Vec<FunctionMatch>>>,
}

impl Default for FunctionSearchEngine {
    fn default() -> Self {
        Self::new(50)
    }
}

impl FunctionSearchEngine {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(lru::LruCache::new(
                std::num::NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
        }
    }

    /// Drop every cached result. Called after any successful coordinator
    /// write, since a mutation can change candidate scores (spec §5).
    pub fn invalidate(&self) {
        self.cache.lock().unwrap().clear();
    }

    pub fn search(
        &self,
        store: &QuadStoreClient,
        org: &str,
        repo: &str,
        query: &str,
        release_filter: Option<&str>,
        _category_filter: Option<&str>,
        max_results: usize,
    ) -> RepolexResult<Vec<FunctionMatch>> {
        let cache_key = format!("{org}/{repo}|{query}|{release_filter:?}");
        if let Some(hit) = self.cache.lock().unwrap().get(&cache_key) {
            debug!(query, "search cache hit");
            return Ok(hit.clone());
        }

        let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();
        let query_intent = intent_vector(&query_tokens);
        let query_tech = technical_tokens(&query_tokens);

        let sparql = build_sparql(org, repo, release_filter);
        let executor = SparqlExecutor::new(store);
        let outcome = executor.execute(&sparql)?;

        let mut matches = Vec::new();
        if let QueryOutcome::Rows { solutions, .. } = outcome {
            for row in solutions {
                let get = |var: &str| -> Option<String> {
                    row.iter()
                        .find(|(v, _)| v == var)
                        .map(|(_, t)| crate::sparql::term_to_string(t))
                };
                let Some(stable_iri) = get("stable") else { continue };
                let Some(name) = get("name") else { continue };
                let module_path = get("module").unwrap_or_default();
                let signature = get("signature").unwrap_or_default();
                let docstring = get("docstring");

                let name_tokens: HashSet<String> = tokenize(&name).into_iter().collect();
                let name_sim = name_similarity(query, &name);

                let doc_tokens: HashSet<String> = docstring
                    .as_deref()
                    .map(|d| tokenize(d).into_iter().collect())
                    .unwrap_or_default();
                let doc_sim = docstring_similarity(&query_tokens, &doc_tokens);

                let haystack_tokens: HashSet<String> =
                    name_tokens.union(&doc_tokens).cloned().collect();
                let fn_intent = intent_vector(&haystack_tokens);
                let intent_match: f64 = query_intent
                    .iter()
                    .zip(fn_intent.iter())
                    .map(|(a, b)| a * b)
                    .sum();

                let technical_terms = if query_tech.is_empty() {
                    0.0
                } else {
                    query_tech.iter().filter(|t| haystack_tokens.contains(*t)).count() as f64
                        / query_tech.len() as f64
                };

                let exact_keyword_matches = query_tokens.intersection(&name_tokens).count();
                let bonus = (0.1 * exact_keyword_matches as f64).min(0.2);

                let score = 0.40 * name_sim
                    + 0.30 * doc_sim
                    + 0.20 * intent_match
                    + 0.10 * technical_terms
                    + bonus;

                if score >= MIN_RELEVANCE {
                    matches.push(FunctionMatch {
                        stable_iri,
                        name,
                        module_path,
                        signature,
                        docstring,
                        relevance_score: score,
                    });
                }
            }
        }

        matches.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        matches.truncate(max_results);

        self.cache.lock().unwrap().put(cache_key, matches.clone());
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Coordinator;
    use crate::model::{FactBag, FunctionFact};

    fn coordinator_with_functions() -> Coordinator {
        let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
        coord.repo_add("acme", "demo").unwrap();
        coord
            .graph_add(
                "acme",
                "demo",
                "v1",
                &FactBag {
                    functions: vec![
                        FunctionFact {
                            name: "create_table".into(),
                            module_path: "db".into(),
                            signature: "create_table(name: str)".into(),
                            docstring: Some("Create a new table in the database".into()),
                            decorators: vec![],
                            file_path: "db.py".into(),
                            line_start: 1,
                            line_end: 5,
                            visibility_hint: "create_table".into(),
                        },
                        FunctionFact {
                            name: "resize_image".into(),
                            module_path: "img".into(),
                            signature: "resize_image(path: str)".into(),
                            docstring: Some("Resize an image file".into()),
                            decorators: vec![],
                            file_path: "img.py".into(),
                            line_start: 1,
                            line_end: 5,
                            visibility_hint: "resize_image".into(),
                        },
                    ],
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
    fn name_similarity_exact_substring_is_one() {
        assert_eq!(name_similarity("create table", "create_table"), 1.0);
    }

    #[test]
    fn search_ranks_create_table_over_image_resize() {
        let coord = coordinator_with_functions();
        let engine = FunctionSearchEngine::default();
        let results = engine
            .search(coord.store(), "acme", "demo", "create table", None, None, 10)
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].name, "create_table");
    }

    #[test]
    fn search_is_deterministic_across_repeated_runs() {
        let coord = coordinator_with_functions();
        let engine = FunctionSearchEngine::default();
        let first = engine
            .search(coord.store(), "acme", "demo", "image", None, None, 10)
            .unwrap();
        let second = engine
            .search(coord.store(), "acme", "demo", "image", None, None, 10)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn low_relevance_candidates_are_discarded() {
        let coord = coordinator_with_functions();
        let engine = FunctionSearchEngine::default();
        let results = engine
            .search(coord.store(), "acme", "demo", "zzz_no_match_zzz", None, None, 10)
            .unwrap();
        assert!(results.is_empty());
    }

}
