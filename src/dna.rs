//! Semantic-DNA encoder: the compact binary export for LLM consumption
//! (spec §4.7, §6.4).
//!
//! Grounded on `examples/original_source/repolex/core/export_manager.py`
//! (`_create_semantic_dna` / `_export_msgpack`): string-table deduplication,
//! the `{id, n, s, d, m, t, loc}` function record shape, and the
//! `{total_strings, unique_strings, compression_ratio}` stats all carry
//! over; the wire format is `rmp_serde`'s positional (array) struct
//! encoding rather than Python's `msgpack.packb` map encoding, since the
//! "short names are normative" intent of the spec is about field *names*
//! staying stable across the Rust/Python rewrite, not about preserving the
//! map wire shape.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{RepolexError, RepolexResult};
use crate::ontology::*;
use crate::schema;
use crate::store::QuadStoreClient;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoInfo {
    pub name: String,
    pub version: String,
    pub generated_at: String,
    pub total_functions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionRecord {
    pub id: u32,
    pub n: String,
    pub s: String,
    pub d: u32,
    pub m: String,
    pub t: Vec<String>,
    pub loc: Option<(String, u32, u32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleRecord {
    pub id: u32,
    pub name: String,
    pub path: String,
    pub exports: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternRecord {
    pub name: String,
    pub template: String,
    pub frequency: f64,
    pub context: Vec<String>,
    pub related_functions: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterRecord {
    pub functions: Vec<u32>,
    pub core_concept: String,
    pub typical_workflow: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompressionStats {
    pub total_strings: u32,
    pub unique_strings: u32,
    pub compression_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DnaDocument {
    pub format_version: String,
    pub generator: String,
    pub repo_info: RepoInfo,
    pub functions: Vec<FunctionRecord>,
    pub modules: Vec<ModuleRecord>,
    pub patterns: Vec<PatternRecord>,
    pub semantic_clusters: BTreeMap<String, ClusterRecord>,
    pub string_table: Vec<String>,
    pub compression_stats: CompressionStats,
}

const FORMAT_VERSION: &str = "1.0";
const GENERATOR: &str = "repolex-rs";

struct StringTable {
    entries: Vec<String>,
    index: HashMap<String, u32>,
}

impl StringTable {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(id) = self.index.get(s) {
            return *id;
        }
        let id = self.entries.len() as u32;
        self.entries.push(s.to_string());
        self.index.insert(s.to_string(), id);
        id
    }
}

struct RawFunction {
    stable_iri: String,
    name: String,
    module_path: String,
    visibility: String,
    signature: String,
    docstring: Option<String>,
    decorators: Vec<String>,
    file_path: Option<String>,
    line_start: Option<u32>,
    line_end: Option<u32>,
}

fn literal_value(t: &oxigraph::model::Term) -> Option<String> {
    match t {
        oxigraph::model::Term::Literal(l) => Some(l.value().to_string()),
        _ => None,
    }
}

fn named_node_value(t: &oxigraph::model::Term) -> Option<String> {
    match t {
        oxigraph::model::Term::NamedNode(n) => Some(n.as_str().to_string()),
        _ => None,
    }
}

/// Pull the raw per-function facts needed for one version out of the
/// stable and implementation graphs directly (no SPARQL round-trip: the
/// encoder is a bulk-read path, not an ad hoc query).
fn collect_functions(
    store: &QuadStoreClient,
    org: &str,
    repo: &str,
    version: &str,
) -> RepolexResult<Vec<RawFunction>> {
    let stable_graph = schema::functions_stable_uri(org, repo);
    let impl_graph = schema::functions_implementations_uri(org, repo);

    let stable_triples = store.graph_triples(&stable_graph)?;
    let impl_triples = store.graph_triples(&impl_graph)?;

    let mut name_by_stable: HashMap<String, String> = HashMap::new();
    let mut module_by_stable: HashMap<String, String> = HashMap::new();
    let mut visibility_by_stable: HashMap<String, String> = HashMap::new();
    let mut is_function: std::collections::HashSet<String> = std::collections::HashSet::new();

    for t in &stable_triples {
        let oxigraph::model::Subject::NamedNode(subject) = &t.subject else { continue };
        let iri = subject.as_str().to_string();
        match t.predicate.as_str() {
            p if p == WOC_CANONICAL_NAME => {
                if let Some(v) = literal_value(&t.object) {
                    name_by_stable.insert(iri.clone(), v);
                }
            }
            p if p == WOC_MODULE_PATH => {
                if let Some(v) = literal_value(&t.object) {
                    module_by_stable.insert(iri.clone(), v);
                }
            }
            p if p == WOC_HAS_VISIBILITY => {
                if let Some(v) = literal_value(&t.object) {
                    visibility_by_stable.insert(iri.clone(), v);
                }
            }
            p if p == RDF_TYPE => {
                if named_node_value(&t.object).as_deref() == Some(WOC_FUNCTION) {
                    is_function.insert(iri.clone());
                }
            }
            _ => {}
        }
    }

    let suffix = format!("#{version}");
    #[derive(Default)]
    struct Partial {
        stable_iri: Option<String>,
        signature: Option<String>,
        docstring: Option<String>,
        decorators: Vec<String>,
        file_path: Option<String>,
        line_start: Option<u32>,
        line_end: Option<u32>,
    }
    let mut by_subject: HashMap<String, Partial> = HashMap::new();

    for t in &impl_triples {
        let oxigraph::model::Subject::NamedNode(subject) = &t.subject else { continue };
        if !subject.as_str().ends_with(&suffix) {
            continue;
        }
        let entry = by_subject.entry(subject.as_str().to_string()).or_default();
        match t.predicate.as_str() {
            p if p == WOC_IMPLEMENTS_FUNCTION => entry.stable_iri = named_node_value(&t.object),
            p if p == WOC_HAS_SIGNATURE => entry.signature = literal_value(&t.object),
            p if p == WOC_HAS_DOCSTRING => entry.docstring = literal_value(&t.object),
            p if p == WOC_HAS_DECORATOR => {
                if let Some(v) = literal_value(&t.object) {
                    entry.decorators.push(v);
                }
            }
            p if p == WOC_IN_FILE => entry.file_path = literal_value(&t.object),
            p if p == WOC_START_LINE => {
                entry.line_start = literal_value(&t.object).and_then(|v| v.parse().ok())
            }
            p if p == WOC_END_LINE => {
                entry.line_end = literal_value(&t.object).and_then(|v| v.parse().ok())
            }
            _ => {}
        }
    }

    let mut out = Vec::new();
    for partial in by_subject.into_values() {
        let Some(stable_iri) = partial.stable_iri else { continue };
        if !is_function.contains(&stable_iri) {
            continue;
        }
        let name = name_by_stable.get(&stable_iri).cloned().unwrap_or_default();
        let module_path = module_by_stable.get(&stable_iri).cloned().unwrap_or_default();
        let visibility = visibility_by_stable
            .get(&stable_iri)
            .cloned()
            .unwrap_or_else(|| "public".to_string());
        out.push(RawFunction {
            stable_iri,
            name,
            module_path,
            visibility,
            signature: partial.signature.unwrap_or_default(),
            docstring: partial.docstring,
            decorators: partial.decorators,
            file_path: partial.file_path,
            line_start: partial.line_start,
            line_end: partial.line_end,
        });
    }
    Ok(out)
}

/// Encode `(org, repo, version)` into a [`DnaDocument`] (spec §4.7).
///
/// `is_current_repo` controls the filter policy: `false` (the repository is
/// someone else's dependency) drops any function whose simple name starts
/// with `_`; `true` keeps everything.
pub fn encode(
    store: &QuadStoreClient,
    org: &str,
    repo: &str,
    version: &str,
    is_current_repo: bool,
    generated_at: impl Into<String>,
) -> RepolexResult<DnaDocument> {
    let mut raw = collect_functions(store, org, repo, version)?;
    if !is_current_repo {
        raw.retain(|f| !f.name.starts_with('_'));
    }
    raw.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.stable_iri.cmp(&b.stable_iri)));

    let mut strings = StringTable::new();
    let mut functions = Vec::with_capacity(raw.len());
    let mut module_exports: BTreeMap<String, Vec<u32>> = BTreeMap::new();

    for (i, f) in raw.iter().enumerate() {
        let id = i as u32;
        let doc_id = strings.intern(f.docstring.as_deref().unwrap_or(""));
        let mut tags = vec!["function".to_string(), f.visibility.clone()];
        tags.extend(f.decorators.iter().cloned());
        let loc = f
            .file_path
            .as_ref()
            .map(|path| (path.clone(), f.line_start.unwrap_or(0), f.line_end.unwrap_or(0)));

        functions.push(FunctionRecord {
            id,
            n: f.name.clone(),
            s: f.signature.clone(),
            d: doc_id,
            m: f.module_path.clone(),
            t: tags,
            loc,
        });
        module_exports.entry(f.module_path.clone()).or_default().push(id);
    }

    let modules: Vec<ModuleRecord> = module_exports
        .into_iter()
        .enumerate()
        .map(|(id, (path, exports))| ModuleRecord {
            id: id as u32,
            name: if path.is_empty() {
                "root".to_string()
            } else {
                path.rsplit('.').next().unwrap_or(&path).to_string()
            },
            path,
            exports,
        })
        .collect();

    let decorator_counts: HashMap<String, Vec<u32>> = {
        let mut m: HashMap<String, Vec<u32>> = HashMap::new();
        for (i, f) in raw.iter().enumerate() {
            for d in &f.decorators {
                m.entry(d.clone()).or_default().push(i as u32);
            }
        }
        m
    };
    let total = raw.len().max(1) as f64;
    let mut patterns: Vec<PatternRecord> = decorator_counts
        .into_iter()
        .map(|(decorator, ids)| PatternRecord {
            name: format!("decorated_with_{decorator}"),
            template: format!("@{decorator}\ndef <name>(...): ..."),
            frequency: ids.len() as f64 / total,
            context: vec![decorator],
            related_functions: ids,
        })
        .collect();
    patterns.sort_by(|a, b| a.name.cmp(&b.name));

    let mut semantic_clusters = BTreeMap::new();
    for module in &modules {
        semantic_clusters.insert(
            if module.path.is_empty() {
                "root".to_string()
            } else {
                module.path.clone()
            },
            ClusterRecord {
                functions: module.exports.clone(),
                core_concept: format!("functions defined in module {}", module.path),
                typical_workflow: vec!["import".to_string(), "call".to_string()],
            },
        );
    }

    let total_strings = strings.entries.len() as u32;
    let unique_strings = strings.entries.iter().collect::<std::collections::HashSet<_>>().len() as u32;
    let compression_ratio = if unique_strings == 0 {
        1.0
    } else {
        total_strings as f64 / unique_strings as f64
    };

    Ok(DnaDocument {
        format_version: FORMAT_VERSION.to_string(),
        generator: GENERATOR.to_string(),
        repo_info: RepoInfo {
            name: format!("{org}/{repo}"),
            version: version.to_string(),
            generated_at: generated_at.into(),
            total_functions: functions.len() as u32,
        },
        functions,
        modules,
        patterns,
        semantic_clusters,
        string_table: strings.entries,
        compression_stats: CompressionStats {
            total_strings,
            unique_strings,
            compression_ratio,
        },
    })
}

/// MessagePack-encode a document (spec §4.7's normative wire format).
pub fn to_msgpack(doc: &DnaDocument) -> RepolexResult<Vec<u8>> {
    rmp_serde::to_vec(doc).map_err(|e| RepolexError::export(format!("msgpack encode failed: {e}")))
}

/// Decode a previously-encoded document. `to_msgpack(decode(bytes)) == bytes`
/// byte-for-byte (spec testable property 4).
pub fn from_msgpack(bytes: &[u8]) -> RepolexResult<DnaDocument> {
    rmp_serde::from_slice(bytes).map_err(|e| RepolexError::export(format!("msgpack decode failed: {e}")))
}

/// Conventional export filename (spec §6.4): `<org>~<repo>~<tag>.msgpack`.
pub fn export_filename(org: &str, repo: &str, tag: &str) -> String {
    format!("{org}~{repo}~{tag}.msgpack")
}
