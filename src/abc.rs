//! ABC differ and evolution analysis (spec §4.6).
//!
//! The differ compares two version snapshots of `functions/implementations`
//! (already resolved against `functions/stable` for module path and simple
//! name) and emits `added`/`removed`/`modified`/`renamed` events. Evolution
//! statistics are derived views computed on demand from stored events —
//! nothing here is persisted beyond the events themselves.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use oxigraph::model::{GraphName, Literal, NamedNode, Quad, Term};

use crate::ontology::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSnapshot {
    pub stable_iri: String,
    pub module_path: String,
    pub simple_name: String,
    pub signature: String,
    pub line_start: u32,
    pub line_end: u32,
}

#[derive(Debug, Clone)]
pub struct AbcEvent {
    pub kind: AbcEventKind,
    pub stable_iri: String,
    pub from_version: Option<String>,
    pub to_version: Option<String>,
    pub renamed_to: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Compare two snapshots and emit events. `from_version`/`to_version` tag
/// every event with the pair of releases being compared.
pub fn diff(
    prev: &[FunctionSnapshot],
    curr: &[FunctionSnapshot],
    from_version: &str,
    to_version: &str,
    timestamp: DateTime<Utc>,
) -> Vec<AbcEvent> {
    let prev_by_iri: HashMap<&str, &FunctionSnapshot> =
        prev.iter().map(|f| (f.stable_iri.as_str(), f)).collect();
    let curr_by_iri: HashMap<&str, &FunctionSnapshot> =
        curr.iter().map(|f| (f.stable_iri.as_str(), f)).collect();

    let mut events = Vec::new();
    let mut removed: Vec<&FunctionSnapshot> = Vec::new();
    let mut added: Vec<&FunctionSnapshot> = Vec::new();

    for f in prev {
        if let Some(c) = curr_by_iri.get(f.stable_iri.as_str()) {
            if c.signature != f.signature || c.line_start != f.line_start || c.line_end != f.line_end {
                events.push(AbcEvent {
                    kind: AbcEventKind::Modified,
                    stable_iri: f.stable_iri.clone(),
                    from_version: Some(from_version.to_string()),
                    to_version: Some(to_version.to_string()),
                    renamed_to: None,
                    timestamp,
                });
            }
        } else {
            removed.push(f);
        }
    }
    for f in curr {
        if !prev_by_iri.contains_key(f.stable_iri.as_str()) {
            added.push(f);
        }
    }

    removed.sort_by(|a, b| a.simple_name.cmp(&b.simple_name));
    added.sort_by(|a, b| a.simple_name.cmp(&b.simple_name));

    let mut matched_added: HashSet<&str> = HashSet::new();
    let mut renamed_removed: HashSet<&str> = HashSet::new();

    for r in &removed {
        let candidate = added.iter().find(|a| {
            !matched_added.contains(a.stable_iri.as_str())
                && a.module_path == r.module_path
                && a.signature == r.signature
        });
        if let Some(a) = candidate {
            matched_added.insert(a.stable_iri.as_str());
            renamed_removed.insert(r.stable_iri.as_str());
            events.push(AbcEvent {
                kind: AbcEventKind::Renamed,
                stable_iri: r.stable_iri.clone(),
                from_version: Some(from_version.to_string()),
                to_version: Some(to_version.to_string()),
                renamed_to: Some(a.stable_iri.clone()),
                timestamp,
            });
        }
    }

    for r in &removed {
        if !renamed_removed.contains(r.stable_iri.as_str()) {
            events.push(AbcEvent {
                kind: AbcEventKind::Removed,
                stable_iri: r.stable_iri.clone(),
                from_version: Some(from_version.to_string()),
                to_version: Some(to_version.to_string()),
                renamed_to: None,
                timestamp,
            });
        }
    }
    for a in &added {
        if !matched_added.contains(a.stable_iri.as_str()) {
            events.push(AbcEvent {
                kind: AbcEventKind::Added,
                stable_iri: a.stable_iri.clone(),
                from_version: Some(from_version.to_string()),
                to_version: Some(to_version.to_string()),
                renamed_to: None,
                timestamp,
            });
        }
    }

    events
}

/// Render events as quads for the `abc/events` graph. Subject IRIs are
/// deterministic (content-hashed) so re-running the same diff twice never
/// produces duplicate events once inserted via `insert_quads`.
pub fn event_quads(abc_events_graph: &str, events: &[AbcEvent]) -> Vec<Quad> {
    let mut quads = Vec::new();
    for e in events {
        let id = format!(
            "{:x}",
            md5::compute(format!(
                "{}|{}|{:?}|{:?}|{:?}",
                e.stable_iri, e.kind, e.from_version, e.to_version, e.renamed_to
            ))
        );
        let subject = NamedNode::new_unchecked(format!("{abc_events_graph}#{id}"));
        quads.push(Quad::new(
            subject.clone(),
            NamedNode::new_unchecked(RDF_TYPE),
            Term::NamedNode(NamedNode::new_unchecked(EVOLUTION_ABC_EVENT)),
            GraphName::DefaultGraph,
        ));
        quads.push(Quad::new(
            subject.clone(),
            NamedNode::new_unchecked(EVOLUTION_EVENT_KIND),
            Term::Literal(Literal::new_simple_literal(e.kind.as_str())),
            GraphName::DefaultGraph,
        ));
        quads.push(Quad::new(
            subject.clone(),
            NamedNode::new_unchecked(EVOLUTION_AFFECTS_FUNCTION),
            Term::NamedNode(NamedNode::new_unchecked(e.stable_iri.as_str())),
            GraphName::DefaultGraph,
        ));
        if let Some(v) = &e.from_version {
            quads.push(Quad::new(
                subject.clone(),
                NamedNode::new_unchecked(EVOLUTION_FROM_VERSION),
                Term::Literal(Literal::new_simple_literal(v)),
                GraphName::DefaultGraph,
            ));
        }
        if let Some(v) = &e.to_version {
            quads.push(Quad::new(
                subject.clone(),
                NamedNode::new_unchecked(EVOLUTION_TO_VERSION),
                Term::Literal(Literal::new_simple_literal(v)),
                GraphName::DefaultGraph,
            ));
        }
        if let Some(to) = &e.renamed_to {
            quads.push(Quad::new(
                subject.clone(),
                NamedNode::new_unchecked(EVOLUTION_RENAMED_TO),
                Term::NamedNode(NamedNode::new_unchecked(to.as_str())),
                GraphName::DefaultGraph,
            ));
        }
        quads.push(Quad::new(
            subject,
            NamedNode::new_unchecked(EVOLUTION_TIMESTAMP),
            Term::Literal(Literal::new_simple_literal(e.timestamp.to_rfc3339())),
            GraphName::DefaultGraph,
        ));
    }
    quads
}

/// Reconstruct per-version function snapshots from triples already sitting
/// in the store: implementation facts for one version, joined against the
/// (version-independent) stable facts for module path and simple name.
pub fn snapshots_from_store_triples(
    impl_triples: &[oxigraph::model::Triple],
    stable_triples: &[oxigraph::model::Triple],
    version: &str,
) -> Vec<FunctionSnapshot> {
    use oxigraph::model::{Subject, Term};

    let mut module_by_stable: HashMap<String, String> = HashMap::new();
    let mut name_by_stable: HashMap<String, String> = HashMap::new();
    for t in stable_triples {
        let Subject::NamedNode(subject) = &t.subject else { continue };
        let iri = subject.as_str().to_string();
        if t.predicate.as_str() == WOC_MODULE_PATH {
            if let Term::Literal(l) = &t.object {
                module_by_stable.insert(iri.clone(), l.value().to_string());
            }
        }
        if t.predicate.as_str() == WOC_CANONICAL_NAME {
            if let Term::Literal(l) = &t.object {
                name_by_stable.insert(iri, l.value().to_string());
            }
        }
    }

    let suffix = format!("#{version}");
    #[derive(Default)]
    struct Partial {
        stable_iri: Option<String>,
        signature: Option<String>,
        line_start: Option<u32>,
        line_end: Option<u32>,
    }
    let mut by_subject: HashMap<String, Partial> = HashMap::new();

    for t in impl_triples {
        let Subject::NamedNode(subject) = &t.subject else { continue };
        if !subject.as_str().ends_with(&suffix) {
            continue;
        }
        let entry = by_subject.entry(subject.as_str().to_string()).or_default();
        match t.predicate.as_str() {
            p if p == WOC_IMPLEMENTS_FUNCTION => {
                if let Term::NamedNode(n) = &t.object {
                    entry.stable_iri = Some(n.as_str().to_string());
                }
            }
            p if p == WOC_HAS_SIGNATURE => {
                if let Term::Literal(l) = &t.object {
                    entry.signature = Some(l.value().to_string());
                }
            }
            p if p == WOC_START_LINE => {
                if let Term::Literal(l) = &t.object {
                    entry.line_start = l.value().parse().ok();
                }
            }
            p if p == WOC_END_LINE => {
                if let Term::Literal(l) = &t.object {
                    entry.line_end = l.value().parse().ok();
                }
            }
            _ => {}
        }
    }

    by_subject
        .into_values()
        .filter_map(|p| {
            let stable_iri = p.stable_iri?;
            let module_path = module_by_stable.get(&stable_iri).cloned().unwrap_or_default();
            let simple_name = name_by_stable.get(&stable_iri).cloned().unwrap_or_default();
            Some(FunctionSnapshot {
                stable_iri,
                module_path,
                simple_name,
                signature: p.signature.unwrap_or_default(),
                line_start: p.line_start.unwrap_or(0),
                line_end: p.line_end.unwrap_or(0),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FunctionStats {
    pub change_count: usize,
    pub stability_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct EvolutionStatistics {
    pub per_function: HashMap<String, FunctionStats>,
    /// Unordered pairs of stable IRIs that changed in the same tag bucket.
    pub co_change: Vec<(String, String)>,
}

/// A stored event read back from `abc/events`, used to compute statistics.
#[derive(Debug, Clone)]
pub struct StoredAbcEvent {
    pub stable_iri: String,
    pub to_version: Option<String>,
}

/// `change_count` per function, `stability_score = 1/(1+change_count)`, and
/// `co_change` pairs bucketed by `to_version` (one tag = one bucket), all
/// computed on demand (spec §4.6).
pub fn compute_statistics(events: &[StoredAbcEvent]) -> EvolutionStatistics {
    let mut per_function: HashMap<String, usize> = HashMap::new();
    let mut buckets: HashMap<String, Vec<String>> = HashMap::new();

    for e in events {
        *per_function.entry(e.stable_iri.clone()).or_insert(0) += 1;
        if let Some(v) = &e.to_version {
            buckets.entry(v.clone()).or_default().push(e.stable_iri.clone());
        }
    }

    let mut co_change = Vec::new();
    for members in buckets.values() {
        let mut uniq: Vec<&String> = members.iter().collect::<HashSet<_>>().into_iter().collect();
        uniq.sort();
        for i in 0..uniq.len() {
            for j in (i + 1)..uniq.len() {
                co_change.push((uniq[i].clone(), uniq[j].clone()));
            }
        }
    }

    EvolutionStatistics {
        per_function: per_function
            .into_iter()
            .map(|(iri, change_count)| {
                (
                    iri,
                    FunctionStats {
                        change_count,
                        stability_score: 1.0 / (1.0 + change_count as f64),
                    },
                )
            })
            .collect(),
        co_change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snap(iri: &str, module: &str, name: &str, sig: &str, start: u32, end: u32) -> FunctionSnapshot {
        FunctionSnapshot {
            stable_iri: iri.into(),
            module_path: module.into(),
            simple_name: name.into(),
            signature: sig.into(),
            line_start: start,
            line_end: end,
        }
    }

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn s2_modified_event_on_signature_change() {
        let prev = vec![snap("function:acme/demo/foo", "src.a", "foo", "foo(x: int) -> int", 10, 14)];
        let curr = vec![snap(
            "function:acme/demo/foo",
            "src.a",
            "foo",
            "foo(x: int, y: int = 0) -> int",
            10,
            16,
        )];
        let events = diff(&prev, &curr, "v0.1.0", "v0.2.0", ts());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AbcEventKind::Modified);
        assert_eq!(events[0].from_version.as_deref(), Some("v0.1.0"));
        assert_eq!(events[0].to_version.as_deref(), Some("v0.2.0"));
    }

    #[test]
    fn rename_merges_removed_and_added() {
        let prev = vec![snap("function:acme/demo/old", "src.a", "old", "old() -> int", 1, 2)];
        let curr = vec![snap("function:acme/demo/new", "src.a", "new", "old() -> int", 1, 2)];
        let events = diff(&prev, &curr, "v1", "v2", ts());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AbcEventKind::Renamed);
        assert_eq!(events[0].renamed_to.as_deref(), Some("function:acme/demo/new"));
    }

    #[test]
    fn added_and_removed_when_no_signature_match() {
        let prev = vec![snap("function:acme/demo/gone", "src.a", "gone", "gone() -> int", 1, 2)];
        let curr = vec![snap("function:acme/demo/fresh", "src.b", "fresh", "fresh() -> int", 1, 2)];
        let events = diff(&prev, &curr, "v1", "v2", ts());
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.kind == AbcEventKind::Added));
        assert!(events.iter().any(|e| e.kind == AbcEventKind::Removed));
    }

    #[test]
    fn stability_score_decreases_with_changes() {
        let events = vec![
            StoredAbcEvent {
                stable_iri: "function:acme/demo/foo".into(),
                to_version: Some("v2".into()),
            },
            StoredAbcEvent {
                stable_iri: "function:acme/demo/foo".into(),
                to_version: Some("v3".into()),
            },
        ];
        let stats = compute_statistics(&events);
        let foo = stats.per_function.get("function:acme/demo/foo").unwrap();
        assert_eq!(foo.change_count, 2);
        assert!((foo.stability_score - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn co_change_pairs_bucket_by_version() {
        let events = vec![
            StoredAbcEvent {
                stable_iri: "function:acme/demo/a".into(),
                to_version: Some("v2".into()),
            },
            StoredAbcEvent {
                stable_iri: "function:acme/demo/b".into(),
                to_version: Some("v2".into()),
            },
        ];
        let stats = compute_statistics(&events);
        assert_eq!(stats.co_change.len(), 1);
    }
}
