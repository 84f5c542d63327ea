//! Repository store coordinator (spec §4.4): orchestrates add/update/remove
//! of a repository's graphs and enforces the invariants of §3. This is the
//! only place that sequences multiple `replace_graph` calls into one
//! ingestion cycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use tracing::{info, warn};

use crate::abc::{self, AbcEvent, StoredAbcEvent};
use crate::builder::GraphBuilder;
use crate::error::{RepolexError, RepolexResult};
use crate::model::{FactBag, Visibility};
use crate::ontology::WOC_HAS_VISIBILITY;
use crate::schema;
use crate::search::FunctionSearchEngine;
use crate::store::QuadStoreClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Absent,
    PresentNoVersions,
    Present,
}

type RepoKey = (String, String);

/// Serialises coordinator writes per `(org, repo)` while letting writers on
/// different repositories proceed concurrently (spec §5).
pub struct Coordinator {
    store: QuadStoreClient,
    locks: RwLock<HashMap<RepoKey, Arc<Mutex<()>>>>,
    search_cache: FunctionSearchEngine,
}

impl Coordinator {
    pub fn new(store: QuadStoreClient) -> Self {
        Self {
            store,
            locks: RwLock::new(HashMap::new()),
            search_cache: FunctionSearchEngine::default(),
        }
    }

    pub fn store(&self) -> &QuadStoreClient {
        &self.store
    }

    /// The shared search cache (spec §5): every successful write below
    /// invalidates it, so callers can hold onto one instance across
    /// repeated searches without seeing stale results.
    pub fn search_engine(&self) -> &FunctionSearchEngine {
        &self.search_cache
    }

    fn lock_for(&self, org: &str, repo: &str) -> Arc<Mutex<()>> {
        let key = (org.to_string(), repo.to_string());
        if let Some(lock) = self.locks.read().unwrap().get(&key) {
            return lock.clone();
        }
        let mut locks = self.locks.write().unwrap();
        locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn ensure_ontologies_loaded(&self) -> RepolexResult<()> {
        let pairs = [
            (schema::ontology_woc_uri(), crate::ontology::woc_seed()),
            (schema::ontology_git_uri(), crate::ontology::git_seed()),
            (schema::ontology_evolution_uri(), crate::ontology::evolution_seed()),
            (schema::ontology_files_uri(), crate::ontology::files_seed()),
        ];
        for (graph, seed) in pairs {
            let stats = self.store.stats(&graph)?;
            if stats.quad_count == 0 {
                self.store.insert_quads(&graph, &seed)?;
                info!(graph = %graph, "loaded shared ontology");
            }
        }
        Ok(())
    }

    /// Repository state, derived from what graphs currently exist rather
    /// than tracked separately (spec §4.4 state machine).
    pub fn state(&self, org: &str, repo: &str) -> RepolexResult<RepoState> {
        let base = schema::repository_base_uri(org, repo);
        let graphs = self.store.iter_graph_iris(&format!("{base}/"))?;
        if graphs.is_empty() {
            return Ok(RepoState::Absent);
        }
        let has_version = graphs.iter().any(|g| g.contains("/meta/"));
        Ok(if has_version {
            RepoState::Present
        } else {
            RepoState::PresentNoVersions
        })
    }

    /// `ABSENT -> PRESENT_NO_VERSIONS`. Ensures shared ontologies exist;
    /// repo-scoped graphs are created lazily by the first `graph_add`.
    pub fn repo_add(&self, org: &str, repo: &str) -> RepolexResult<()> {
        schema::validate_org_repo_format(org, repo)?;
        let _guard = self.lock_for(org, repo).lock().unwrap();
        self.ensure_ontologies_loaded()?;
        info!(org, repo, "repository added");
        Ok(())
    }

    fn existing_versions(&self, org: &str, repo: &str) -> RepolexResult<Vec<String>> {
        let base = schema::repository_base_uri(org, repo);
        let prefix = format!("{base}/meta/");
        Ok(self
            .store
            .iter_graph_iris(&prefix)?
            .into_iter()
            .map(|g| g.trim_start_matches(&prefix).to_string())
            .collect())
    }

    /// Parse a version tag as semver, tolerating a leading `v`/`V` (`v1.9.0`,
    /// `V2.0.0-rc.1`). `None` if the tag isn't valid semver.
    fn parse_semver(tag: &str) -> Option<semver::Version> {
        semver::Version::parse(tag.trim_start_matches(['v', 'V'])).ok()
    }

    /// Order two version tags by parsed semver when both parse; falls back
    /// to plain string ordering otherwise, so a non-semver tag never panics
    /// or gets silently dropped from consideration.
    fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
        match (Self::parse_semver(a), Self::parse_semver(b)) {
            (Some(va), Some(vb)) => va.cmp(&vb),
            _ => a.cmp(b),
        }
    }

    /// Graph-add(v) / graph-update(v) (spec §4.4). The two only differ in
    /// whether pre-existing `v`-scoped content is expected; both discard any
    /// prior implementation quads for `v` and replace `files/<v>`/`meta/<v>`
    /// wholesale, which is exactly what "update" requires — so one method
    /// implements both.
    pub fn graph_add(&self, org: &str, repo: &str, version: &str, facts: &FactBag) -> RepolexResult<()> {
        schema::validate_org_repo_format(org, repo)?;
        let _guard = self.lock_for(org, repo).lock().unwrap();
        self.ensure_ontologies_loaded()?;

        let uris = schema::all_graph_uris(org, repo, version);
        let prior_versions = self.existing_versions(org, repo)?;

        let built = GraphBuilder::build(org, repo, version, facts);

        // Step 2: stable additions (additive; visibility correction only).
        self.store.insert_quads(&uris.functions_stable, &built.stable_quads)?;
        self.reconcile_visibility(&uris.functions_stable, &built.stable_visibility)?;

        // Step 3: the nuclear step. Preserve other versions' implementation
        // quads, replace this version's wholesale.
        let existing_impl = self.store.graph_triples(&uris.functions_implementations)?;
        let suffix = format!("#{version}");
        let mut combined: Vec<oxigraph::model::Quad> = existing_impl
            .iter()
            .filter(|t| !subject_has_suffix(t, &suffix))
            .map(|t| oxigraph::model::Quad::new(
                t.subject.clone(),
                t.predicate.clone(),
                t.object.clone(),
                oxigraph::model::GraphName::DefaultGraph,
            ))
            .collect();
        combined.extend(built.implementation_quads.clone());
        self.store.replace_graph(&uris.functions_implementations, &combined)?;

        // Step 4: files and meta are wholly version-scoped; nuclear replace.
        self.store.replace_graph(&uris.files_structure, &built.file_quads)?;
        self.store.replace_graph(&uris.processing_metadata, &built.meta_quads)?;

        // Step 5: git intelligence, deduplicated by IRI via insert_quads.
        self.store.insert_quads(&uris.git_commits, &built.commit_quads)?;
        self.store.insert_quads(&uris.git_developers, &built.developer_quads)?;
        self.store.insert_quads(&uris.git_branches, &built.branch_quads)?;
        self.store.insert_quads(&uris.git_tags, &built.tag_quads)?;

        // Step 6: ABC differ against the highest-versioned prior release
        // (semver-aware, not lexicographic — "v1.10.0" must outrank "v1.9.0").
        if let Some(prev_version) = prior_versions
            .iter()
            .filter(|v| *v != version)
            .max_by(|a, b| Self::compare_versions(a, b))
            .cloned()
        {
            let stable_triples = self.store.graph_triples(&uris.functions_stable)?;
            let prev_snapshots =
                abc::snapshots_from_store_triples(&existing_impl, &stable_triples, &prev_version);
            let events = abc::diff(
                &prev_snapshots,
                &built.function_snapshots,
                &prev_version,
                version,
                facts.git.authored_at.unwrap_or_else(Utc::now),
            );
            if !events.is_empty() {
                let quads = abc::event_quads(&uris.abc_events, &events);
                self.store.insert_quads(&uris.abc_events, &quads)?;
                info!(org, repo, version, event_count = events.len(), "abc events appended");
            }
        }

        self.search_cache.invalidate();
        info!(org, repo, version, "graph_add complete");
        Ok(())
    }

    /// Identical contract to `graph_add`, provided as a distinct name per
    /// spec §4.4 so callers can express intent even though both paths
    /// discard-and-replace the version's content identically.
    pub fn graph_update(&self, org: &str, repo: &str, version: &str, facts: &FactBag) -> RepolexResult<()> {
        self.graph_add(org, repo, version, facts)
    }

    fn reconcile_visibility(
        &self,
        stable_graph: &str,
        new: &HashMap<String, Visibility>,
    ) -> RepolexResult<()> {
        let existing = self.store.graph_triples(stable_graph)?;
        for (iri, new_vis) in new {
            let current = existing.iter().find_map(|t| {
                if t.subject.to_string() == format!("<{iri}>") && t.predicate.as_str() == WOC_HAS_VISIBILITY {
                    if let oxigraph::model::Term::Literal(l) = &t.object {
                        return Some((l.value().to_string(), t.clone()));
                    }
                }
                None
            });
            let Some((current_str, current_triple)) = current else {
                continue;
            };
            let current_vis = if current_str == "public" {
                Visibility::Public
            } else {
                Visibility::Protected
            };
            let merged = current_vis.most_permissive(*new_vis);
            if merged != current_vis {
                let subject = current_triple.subject.clone();
                let predicate = current_triple.predicate.clone();
                let old = oxigraph::model::Quad::new(
                    subject.clone(),
                    predicate.clone(),
                    current_triple.object.clone(),
                    oxigraph::model::GraphName::DefaultGraph,
                );
                let new_value = match merged {
                    Visibility::Public => "public",
                    Visibility::Protected => "protected",
                };
                let fresh = oxigraph::model::Quad::new(
                    subject,
                    predicate,
                    oxigraph::model::Term::Literal(oxigraph::model::Literal::new_simple_literal(new_value)),
                    oxigraph::model::GraphName::DefaultGraph,
                );
                self.store.remove_quads(stable_graph, &[old])?;
                self.store.insert_quads(stable_graph, &[fresh])?;
            }
        }
        Ok(())
    }

    /// Graph-remove(v): drop this version's content, retain stable
    /// identities (I1), drop ABC events naming `v`.
    pub fn graph_remove(&self, org: &str, repo: &str, version: &str) -> RepolexResult<()> {
        let _guard = self.lock_for(org, repo).lock().unwrap();
        let uris = schema::all_graph_uris(org, repo, version);

        let existing_impl = self.store.graph_triples(&uris.functions_implementations)?;
        let suffix = format!("#{version}");
        let remaining: Vec<oxigraph::model::Quad> = existing_impl
            .iter()
            .filter(|t| !subject_has_suffix(t, &suffix))
            .map(|t| oxigraph::model::Quad::new(
                t.subject.clone(),
                t.predicate.clone(),
                t.object.clone(),
                oxigraph::model::GraphName::DefaultGraph,
            ))
            .collect();
        self.store.replace_graph(&uris.functions_implementations, &remaining)?;

        self.store.delete_graph(&uris.files_structure)?;
        self.store.delete_graph(&uris.processing_metadata)?;

        let events = self.store.graph_triples(&uris.abc_events)?;
        let to_remove: Vec<oxigraph::model::Quad> = events
            .iter()
            .filter(|t| {
                (t.predicate.as_str() == crate::ontology::EVOLUTION_FROM_VERSION
                    || t.predicate.as_str() == crate::ontology::EVOLUTION_TO_VERSION)
                    && matches!(&t.object, oxigraph::model::Term::Literal(l) if l.value() == version)
            })
            .map(|t| oxigraph::model::Quad::new(
                t.subject.clone(),
                t.predicate.clone(),
                t.object.clone(),
                oxigraph::model::GraphName::DefaultGraph,
            ))
            .collect();
        self.store.remove_quads(&uris.abc_events, &to_remove)?;

        self.search_cache.invalidate();
        info!(org, repo, version, "graph_remove complete");
        Ok(())
    }

    /// Remove(force): delete every graph under `/repo/<org>/<repo>/`.
    pub fn remove(&self, org: &str, repo: &str, force: bool) -> RepolexResult<()> {
        let _guard = self.lock_for(org, repo).lock().unwrap();
        if !force {
            warn!(org, repo, "remove called without force; refusing");
            return Err(RepolexError::validation(
                "repository removal requires force=true",
            ));
        }
        let base = schema::repository_base_uri(org, repo);
        let graphs = self.store.iter_graph_iris(&format!("{base}/"))?;
        for g in graphs {
            self.store.delete_graph(&g)?;
        }
        self.search_cache.invalidate();
        info!(org, repo, "repository removed");
        Ok(())
    }

    pub fn evolution_statistics(&self, org: &str, repo: &str) -> RepolexResult<abc::EvolutionStatistics> {
        let uris = schema::all_graph_uris(org, repo, "_");
        let triples = self.store.graph_triples(&uris.abc_events)?;
        let mut by_subject: HashMap<String, (Option<String>, Option<String>)> = HashMap::new();
        for t in &triples {
            let key = t.subject.to_string();
            let entry = by_subject.entry(key).or_default();
            if t.predicate.as_str() == crate::ontology::EVOLUTION_AFFECTS_FUNCTION {
                if let oxigraph::model::Term::NamedNode(n) = &t.object {
                    entry.0 = Some(n.as_str().to_string());
                }
            }
            if t.predicate.as_str() == crate::ontology::EVOLUTION_TO_VERSION {
                if let oxigraph::model::Term::Literal(l) = &t.object {
                    entry.1 = Some(l.value().to_string());
                }
            }
        }
        let events: Vec<StoredAbcEvent> = by_subject
            .into_values()
            .filter_map(|(stable_iri, to_version)| {
                stable_iri.map(|stable_iri| StoredAbcEvent { stable_iri, to_version })
            })
            .collect();
        Ok(abc::compute_statistics(&events))
    }
}

fn subject_has_suffix(t: &oxigraph::model::Triple, suffix: &str) -> bool {
    matches!(&t.subject, oxigraph::model::Subject::NamedNode(n) if n.as_str().ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileFact, FunctionFact, GitSnapshot};
    use chrono::TimeZone;

    fn demo_facts(signature: &str, line_end: u32) -> FactBag {
        FactBag {
            functions: vec![FunctionFact {
                name: "foo".into(),
                module_path: "src.a".into(),
                signature: signature.into(),
                docstring: None,
                decorators: vec![],
                file_path: "src/a.py".into(),
                line_start: 10,
                line_end,
                visibility_hint: "foo".into(),
            }],
            classes: vec![],
            imports: vec![],
            files: vec![FileFact {
                path: "src/a.py".into(),
                byte_len: 10,
                content: b"def foo(): pass".to_vec(),
            }],
            directories: vec![],
            git: GitSnapshot {
                commit_sha: "abc123".into(),
                author_name: "Dev".into(),
                author_email: "dev@example.com".into(),
                authored_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                tag: Some("v0.1.0".into()),
                branch: Some("main".into()),
            },
        }
    }

    #[test]
    fn s1_add_repo_and_ingest_version() {
        let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
        coord.repo_add("acme", "demo").unwrap();
        coord
            .graph_add("acme", "demo", "v0.1.0", &demo_facts("foo(x: int) -> int", 14))
            .unwrap();

        let uris = schema::all_graph_uris("acme", "demo", "v0.1.0");
        let stable = coord.store().graph_triples(&uris.functions_stable).unwrap();
        assert!(stable
            .iter()
            .any(|t| t.subject.to_string() == "<function:acme/demo/src.a.foo>"));

        let impls = coord.store().graph_triples(&uris.functions_implementations).unwrap();
        assert!(impls
            .iter()
            .any(|t| t.subject.to_string() == "<function:acme/demo/src.a.foo#v0.1.0>"));
    }

    #[test]
    fn s2_ingest_second_version_appends_modified_event() {
        let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
        coord.repo_add("acme", "demo").unwrap();
        coord
            .graph_add("acme", "demo", "v0.1.0", &demo_facts("foo(x: int) -> int", 14))
            .unwrap();
        coord
            .graph_add(
                "acme",
                "demo",
                "v0.2.0",
                &demo_facts("foo(x: int, y: int = 0) -> int", 16),
            )
            .unwrap();

        let uris = schema::all_graph_uris("acme", "demo", "v0.2.0");
        let impls = coord.store().graph_triples(&uris.functions_implementations).unwrap();
        assert!(impls
            .iter()
            .any(|t| t.subject.to_string() == "<function:acme/demo/src.a.foo#v0.1.0>"));
        assert!(impls
            .iter()
            .any(|t| t.subject.to_string() == "<function:acme/demo/src.a.foo#v0.2.0>"));

        let events = coord.store().graph_triples(&uris.abc_events).unwrap();
        assert!(events
            .iter()
            .any(|t| t.predicate.as_str() == crate::ontology::EVOLUTION_EVENT_KIND));
    }

    #[test]
    fn graph_update_leaves_other_versions_untouched() {
        let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
        coord.repo_add("acme", "demo").unwrap();
        coord
            .graph_add("acme", "demo", "v0.1.0", &demo_facts("foo(x: int) -> int", 14))
            .unwrap();
        coord
            .graph_add("acme", "demo", "v0.2.0", &demo_facts("foo(x: int) -> str", 14))
            .unwrap();
        coord
            .graph_update("acme", "demo", "v0.2.0", &demo_facts("foo(x: int) -> bytes", 14))
            .unwrap();

        let uris = schema::all_graph_uris("acme", "demo", "v0.2.0");
        let impls = coord.store().graph_triples(&uris.functions_implementations).unwrap();
        let v1_signature = impls.iter().find(|t| {
            t.subject.to_string() == "<function:acme/demo/src.a.foo#v0.1.0>"
                && t.predicate.as_str() == crate::ontology::WOC_HAS_SIGNATURE
        });
        assert!(v1_signature.is_some());
    }

    #[test]
    fn abc_baseline_picks_highest_semver_not_lexicographic_max() {
        let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
        coord.repo_add("acme", "demo").unwrap();
        coord
            .graph_add("acme", "demo", "v1.9.0", &demo_facts("foo(x: int) -> int", 14))
            .unwrap();
        coord
            .graph_add(
                "acme",
                "demo",
                "v1.10.0",
                &demo_facts("foo(x: int, y: int = 0) -> int", 16),
            )
            .unwrap();
        coord
            .graph_add("acme", "demo", "v2.0.0", &demo_facts("foo(x: str) -> int", 16))
            .unwrap();

        // "v1.9.0" sorts lexicographically after "v1.10.0", so a buggy
        // `.max()` over the raw tag strings would pick it as the baseline
        // for the v2.0.0 diff instead of the true highest prior version.
        let uris = schema::all_graph_uris("acme", "demo", "v2.0.0");
        let events = coord.store().graph_triples(&uris.abc_events).unwrap();
        let from_versions: Vec<&str> = events
            .iter()
            .filter(|t| t.predicate.as_str() == crate::ontology::EVOLUTION_FROM_VERSION)
            .filter_map(|t| match &t.object {
                oxigraph::model::Term::Literal(l) => Some(l.value()),
                _ => None,
            })
            .collect();
        assert!(!from_versions.is_empty());
        assert!(from_versions.iter().all(|v| *v == "v1.10.0"));
    }

    #[test]
    fn remove_without_force_is_rejected() {
        let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
        coord.repo_add("acme", "demo").unwrap();
        assert!(coord.remove("acme", "demo", false).is_err());
    }
}
