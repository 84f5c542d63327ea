//! Graph builder (spec §4.3): turns one version's fact bag into the quads
//! that populate the version-scoped and cumulative graphs. Idempotent per
//! version — running it twice on the same fact bag produces the same quads.

use std::collections::{BTreeMap, HashMap};

use oxigraph::model::{GraphName, Literal, NamedNode, Quad, Term};

use crate::abc::FunctionSnapshot;
use crate::model::{FactBag, FunctionFact, GitSnapshot, Visibility};
use crate::ontology::*;
use crate::schema;

fn nn(iri: &str) -> NamedNode {
    NamedNode::new_unchecked(iri)
}

fn q(s: NamedNode, p: &str, o: Term) -> Quad {
    Quad::new(s, nn(p), o, GraphName::DefaultGraph)
}

fn lit(s: impl Into<String>) -> Term {
    Term::Literal(Literal::new_simple_literal(s))
}

fn lit_i64(n: i64) -> Term {
    Term::Literal(Literal::from(n))
}

/// Canonical identity for a function: `(module_path, simple_name)` after
/// sanitisation (spec §4.3). A top-level function with no module (the
/// common case for a flat script) keeps the bare name as its canonical
/// identity; a qualified module path is folded in only when present, so two
/// same-named functions in different modules still resolve to distinct
/// stable IRIs as the overload rule in §4.3 requires.
fn canonical_name(module_path: &str, simple_name: &str) -> String {
    if module_path.is_empty() {
        schema::sanitise_component(simple_name)
    } else {
        format!(
            "{}.{}",
            schema::sanitise_component(module_path),
            schema::sanitise_component(simple_name)
        )
    }
}

/// Sort quads by subject, then predicate, then object — all as their
/// lexicographic string form — so dumps compare byte-exactly across runs
/// (spec §4.3 "canonical order").
pub fn canonical_sort(quads: &mut [Quad]) {
    quads.sort_by(|a, b| {
        a.subject
            .to_string()
            .cmp(&b.subject.to_string())
            .then_with(|| a.predicate.to_string().cmp(&b.predicate.to_string()))
            .then_with(|| a.object.to_string().cmp(&b.object.to_string()))
    });
}

/// One canonical function's resolved identity, after collapsing overloads.
struct ResolvedFunction<'a> {
    canonical: String,
    visibility: Visibility,
    /// The winning definition for this version's implementation quads:
    /// ties within a version break by earliest line, mirroring the
    /// cross-version tie-break rule in spec §4.3.
    winner: &'a FunctionFact,
}

fn resolve_functions(functions: &[FunctionFact]) -> Vec<ResolvedFunction<'_>> {
    let mut groups: BTreeMap<String, Vec<&FunctionFact>> = BTreeMap::new();
    for f in functions {
        groups
            .entry(canonical_name(&f.module_path, &f.name))
            .or_default()
            .push(f);
    }
    groups
        .into_iter()
        .map(|(canonical, mut defs)| {
            defs.sort_by_key(|f| f.line_start);
            let winner = defs[0];
            let visibility = defs
                .iter()
                .map(|f| Visibility::from_identifier(&f.name))
                .reduce(Visibility::most_permissive)
                .unwrap_or(Visibility::Public);
            ResolvedFunction {
                canonical,
                visibility,
                winner,
            }
        })
        .collect()
}

/// All quads produced for one `(org, repo, version)` ingestion cycle,
/// grouped by destination graph. The coordinator decides how each group is
/// merged (additive for `stable`, nuclear replace for the rest).
#[derive(Debug, Default)]
pub struct BuiltGraphs {
    pub stable_quads: Vec<Quad>,
    pub stable_visibility: HashMap<String, Visibility>,
    pub implementation_quads: Vec<Quad>,
    pub function_snapshots: Vec<FunctionSnapshot>,
    pub file_quads: Vec<Quad>,
    pub meta_quads: Vec<Quad>,
    pub commit_quads: Vec<Quad>,
    pub developer_quads: Vec<Quad>,
    pub branch_quads: Vec<Quad>,
    pub tag_quads: Vec<Quad>,
}

pub struct GraphBuilder;

impl GraphBuilder {
    pub fn build(org: &str, repo: &str, version: &str, facts: &FactBag) -> BuiltGraphs {
        let mut out = BuiltGraphs::default();

        Self::build_functions(org, repo, version, facts, &mut out);
        Self::build_classes(org, repo, facts, &mut out);
        Self::build_files(org, repo, version, facts, &mut out);
        Self::build_meta(org, repo, version, facts, &mut out);
        Self::build_git(org, repo, &facts.git, &mut out);

        canonical_sort(&mut out.stable_quads);
        canonical_sort(&mut out.implementation_quads);
        canonical_sort(&mut out.file_quads);
        canonical_sort(&mut out.meta_quads);
        canonical_sort(&mut out.commit_quads);
        canonical_sort(&mut out.developer_quads);
        canonical_sort(&mut out.branch_quads);
        canonical_sort(&mut out.tag_quads);

        out
    }

    fn build_functions(
        org: &str,
        repo: &str,
        version: &str,
        facts: &FactBag,
        out: &mut BuiltGraphs,
    ) {
        for resolved in resolve_functions(&facts.functions) {
            let stable_iri = schema::stable_function_iri(org, repo, &resolved.canonical);
            let stable_subject = nn(&stable_iri);

            out.stable_quads
                .push(q(stable_subject.clone(), RDF_TYPE, Term::NamedNode(nn(WOC_FUNCTION))));
            out.stable_quads.push(q(
                stable_subject.clone(),
                WOC_CANONICAL_NAME,
                lit(resolved.winner.name.clone()),
            ));
            out.stable_quads.push(q(
                stable_subject.clone(),
                WOC_MODULE_PATH,
                lit(resolved.winner.module_path.clone()),
            ));
            out.stable_quads.push(q(
                stable_subject.clone(),
                WOC_HAS_VISIBILITY,
                lit(match resolved.visibility {
                    Visibility::Public => "public",
                    Visibility::Protected => "protected",
                }),
            ));
            out.stable_visibility
                .insert(stable_iri.clone(), resolved.visibility);

            let impl_iri = schema::implementation_iri(org, repo, &resolved.canonical, version);
            let impl_subject = nn(&impl_iri);
            let f = resolved.winner;

            out.implementation_quads.push(q(
                impl_subject.clone(),
                RDF_TYPE,
                Term::NamedNode(nn(WOC_IMPLEMENTATION)),
            ));
            out.implementation_quads.push(q(
                impl_subject.clone(),
                WOC_IMPLEMENTS_FUNCTION,
                Term::NamedNode(stable_subject),
            ));
            out.implementation_quads.push(q(
                impl_subject.clone(),
                WOC_IMPLEMENTATION_VERSION,
                lit(version.to_string()),
            ));
            out.implementation_quads.push(q(
                impl_subject.clone(),
                WOC_HAS_SIGNATURE,
                lit(f.signature.clone()),
            ));
            if let Some(doc) = &f.docstring {
                out.implementation_quads.push(q(
                    impl_subject.clone(),
                    WOC_HAS_DOCSTRING,
                    lit(doc.clone()),
                ));
            }
            for decorator in &f.decorators {
                out.implementation_quads.push(q(
                    impl_subject.clone(),
                    WOC_HAS_DECORATOR,
                    lit(decorator.clone()),
                ));
            }
            out.implementation_quads.push(q(
                impl_subject.clone(),
                WOC_IN_FILE,
                lit(f.file_path.clone()),
            ));
            out.implementation_quads.push(q(
                impl_subject.clone(),
                WOC_START_LINE,
                lit_i64(f.line_start as i64),
            ));
            out.implementation_quads.push(q(
                impl_subject,
                WOC_END_LINE,
                lit_i64(f.line_end as i64),
            ));

            out.function_snapshots.push(FunctionSnapshot {
                stable_iri,
                module_path: f.module_path.clone(),
                simple_name: f.name.clone(),
                signature: f.signature.clone(),
                line_start: f.line_start,
                line_end: f.line_end,
            });
        }
    }

    fn build_classes(org: &str, repo: &str, facts: &FactBag, out: &mut BuiltGraphs) {
        for c in &facts.classes {
            let canonical = canonical_name(&c.module_path, &c.name);
            let iri = schema::stable_function_iri(org, repo, &canonical);
            let subject = nn(&iri);
            out.stable_quads
                .push(q(subject.clone(), RDF_TYPE, Term::NamedNode(nn(WOC_CLASS))));
            out.stable_quads.push(q(
                subject.clone(),
                WOC_CANONICAL_NAME,
                lit(c.name.clone()),
            ));
            out.stable_quads.push(q(
                subject.clone(),
                WOC_MODULE_PATH,
                lit(c.module_path.clone()),
            ));
            for base in &c.bases {
                out.stable_quads
                    .push(q(subject.clone(), WOC_HAS_BASE, lit(base.clone())));
            }
        }
    }

    fn build_files(org: &str, repo: &str, version: &str, facts: &FactBag, out: &mut BuiltGraphs) {
        for d in &facts.directories {
            let iri = schema::directory_iri(org, repo, version, &d.path);
            let subject = nn(&iri);
            out.file_quads.push(q(
                subject.clone(),
                RDF_TYPE,
                Term::NamedNode(nn(FILES_DIRECTORY)),
            ));
            out.file_quads
                .push(q(subject, FILES_PATH, lit(d.path.clone())));
        }
        for file in &facts.files {
            let iri = schema::file_iri(org, repo, version, &file.path);
            let subject = nn(&iri);
            let classification = crate::classify::classify_file(&file.path, &file.content);

            out.file_quads
                .push(q(subject.clone(), RDF_TYPE, Term::NamedNode(nn(FILES_FILE))));
            out.file_quads
                .push(q(subject.clone(), FILES_PATH, lit(file.path.clone())));
            out.file_quads.push(q(
                subject.clone(),
                FILES_BYTE_LEN,
                lit_i64(file.byte_len as i64),
            ));
            out.file_quads.push(q(
                subject.clone(),
                FILES_KIND,
                lit(classification.kind.as_str()),
            ));
            out.file_quads.push(q(
                subject.clone(),
                FILES_CATEGORY,
                lit(classification.category.as_str()),
            ));
            out.file_quads.push(q(
                subject.clone(),
                FILES_LINE_COUNT,
                lit_i64(classification.line_count as i64),
            ));
            out.file_quads.push(q(
                subject.clone(),
                FILES_CONTENT_HASH,
                lit(classification.content_hash.clone()),
            ));
            if let Some(preview) = &classification.preview {
                out.file_quads
                    .push(q(subject, FILES_PREVIEW, lit(preview.clone())));
            }
        }
    }

    fn build_meta(org: &str, repo: &str, version: &str, facts: &FactBag, out: &mut BuiltGraphs) {
        let meta_iri = schema::processing_metadata_uri(org, repo, version);
        let subject = nn(&meta_iri);
        out.meta_quads.push(q(
            subject.clone(),
            "http://repolex.org/ontology/files/processedAt",
            lit(chrono::Utc::now().to_rfc3339()),
        ));
        out.meta_quads.push(q(
            subject.clone(),
            "http://repolex.org/ontology/files/functionCount",
            lit_i64(facts.functions.len() as i64),
        ));
        out.meta_quads.push(q(
            subject.clone(),
            "http://repolex.org/ontology/files/classCount",
            lit_i64(facts.classes.len() as i64),
        ));
        out.meta_quads.push(q(
            subject,
            "http://repolex.org/ontology/files/fileCount",
            lit_i64(facts.files.len() as i64),
        ));
    }

    fn build_git(org: &str, repo: &str, git: &GitSnapshot, out: &mut BuiltGraphs) {
        if git.commit_sha.is_empty() {
            return;
        }
        let commit_subject = nn(&schema::commit_iri(org, repo, &git.commit_sha));
        out.commit_quads.push(q(
            commit_subject.clone(),
            RDF_TYPE,
            Term::NamedNode(nn(GIT_COMMIT)),
        ));
        out.commit_quads
            .push(q(commit_subject.clone(), GIT_SHA, lit(git.commit_sha.clone())));
        if let Some(authored_at) = git.authored_at {
            out.commit_quads.push(q(
                commit_subject.clone(),
                GIT_AUTHORED_AT,
                lit(authored_at.to_rfc3339()),
            ));
        }

        let dev_subject = nn(&schema::developer_iri(org, repo, &git.author_email));
        out.commit_quads.push(q(
            commit_subject,
            GIT_AUTHORED_BY,
            Term::NamedNode(dev_subject.clone()),
        ));
        out.developer_quads.push(q(
            dev_subject.clone(),
            RDF_TYPE,
            Term::NamedNode(nn(GIT_DEVELOPER)),
        ));
        out.developer_quads
            .push(q(dev_subject.clone(), GIT_EMAIL, lit(git.author_email.clone())));
        out.developer_quads.push(q(
            dev_subject,
            GIT_DISPLAY_NAME,
            lit(git.author_name.clone()),
        ));

        if let Some(branch) = &git.branch {
            let branch_subject = nn(&schema::branch_iri(org, repo, branch));
            out.branch_quads.push(q(
                branch_subject.clone(),
                RDF_TYPE,
                Term::NamedNode(nn(GIT_BRANCH)),
            ));
            out.branch_quads
                .push(q(branch_subject.clone(), GIT_NAME, lit(branch.clone())));
            out.branch_quads.push(q(
                branch_subject,
                GIT_HEAD_SHA,
                lit(git.commit_sha.clone()),
            ));
        }
        if let Some(tag) = &git.tag {
            let tag_subject = nn(&schema::tag_iri(org, repo, tag));
            out.tag_quads.push(q(
                tag_subject.clone(),
                RDF_TYPE,
                Term::NamedNode(nn(GIT_TAG)),
            ));
            out.tag_quads
                .push(q(tag_subject.clone(), GIT_NAME, lit(tag.clone())));
            out.tag_quads.push(q(
                tag_subject,
                GIT_HEAD_SHA,
                lit(git.commit_sha.clone()),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FunctionFact;

    fn fact_bag_with_foo(signature: &str, line_end: u32) -> FactBag {
        FactBag {
            functions: vec![FunctionFact {
                name: "foo".into(),
                module_path: "".into(),
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
            files: vec![],
            directories: vec![],
            git: GitSnapshot {
                commit_sha: String::new(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn s1_stable_and_implementation_quads() {
        let facts = fact_bag_with_foo("foo(x: int) -> int", 14);
        let built = GraphBuilder::build("acme", "demo", "v0.1.0", &facts);

        let stable_iri = "function:acme/demo/foo";
        assert!(built
            .stable_quads
            .iter()
            .any(|q| q.subject.to_string() == format!("<{stable_iri}>")
                && q.object.to_string().contains("foo")));

        let impl_iri = format!("{stable_iri}#v0.1.0");
        assert!(built.implementation_quads.iter().any(|quad| {
            quad.subject.to_string() == format!("<{impl_iri}>")
                && quad.predicate.as_str() == WOC_HAS_SIGNATURE
                && quad.object.to_string().contains("foo(x: int) -> int")
        }));
    }

    #[test]
    fn canonical_sort_is_stable_across_shuffled_input() {
        let mut facts = fact_bag_with_foo("foo() -> int", 11);
        facts.functions.push(FunctionFact {
            name: "bar".into(),
            ..facts.functions[0].clone()
        });
        let mut a = GraphBuilder::build("acme", "demo", "v1", &facts).stable_quads;
        let mut b = a.clone();
        b.reverse();
        canonical_sort(&mut a);
        canonical_sort(&mut b);
        assert_eq!(
            a.iter().map(|q| q.to_string()).collect::<Vec<_>>(),
            b.iter().map(|q| q.to_string()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn visibility_most_permissive_across_overloads() {
        let mut facts = fact_bag_with_foo("foo() -> int", 11);
        facts.functions[0].name = "_helper".into();
        facts.functions.push(FunctionFact {
            name: "_helper".into(),
            visibility_hint: "_helper".into(),
            line_start: 20,
            line_end: 22,
            ..facts.functions[0].clone()
        });
        let built = GraphBuilder::build("acme", "demo", "v1", &facts);
        let canonical = "_helper";
        let iri = schema::stable_function_iri("acme", "demo", canonical);
        assert_eq!(
            built.stable_visibility.get(&iri).copied(),
            Some(Visibility::Protected)
        );
    }
}
