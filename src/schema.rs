//! Graph schema — a pure function from `(org, repo, version)` to the fixed
//! set of named-graph IRIs, plus stable/implementation function IRIs and
//! on-demand GitHub links.
//!
//! Grounded on `examples/original_source/repolex/storage/graph_schemas.py`
//! (`GraphSchemas`), adapted to Rust idioms: no state, everything behind
//! free functions and `NamedNode`-returning constructors so callers never
//! hand-build an IRI string themselves (spec invariant I6).

use std::fmt;

use thiserror::Error;

pub const BASE_URI: &str = "http://repolex.org";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitiserError {
    #[error("org/repo component must not be empty")]
    Empty,
}

/// Sanitise an arbitrary string into a safe IRI path component (spec §4.2).
///
/// 1. Replace each of `[ ] < > " ' { } | \ ? # & % + = <whitespace>` with `_`.
/// 2. Percent-encode any remaining characters outside `A-Za-z0-9-_.~`.
/// 3. Empty input becomes `_`.
pub fn sanitise_component(input: &str) -> String {
    if input.is_empty() {
        return "_".to_string();
    }
    const REPLACE: &[char] = &[
        '[', ']', '<', '>', '"', '\'', '{', '}', '|', '\\', '?', '#', '&', '%', '+', '=',
    ];
    let replaced: String = input
        .chars()
        .map(|c| {
            if REPLACE.contains(&c) || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let encoded = percent_encoding::utf8_percent_encode(&replaced, &IRI_UNRESERVED_COMPLEMENT)
        .to_string();
    if encoded.is_empty() {
        "_".to_string()
    } else {
        encoded
    }
}

const IRI_UNRESERVED_COMPLEMENT: percent_encoding::AsciiSet = percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Re-sanitising sanitised output is a no-op (spec testable property 6).
pub fn is_sanitised(s: &str) -> bool {
    sanitise_component(s) == s
}

/// The full, normative set of named graphs for one `(org, repo, version)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphUriSet {
    pub ontology_woc: String,
    pub ontology_git: String,
    pub ontology_evolution: String,
    pub ontology_files: String,

    pub functions_stable: String,
    pub functions_implementations: String,

    pub files_structure: String,

    pub git_commits: String,
    pub git_developers: String,
    pub git_branches: String,
    pub git_tags: String,

    pub abc_events: String,

    pub evolution_analysis: String,
    pub evolution_statistics: String,
    pub evolution_patterns: String,

    pub processing_metadata: String,
}

pub fn ontology_woc_uri() -> String {
    format!("{BASE_URI}/ontology/woc")
}
pub fn ontology_git_uri() -> String {
    format!("{BASE_URI}/ontology/git")
}
pub fn ontology_evolution_uri() -> String {
    format!("{BASE_URI}/ontology/evolution")
}
pub fn ontology_files_uri() -> String {
    format!("{BASE_URI}/ontology/files")
}

pub fn repository_base_uri(org: &str, repo: &str) -> String {
    format!(
        "{BASE_URI}/repo/{}/{}",
        sanitise_component(org),
        sanitise_component(repo)
    )
}

pub fn functions_stable_uri(org: &str, repo: &str) -> String {
    format!("{}/functions/stable", repository_base_uri(org, repo))
}

pub fn functions_implementations_uri(org: &str, repo: &str) -> String {
    format!(
        "{}/functions/implementations",
        repository_base_uri(org, repo)
    )
}

pub fn files_structure_uri(org: &str, repo: &str, version: &str) -> String {
    format!(
        "{}/files/{}",
        repository_base_uri(org, repo),
        sanitise_component(version)
    )
}

pub fn processing_metadata_uri(org: &str, repo: &str, version: &str) -> String {
    format!(
        "{}/meta/{}",
        repository_base_uri(org, repo),
        sanitise_component(version)
    )
}

pub fn git_commits_uri(org: &str, repo: &str) -> String {
    format!("{}/git/commits", repository_base_uri(org, repo))
}
pub fn git_developers_uri(org: &str, repo: &str) -> String {
    format!("{}/git/developers", repository_base_uri(org, repo))
}
pub fn git_branches_uri(org: &str, repo: &str) -> String {
    format!("{}/git/branches", repository_base_uri(org, repo))
}
pub fn git_tags_uri(org: &str, repo: &str) -> String {
    format!("{}/git/tags", repository_base_uri(org, repo))
}

pub fn abc_events_uri(org: &str, repo: &str) -> String {
    format!("{}/abc/events", repository_base_uri(org, repo))
}

pub fn evolution_analysis_uri(org: &str, repo: &str) -> String {
    format!("{}/evolution/analysis", repository_base_uri(org, repo))
}
pub fn evolution_statistics_uri(org: &str, repo: &str) -> String {
    format!("{}/evolution/statistics", repository_base_uri(org, repo))
}
pub fn evolution_patterns_uri(org: &str, repo: &str) -> String {
    format!("{}/evolution/patterns", repository_base_uri(org, repo))
}

pub fn all_graph_uris(org: &str, repo: &str, version: &str) -> GraphUriSet {
    GraphUriSet {
        ontology_woc: ontology_woc_uri(),
        ontology_git: ontology_git_uri(),
        ontology_evolution: ontology_evolution_uri(),
        ontology_files: ontology_files_uri(),
        functions_stable: functions_stable_uri(org, repo),
        functions_implementations: functions_implementations_uri(org, repo),
        files_structure: files_structure_uri(org, repo, version),
        git_commits: git_commits_uri(org, repo),
        git_developers: git_developers_uri(org, repo),
        git_branches: git_branches_uri(org, repo),
        git_tags: git_tags_uri(org, repo),
        abc_events: abc_events_uri(org, repo),
        evolution_analysis: evolution_analysis_uri(org, repo),
        evolution_statistics: evolution_statistics_uri(org, repo),
        evolution_patterns: evolution_patterns_uri(org, repo),
        processing_metadata: processing_metadata_uri(org, repo, version),
    }
}

/// A stable function's permanent identity IRI, `function:<org>/<repo>/<name>`.
///
/// This deliberately does *not* use the `http://repolex.org` base: the
/// leading `function:` scheme marks it as never participating in the
/// `/repo/<org>/<repo>/...` graph-IRI hierarchy, so a stable-function
/// subject can never be mistaken for a graph name.
pub fn stable_function_iri(org: &str, repo: &str, canonical_name: &str) -> String {
    format!(
        "function:{}/{}/{}",
        sanitise_component(org),
        sanitise_component(repo),
        sanitise_component(canonical_name)
    )
}

/// A version-scoped implementation IRI: `<stable-IRI>#<version>`.
///
/// The `#<version>` suffix is the *sole* discriminator between a stable
/// identity and one of its implementations (spec §9, redesign note): both
/// share the same path, so nothing about the IRI shape itself may be used
/// to distinguish them other than this fragment.
pub fn implementation_iri(org: &str, repo: &str, canonical_name: &str, version: &str) -> String {
    format!(
        "{}#{}",
        stable_function_iri(org, repo, canonical_name),
        sanitise_component(version)
    )
}

pub fn commit_iri(org: &str, repo: &str, sha: &str) -> String {
    format!("{}/commit/{}", repository_base_uri(org, repo), sha)
}

pub fn developer_iri(org: &str, repo: &str, email: &str) -> String {
    let safe_email = email.replace('@', "_at_").replace('.', "_");
    format!(
        "{}/developer/{}",
        repository_base_uri(org, repo),
        sanitise_component(&safe_email)
    )
}

pub fn file_iri(org: &str, repo: &str, version: &str, file_path: &str) -> String {
    let safe_path = sanitise_component(&file_path.replace('/', "_"));
    format!(
        "{}/file/{}/{}",
        repository_base_uri(org, repo),
        sanitise_component(version),
        safe_path
    )
}

pub fn directory_iri(org: &str, repo: &str, version: &str, dir_path: &str) -> String {
    let safe_path = sanitise_component(&dir_path.replace('/', "_"));
    format!(
        "{}/dir/{}/{}",
        repository_base_uri(org, repo),
        sanitise_component(version),
        safe_path
    )
}

pub fn branch_iri(org: &str, repo: &str, name: &str) -> String {
    format!(
        "{}/branch/{}",
        repository_base_uri(org, repo),
        sanitise_component(name)
    )
}

pub fn tag_iri(org: &str, repo: &str, name: &str) -> String {
    format!(
        "{}/tag/{}",
        repository_base_uri(org, repo),
        sanitise_component(name)
    )
}

/// Generate a GitHub source link on demand. Never stored (spec §4.2).
pub fn github_link(
    org: &str,
    repo: &str,
    version: &str,
    file_path: &str,
    start_line: Option<u32>,
    end_line: Option<u32>,
) -> String {
    let base = format!("https://github.com/{org}/{repo}/blob/{version}/{file_path}");
    match (start_line, end_line) {
        (Some(s), Some(e)) => format!("{base}#L{s}-L{e}"),
        (Some(s), None) => format!("{base}#L{s}"),
        _ => base,
    }
}

/// Validate `org`/`repo` format: non-empty, simple identifier characters.
pub fn validate_org_repo_format(org: &str, repo: &str) -> Result<(), SanitiserError> {
    if org.is_empty() || repo.is_empty() {
        return Err(SanitiserError::Empty);
    }
    Ok(())
}

impl fmt::Display for GraphUriSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stable={} impl={} files={}",
            self.functions_stable, self.functions_implementations, self.files_structure
        )
    }
}
