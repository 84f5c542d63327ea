//! Fact-bag types: the parser-agnostic intermediate representation consumed
//! by the graph builder (spec §4.3). Field names and shapes are grounded on
//! `examples/original_source/repolex/parsers/file_analyzer.py` and
//! `simple_ast_parser.py` — the parsers themselves remain out of scope, but
//! the builder needs concrete field names for the facts it consumes.

use serde::{Deserialize, Serialize};

/// Everything extracted from one version (commit/tag/checkout) of a
/// repository, in parser emission order. The builder must not reorder this
/// before canonicalising quad order at emission time (spec §4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactBag {
    pub functions: Vec<FunctionFact>,
    pub classes: Vec<ClassFact>,
    pub imports: Vec<ImportFact>,
    pub files: Vec<FileFact>,
    pub directories: Vec<DirectoryFact>,
    pub git: GitSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionFact {
    pub name: String,
    pub module_path: String,
    pub signature: String,
    pub docstring: Option<String>,
    pub decorators: Vec<String>,
    pub file_path: String,
    pub line_start: u32,
    pub line_end: u32,
    /// Raw identifier as written (e.g. `_helper`, `__init__`, `run`).
    /// The builder, not the parser, decides the resulting visibility.
    pub visibility_hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassFact {
    pub name: String,
    pub module_path: String,
    pub bases: Vec<String>,
    pub docstring: Option<String>,
    pub file_path: String,
    pub line_start: u32,
    pub line_end: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFact {
    pub module_path: String,
    pub imported_name: String,
    pub alias: Option<String>,
    pub file_path: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFact {
    pub path: String,
    pub byte_len: u64,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryFact {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitSnapshot {
    pub commit_sha: String,
    pub author_name: String,
    pub author_email: String,
    pub authored_at: Option<chrono::DateTime<chrono::Utc>>,
    pub tag: Option<String>,
    pub branch: Option<String>,
}

/// The on-disk sidecar tracked per repository (spec §6.1), distinct from the
/// RDF content itself: which releases have been ingested and what HEAD looks
/// like right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub remote_url: String,
    pub current_branch: String,
    pub current_commit: String,
    pub releases: Vec<String>,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

/// Visibility resolved from a raw identifier by the builder's naming policy
/// (spec §4.3): a leading `__name__` dunder is public API surface by
/// convention, a single leading underscore is protected, anything else is
/// public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
}

impl Visibility {
    pub fn from_identifier(name: &str) -> Self {
        if name.starts_with("__") && name.ends_with("__") && name.len() > 4 {
            Visibility::Public
        } else if name.starts_with('_') {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }

    /// Merge two visibility determinations for the same canonical name
    /// across overloads: most-permissive wins (spec §4.3 conflict rule).
    pub fn most_permissive(self, other: Visibility) -> Visibility {
        match (self, other) {
            (Visibility::Public, _) | (_, Visibility::Public) => Visibility::Public,
            _ => Visibility::Protected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_from_identifier() {
        assert_eq!(Visibility::from_identifier("run"), Visibility::Public);
        assert_eq!(Visibility::from_identifier("_helper"), Visibility::Protected);
        assert_eq!(Visibility::from_identifier("__init__"), Visibility::Public);
        assert_eq!(Visibility::from_identifier("_"), Visibility::Protected);
    }

    #[test]
    fn most_permissive_prefers_public() {
        assert_eq!(
            Visibility::Protected.most_permissive(Visibility::Public),
            Visibility::Public
        );
        assert_eq!(
            Visibility::Protected.most_permissive(Visibility::Protected),
            Visibility::Protected
        );
    }
}
