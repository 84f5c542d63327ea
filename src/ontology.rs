//! Vocabulary IRIs for the `woc:`, `git:`, `evolution:`, and `files:`
//! namespaces used by every emitted quad (spec §4.2, §6.3).
//!
//! These are namespace IRIs, not graph IRIs — distinct from
//! [`crate::schema::ontology_woc_uri`] and friends, which name the *named
//! graph* that holds the class/property definitions for this vocabulary.
//! The two happen to share a prefix (`woc`) by convention, nothing more.

pub const WOC_NS: &str = "http://rdf.webofcode.org/woc/";
pub const GIT_NS: &str = "http://rdf.webofcode.org/git/";
pub const EVOLUTION_NS: &str = "http://rdf.webofcode.org/evolution/";
pub const FILES_NS: &str = "http://rdf.webofcode.org/files/";

macro_rules! term {
    ($name:ident, $ns:expr, $local:expr) => {
        pub const $name: &str = concat!($ns, $local);
    };
}

// woc: classes
term!(WOC_FUNCTION, WOC_NS, "Function");
term!(WOC_CLASS, WOC_NS, "Class");
term!(WOC_IMPLEMENTATION, WOC_NS, "Implementation");

// woc: properties
term!(WOC_CANONICAL_NAME, WOC_NS, "canonicalName");
term!(WOC_HAS_SIGNATURE, WOC_NS, "hasSignature");
term!(WOC_HAS_DOCSTRING, WOC_NS, "hasDocstring");
term!(WOC_HAS_DECORATOR, WOC_NS, "hasDecorator");
term!(WOC_HAS_VISIBILITY, WOC_NS, "hasVisibility");
term!(WOC_MODULE_PATH, WOC_NS, "modulePath");
term!(WOC_IMPLEMENTS_FUNCTION, WOC_NS, "implementsFunction");
term!(WOC_IMPLEMENTATION_VERSION, WOC_NS, "implementationVersion");
term!(WOC_IN_FILE, WOC_NS, "inFile");
term!(WOC_START_LINE, WOC_NS, "startLine");
term!(WOC_END_LINE, WOC_NS, "endLine");
term!(WOC_HAS_BASE, WOC_NS, "hasBase");

// git: classes and properties
term!(GIT_COMMIT, GIT_NS, "Commit");
term!(GIT_DEVELOPER, GIT_NS, "Developer");
term!(GIT_BRANCH, GIT_NS, "Branch");
term!(GIT_TAG, GIT_NS, "Tag");
term!(GIT_SHA, GIT_NS, "sha");
term!(GIT_AUTHORED_BY, GIT_NS, "authoredBy");
term!(GIT_AUTHORED_AT, GIT_NS, "authoredAt");
term!(GIT_MESSAGE, GIT_NS, "message");
term!(GIT_EMAIL, GIT_NS, "email");
term!(GIT_DISPLAY_NAME, GIT_NS, "displayName");
term!(GIT_HEAD_SHA, GIT_NS, "headSha");
term!(GIT_NAME, GIT_NS, "name");
term!(GIT_POINTS_TO_COMMIT, GIT_NS, "pointsToCommit");

// files: classes and properties
term!(FILES_FILE, FILES_NS, "File");
term!(FILES_DIRECTORY, FILES_NS, "Directory");
term!(FILES_PATH, FILES_NS, "path");
term!(FILES_BYTE_LEN, FILES_NS, "byteLen");
term!(FILES_KIND, FILES_NS, "kind");
term!(FILES_CATEGORY, FILES_NS, "category");
term!(FILES_LINE_COUNT, FILES_NS, "lineCount");
term!(FILES_CONTENT_HASH, FILES_NS, "contentHash");
term!(FILES_PREVIEW, FILES_NS, "preview");
term!(FILES_IN_DIRECTORY, FILES_NS, "inDirectory");

// evolution: classes and properties (ABC events + derived stats)
term!(EVOLUTION_ABC_EVENT, EVOLUTION_NS, "AbcEvent");
term!(EVOLUTION_EVENT_KIND, EVOLUTION_NS, "eventKind");
term!(EVOLUTION_AFFECTS_FUNCTION, EVOLUTION_NS, "affectsFunction");
term!(EVOLUTION_FROM_VERSION, EVOLUTION_NS, "fromVersion");
term!(EVOLUTION_TO_VERSION, EVOLUTION_NS, "toVersion");
term!(EVOLUTION_TIMESTAMP, EVOLUTION_NS, "timestamp");
term!(EVOLUTION_RENAMED_TO, EVOLUTION_NS, "renamedTo");
term!(EVOLUTION_CHANGE_COUNT, EVOLUTION_NS, "changeCount");
term!(EVOLUTION_STABILITY_SCORE, EVOLUTION_NS, "stabilityScore");
term!(EVOLUTION_CO_CHANGES_WITH, EVOLUTION_NS, "coChangesWith");

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
pub const OWL_OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
pub const OWL_DATATYPE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";

/// Minimal class/property declarations for the four shared ontology graphs,
/// loaded once per process (spec §3.2, §4.4 step 1). Not a full OWL
/// schema — just enough that `a owl:Class` / `a owl:ObjectProperty` /
/// `a owl:DatatypeProperty` triples exist for every term this crate emits.
pub fn seed_quads(classes: &[&str], object_properties: &[&str], datatype_properties: &[&str]) -> Vec<oxigraph::model::Quad> {
    use oxigraph::model::{GraphName, NamedNode, Quad, Term};
    let mut quads = Vec::new();
    let rdf_type = NamedNode::new_unchecked(RDF_TYPE);
    for c in classes {
        quads.push(Quad::new(
            NamedNode::new_unchecked(*c),
            rdf_type.clone(),
            Term::NamedNode(NamedNode::new_unchecked(OWL_CLASS)),
            GraphName::DefaultGraph,
        ));
    }
    for p in object_properties {
        quads.push(Quad::new(
            NamedNode::new_unchecked(*p),
            rdf_type.clone(),
            Term::NamedNode(NamedNode::new_unchecked(OWL_OBJECT_PROPERTY)),
            GraphName::DefaultGraph,
        ));
    }
    for p in datatype_properties {
        quads.push(Quad::new(
            NamedNode::new_unchecked(*p),
            rdf_type.clone(),
            Term::NamedNode(NamedNode::new_unchecked(OWL_DATATYPE_PROPERTY)),
            GraphName::DefaultGraph,
        ));
    }
    quads
}

pub fn woc_seed() -> Vec<oxigraph::model::Quad> {
    seed_quads(
        &[WOC_FUNCTION, WOC_CLASS, WOC_IMPLEMENTATION],
        &[WOC_IMPLEMENTS_FUNCTION],
        &[
            WOC_CANONICAL_NAME,
            WOC_HAS_SIGNATURE,
            WOC_HAS_DOCSTRING,
            WOC_HAS_DECORATOR,
            WOC_HAS_VISIBILITY,
            WOC_MODULE_PATH,
            WOC_IMPLEMENTATION_VERSION,
            WOC_IN_FILE,
            WOC_START_LINE,
            WOC_END_LINE,
            WOC_HAS_BASE,
        ],
    )
}

pub fn git_seed() -> Vec<oxigraph::model::Quad> {
    seed_quads(
        &[GIT_COMMIT, GIT_DEVELOPER, GIT_BRANCH, GIT_TAG],
        &[GIT_AUTHORED_BY, GIT_POINTS_TO_COMMIT],
        &[
            GIT_SHA,
            GIT_AUTHORED_AT,
            GIT_MESSAGE,
            GIT_EMAIL,
            GIT_DISPLAY_NAME,
            GIT_HEAD_SHA,
            GIT_NAME,
        ],
    )
}

pub fn evolution_seed() -> Vec<oxigraph::model::Quad> {
    seed_quads(
        &[EVOLUTION_ABC_EVENT],
        &[EVOLUTION_AFFECTS_FUNCTION, EVOLUTION_CO_CHANGES_WITH, EVOLUTION_RENAMED_TO],
        &[
            EVOLUTION_EVENT_KIND,
            EVOLUTION_FROM_VERSION,
            EVOLUTION_TO_VERSION,
            EVOLUTION_TIMESTAMP,
            EVOLUTION_CHANGE_COUNT,
            EVOLUTION_STABILITY_SCORE,
        ],
    )
}

pub fn files_seed() -> Vec<oxigraph::model::Quad> {
    seed_quads(
        &[FILES_FILE, FILES_DIRECTORY],
        &[FILES_IN_DIRECTORY],
        &[
            FILES_PATH,
            FILES_BYTE_LEN,
            FILES_KIND,
            FILES_CATEGORY,
            FILES_LINE_COUNT,
            FILES_CONTENT_HASH,
            FILES_PREVIEW,
        ],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbcEventKind {
    Added,
    Removed,
    Modified,
    Renamed,
}

impl AbcEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AbcEventKind::Added => "added",
            AbcEventKind::Removed => "removed",
            AbcEventKind::Modified => "modified",
            AbcEventKind::Renamed => "renamed",
        }
    }
}

impl std::fmt::Display for AbcEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
