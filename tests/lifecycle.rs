//! End-to-end repository lifecycle scenarios (spec §8): add, ingest two
//! versions, query, export, remove. Each test drives the crate only
//! through its public API (`Coordinator`, `SparqlExecutor`, `dna`,
//! `search`), the same surface a collaborator outside this crate would use.

use chrono::{TimeZone, Utc};
use repolex::model::{FactBag, FileFact, FunctionFact, GitSnapshot};
use repolex::sparql::SparqlExecutor;
use repolex::{Coordinator, QuadStoreClient, QueryOutcome};

fn facts_with_one_function(signature: &str, docstring: Option<&str>, line_end: u32) -> FactBag {
    FactBag {
        functions: vec![FunctionFact {
            name: "fetch_user".into(),
            module_path: "app.users".into(),
            signature: signature.into(),
            docstring: docstring.map(|s| s.to_string()),
            decorators: vec![],
            file_path: "app/users.py".into(),
            line_start: 5,
            line_end,
            visibility_hint: "fetch_user".into(),
        }],
        classes: vec![],
        imports: vec![],
        files: vec![FileFact {
            path: "app/users.py".into(),
            byte_len: 42,
            content: b"def fetch_user(id): ...".to_vec(),
        }],
        directories: vec![],
        git: GitSnapshot {
            commit_sha: "deadbeef".into(),
            author_name: "Dev".into(),
            author_email: "dev@example.com".into(),
            authored_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            tag: Some("v1.0.0".into()),
            branch: Some("main".into()),
        },
    }
}

#[test]
fn s1_add_repo_ingest_query_semantic_dna() {
    let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
    coord.repo_add("acme", "webapp").unwrap();
    coord
        .graph_add(
            "acme",
            "webapp",
            "v1.0.0",
            &facts_with_one_function("fetch_user(id: int) -> User", Some("Load a user by id"), 8),
        )
        .unwrap();

    let uris = repolex::schema::all_graph_uris("acme", "webapp", "v1.0.0");
    let stable = coord.store().graph_triples(&uris.functions_stable).unwrap();
    assert!(stable
        .iter()
        .any(|t| t.subject.to_string() == "<function:acme/webapp/app.users.fetch_user>"));

    let executor = SparqlExecutor::new(coord.store());
    let outcome = executor
        .execute(&format!(
            "PREFIX woc: <http://rdf.webofcode.org/woc/> \
             SELECT ?name WHERE {{ GRAPH <{}> {{ ?f a woc:Function ; woc:canonicalName ?name }} }}",
            uris.functions_stable
        ))
        .unwrap();
    match outcome {
        QueryOutcome::Rows { solutions, .. } => assert_eq!(solutions.len(), 1),
        _ => panic!("expected rows"),
    }

    let doc = repolex::dna::encode(coord.store(), "acme", "webapp", "v1.0.0", true, "2024-03-02T00:00:00Z")
        .unwrap();
    assert_eq!(doc.functions.len(), 1);
    assert_eq!(doc.functions[0].n, "fetch_user");
    let bytes = repolex::dna::to_msgpack(&doc).unwrap();
    let decoded = repolex::dna::from_msgpack(&bytes).unwrap();
    assert_eq!(doc, decoded);
}

#[test]
fn s2_second_version_produces_modified_event_and_both_implementations_coexist() {
    let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
    coord.repo_add("acme", "webapp").unwrap();
    coord
        .graph_add(
            "acme",
            "webapp",
            "v1.0.0",
            &facts_with_one_function("fetch_user(id: int) -> User", None, 8),
        )
        .unwrap();
    coord
        .graph_add(
            "acme",
            "webapp",
            "v1.1.0",
            &facts_with_one_function("fetch_user(id: int, cache: bool = False) -> User", None, 10),
        )
        .unwrap();

    let uris = repolex::schema::all_graph_uris("acme", "webapp", "v1.1.0");
    let impls = coord.store().graph_triples(&uris.functions_implementations).unwrap();
    assert!(impls
        .iter()
        .any(|t| t.subject.to_string() == "<function:acme/webapp/app.users.fetch_user#v1.0.0>"));
    assert!(impls
        .iter()
        .any(|t| t.subject.to_string() == "<function:acme/webapp/app.users.fetch_user#v1.1.0>"));

    let stats = coord.evolution_statistics("acme", "webapp").unwrap();
    let fn_stats = stats
        .per_function
        .get("function:acme/webapp/app.users.fetch_user")
        .expect("evolution stats for fetch_user");
    assert_eq!(fn_stats.change_count, 1);
}

#[test]
fn s3_remove_version_preserves_stable_identity() {
    let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
    coord.repo_add("acme", "webapp").unwrap();
    coord
        .graph_add(
            "acme",
            "webapp",
            "v1.0.0",
            &facts_with_one_function("fetch_user(id: int) -> User", None, 8),
        )
        .unwrap();
    coord
        .graph_add(
            "acme",
            "webapp",
            "v1.1.0",
            &facts_with_one_function("fetch_user(id: int, cache: bool = False) -> User", None, 10),
        )
        .unwrap();

    coord.graph_remove("acme", "webapp", "v1.0.0").unwrap();

    let uris = repolex::schema::all_graph_uris("acme", "webapp", "v1.1.0");
    let stable = coord.store().graph_triples(&uris.functions_stable).unwrap();
    assert!(stable
        .iter()
        .any(|t| t.subject.to_string() == "<function:acme/webapp/app.users.fetch_user>"));

    let impls = coord.store().graph_triples(&uris.functions_implementations).unwrap();
    assert!(!impls
        .iter()
        .any(|t| t.subject.to_string() == "<function:acme/webapp/app.users.fetch_user#v1.0.0>"));
    assert!(impls
        .iter()
        .any(|t| t.subject.to_string() == "<function:acme/webapp/app.users.fetch_user#v1.1.0>"));
}

#[test]
fn s5_natural_language_search_ranks_relevant_function_first() {
    let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
    coord.repo_add("acme", "webapp").unwrap();
    coord
        .graph_add(
            "acme",
            "webapp",
            "v1.0.0",
            &facts_with_one_function("fetch_user(id: int) -> User", Some("Retrieve a user record"), 8),
        )
        .unwrap();

    let engine = coord.search_engine();
    let results = engine
        .search(coord.store(), "acme", "webapp", "get user", None, None, 5)
        .unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].name, "fetch_user");
}

#[test]
fn s6_update_style_sparql_is_rejected_as_security_error() {
    let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
    coord.repo_add("acme", "webapp").unwrap();

    let executor = SparqlExecutor::new(coord.store());
    let uris = repolex::schema::all_graph_uris("acme", "webapp", "v1.0.0");
    let result = executor.execute(&format!("CLEAR GRAPH <{}>", uris.functions_stable));
    assert!(result.is_err());
}

#[test]
fn i1_stable_identity_survives_full_repository_removal_of_one_version() {
    let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
    coord.repo_add("acme", "webapp").unwrap();
    coord
        .graph_add(
            "acme",
            "webapp",
            "v1.0.0",
            &facts_with_one_function("fetch_user(id: int) -> User", None, 8),
        )
        .unwrap();
    coord
        .graph_add(
            "acme",
            "webapp",
            "v2.0.0",
            &facts_with_one_function("fetch_user(id: int) -> User", None, 8),
        )
        .unwrap();
    coord.graph_remove("acme", "webapp", "v1.0.0").unwrap();

    let uris = repolex::schema::all_graph_uris("acme", "webapp", "v2.0.0");
    let stable = coord.store().graph_triples(&uris.functions_stable).unwrap();
    assert_eq!(
        stable
            .iter()
            .filter(|t| t.subject.to_string() == "<function:acme/webapp/app.users.fetch_user>")
            .count(),
        4,
        "type + canonicalName + modulePath + hasVisibility quads for the one stable subject"
    );
}

#[test]
fn remove_force_deletes_every_graph_for_the_repository() {
    let coord = Coordinator::new(QuadStoreClient::in_memory().unwrap());
    coord.repo_add("acme", "webapp").unwrap();
    coord
        .graph_add(
            "acme",
            "webapp",
            "v1.0.0",
            &facts_with_one_function("fetch_user(id: int) -> User", None, 8),
        )
        .unwrap();

    coord.remove("acme", "webapp", true).unwrap();

    let base = repolex::schema::repository_base_uri("acme", "webapp");
    let remaining = coord.store().iter_graph_iris(&format!("{base}/")).unwrap();
    assert!(remaining.is_empty());
}
