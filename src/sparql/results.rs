//! Result serialisation for the query surface (spec §4.5, §6.3).
//!
//! Format selection reuses [`sparesults::QueryResultsFormat`] so callers pick
//! from the same enum the rest of the SPARQL 1.1 ecosystem uses; the actual
//! byte-level rendering happens over our already row-capped/truncated
//! [`crate::store::QueryOutcome`] rather than oxigraph's own streaming
//! writer, since truncation must apply before serialisation, not after.

use oxigraph::model::Term;
use sparesults::QueryResultsFormat;

use crate::store::QueryOutcome;

pub fn term_to_string(term: &Term) -> String {
    match term {
        Term::NamedNode(n) => n.as_str().to_string(),
        Term::BlankNode(b) => format!("_:{}", b.as_str()),
        Term::Literal(l) => l.value().to_string(),
        #[allow(unreachable_patterns)]
        _ => term.to_string(),
    }
}

fn escape_json(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Escape the five XML-significant characters for use inside element text
/// and double-quoted attribute values alike.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Quote a field per RFC 4180 / the SPARQL 1.1 CSV results format: wrap in
/// double quotes and double any internal quotes whenever the field contains
/// the delimiter, a quote, or a line break.
fn csv_field(s: &str, delimiter: char) -> String {
    if s.contains(delimiter) || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn serialize(outcome: &QueryOutcome, format: QueryResultsFormat) -> String {
    match outcome {
        QueryOutcome::Boolean(b) => serialize_boolean(*b, format),
        QueryOutcome::Rows {
            variables,
            solutions,
            truncated,
        } => serialize_rows(variables, solutions, *truncated, format),
        QueryOutcome::Graph(triples) => serialize_graph(triples, format),
    }
}

fn serialize_boolean(value: bool, format: QueryResultsFormat) -> String {
    match format {
        QueryResultsFormat::Json => format!("{{\"head\":{{}},\"boolean\":{value}}}"),
        QueryResultsFormat::Xml => format!(
            "<?xml version=\"1.0\"?><sparql><head/><boolean>{value}</boolean></sparql>"
        ),
        _ => value.to_string(),
    }
}

fn serialize_rows(
    variables: &[String],
    solutions: &[Vec<(String, Term)>],
    truncated: bool,
    format: QueryResultsFormat,
) -> String {
    match format {
        QueryResultsFormat::Json => {
            let vars_json = variables
                .iter()
                .map(|v| escape_json(v))
                .collect::<Vec<_>>()
                .join(",");
            let bindings = solutions
                .iter()
                .map(|row| {
                    let fields = row
                        .iter()
                        .map(|(var, term)| {
                            format!(
                                "{}:{{\"type\":\"{}\",\"value\":{}}}",
                                escape_json(var),
                                term_type(term),
                                escape_json(&term_to_string(term))
                            )
                        })
                        .collect::<Vec<_>>()
                        .join(",");
                    format!("{{{fields}}}")
                })
                .collect::<Vec<_>>()
                .join(",");
            format!(
                "{{\"head\":{{\"vars\":[{vars_json}]{}}},\"results\":{{\"bindings\":[{bindings}]}}}}",
                if truncated { ",\"truncated\":true" } else { "" }
            )
        }
        QueryResultsFormat::Csv => {
            let mut out = variables
                .iter()
                .map(|v| csv_field(v, ','))
                .collect::<Vec<_>>()
                .join(",");
            out.push('\n');
            for row in solutions {
                let by_var: std::collections::HashMap<&str, &Term> =
                    row.iter().map(|(v, t)| (v.as_str(), t)).collect();
                let line = variables
                    .iter()
                    .map(|v| {
                        by_var
                            .get(v.as_str())
                            .map(|t| csv_field(&term_to_string(t), ','))
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                out.push_str(&line);
                out.push('\n');
            }
            out
        }
        QueryResultsFormat::Tsv => {
            let mut out = variables
                .iter()
                .map(|v| format!("?{v}"))
                .collect::<Vec<_>>()
                .join("\t");
            out.push('\n');
            for row in solutions {
                let by_var: std::collections::HashMap<&str, &Term> =
                    row.iter().map(|(v, t)| (v.as_str(), t)).collect();
                let line = variables
                    .iter()
                    .map(|v| {
                        by_var
                            .get(v.as_str())
                            .map(|t| csv_field(&term_to_string(t), '\t'))
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>()
                    .join("\t");
                out.push_str(&line);
                out.push('\n');
            }
            out
        }
        QueryResultsFormat::Xml => {
            let vars_decl = variables
                .iter()
                .map(|v| format!("<variable name=\"{}\"/>", escape_xml(v)))
                .collect::<String>();
            let results = solutions
                .iter()
                .map(|row| {
                    let bindings = row
                        .iter()
                        .map(|(var, term)| {
                            let tag = term_type(term);
                            format!(
                                "<binding name=\"{}\"><{tag}>{}</{tag}></binding>",
                                escape_xml(var),
                                escape_xml(&term_to_string(term))
                            )
                        })
                        .collect::<String>();
                    format!("<result>{bindings}</result>")
                })
                .collect::<String>();
            format!(
                "<?xml version=\"1.0\"?><sparql><head>{vars_decl}</head><results>{results}</results></sparql>"
            )
        }
    }
}

fn serialize_graph(triples: &[oxigraph::model::Triple], format: QueryResultsFormat) -> String {
    let lines: String = triples
        .iter()
        .map(|t| format!("{} {} {} .\n", t.subject, t.predicate, t.object))
        .collect();
    match format {
        QueryResultsFormat::Json => {
            let items = triples
                .iter()
                .map(|t| {
                    format!(
                        "{{\"s\":{},\"p\":{},\"o\":{}}}",
                        escape_json(&t.subject.to_string()),
                        escape_json(&t.predicate.to_string()),
                        escape_json(&t.object.to_string())
                    )
                })
                .collect::<Vec<_>>()
                .join(",");
            format!("{{\"triples\":[{items}]}}")
        }
        _ => lines,
    }
}

fn term_type(term: &Term) -> &'static str {
    match term {
        Term::NamedNode(_) => "uri",
        Term::BlankNode(_) => "bnode",
        Term::Literal(_) => "literal",
        #[allow(unreachable_patterns)]
        _ => "literal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{Literal, NamedNode};

    fn signature_row() -> Vec<Vec<(String, Term)>> {
        vec![vec![(
            "sig".to_string(),
            Term::Literal(Literal::new_simple_literal("fetch(a, b) -> List<User>")),
        )]]
    }

    #[test]
    fn xml_escapes_angle_brackets_in_literal_values() {
        let out = serialize_rows(
            &["sig".to_string()],
            &signature_row(),
            false,
            QueryResultsFormat::Xml,
        );
        assert!(!out.contains("List<User>"));
        assert!(out.contains("List&lt;User&gt;"));
        assert!(out.contains("<literal>"));
    }

    #[test]
    fn xml_tags_a_bound_uri_as_uri_not_literal() {
        let rows = vec![vec![(
            "f".to_string(),
            Term::NamedNode(NamedNode::new_unchecked("http://example.org/f")),
        )]];
        let out = serialize_rows(&["f".to_string()], &rows, false, QueryResultsFormat::Xml);
        assert!(out.contains("<uri>http://example.org/f</uri>"));
        assert!(!out.contains("<literal>http://example.org/f</literal>"));
    }

    #[test]
    fn csv_quotes_a_field_containing_a_comma() {
        let out = serialize_rows(
            &["sig".to_string()],
            &signature_row(),
            false,
            QueryResultsFormat::Csv,
        );
        let mut lines = out.lines();
        lines.next();
        assert_eq!(lines.next(), Some("\"fetch(a, b) -> List<User>\""));
    }

    #[test]
    fn csv_doubles_internal_quotes() {
        let rows = vec![vec![(
            "sig".to_string(),
            Term::Literal(Literal::new_simple_literal("say \"hi\"")),
        )]];
        let out = serialize_rows(&["sig".to_string()], &rows, false, QueryResultsFormat::Csv);
        let mut lines = out.lines();
        lines.next();
        assert_eq!(lines.next(), Some("\"say \"\"hi\"\"\""));
    }
}
