// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Cursor pagination helpers for GraphQL connection queries (pageInfo injection, after-cursor rewriting, edge splicing)
// role: github/pagination
// inputs: GraphQL query text with at most one `edges { ... }` block; parsed responses
// outputs: Rewritten query strings; located connection paths; merged edge arrays
// invariants:
// - pageInfo is injected once, directly before the single edges block
// - More than one edges block is rejected with PaginationError::MultipleConnections
// - set_after_cursor keeps all other arguments of the target field and replaces any earlier `after`
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::ext::serde_json::JsonFetch;

static RE_EDGES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bedges\s*\{").unwrap());
static RE_PAGE_INFO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bpageInfo\s*\{").unwrap());
static RE_AFTER_ARG: Lazy<Regex> = Lazy::new(|| Regex::new(r#"after:\s*"[^"]*"\s*,?\s*"#).unwrap());

const PAGE_INFO_SELECTION: &str = "pageInfo {\n hasNextPage\n endCursor\n }\n ";

#[derive(Error, Debug, PartialEq)]
pub enum PaginationError {
  #[error("query has {0} paginated `edges` blocks; only one connection per query is supported")]
  MultipleConnections(usize),
}

/// Where the connection sits in a response, and what its next page looks like.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
  /// Keys from the response root down to the connection object.
  pub path: Vec<String>,
  pub has_next_page: bool,
  pub end_cursor: Option<String>,
}

impl PageInfo {
  /// Name of the connection field in the query.
  pub fn field(&self) -> Option<&str> {
    self.path.last().map(String::as_str)
  }

  pub fn edges_path(&self) -> Vec<String> {
    let mut p = self.path.clone();
    p.push("edges".to_string());
    p
  }
}

/// Add a `pageInfo { hasNextPage endCursor }` selection beside the query's `edges` block.
pub fn add_page_info(query: &str) -> Result<String, PaginationError> {
  let edges: Vec<_> = RE_EDGES.find_iter(query).collect();

  match edges.len() {
    0 => Ok(query.to_string()),
    1 if RE_PAGE_INFO.is_match(query) => Ok(query.to_string()),
    1 => {
      let at = edges[0].start();
      Ok(format!("{}{}{}", &query[..at], PAGE_INFO_SELECTION, &query[at..]))
    }
    n => Err(PaginationError::MultipleConnections(n)),
  }
}

/// Locate `pageInfo` anywhere in the response.
pub fn locate_page_info(response: &Value) -> Option<PageInfo> {
  let path = response.find_key_path("pageInfo")?;
  let mut info_path = path.clone();
  info_path.push("pageInfo".to_string());
  let info = response.fetch_path(&info_path);

  Some(PageInfo {
    path,
    has_next_page: info.value().and_then(|v| v.get("hasNextPage")).and_then(Value::as_bool).unwrap_or(false),
    end_cursor: info.value().and_then(|v| v.get("endCursor")).and_then(Value::as_str).map(str::to_string),
  })
}

/// Put `after: "<cursor>"` first in the argument list of `field`, creating the list if needed.
///
/// Returns `None` when `field` is not followed by a selection set in `query`.
pub fn set_after_cursor(query: &str, field: &str, cursor: &str) -> Option<String> {
  let re = Regex::new(&format!(r"\b{}\s*(?:\(([^)]*)\))?\s*\{{", regex::escape(field))).ok()?;
  let caps = re.captures(query)?;
  let whole = caps.get(0)?;

  let existing = caps
    .get(1)
    .map(|m| RE_AFTER_ARG.replace_all(m.as_str(), "").trim().to_string())
    .unwrap_or_default();

  let args = if existing.is_empty() {
    format!("after: \"{}\"", cursor)
  } else {
    format!("after: \"{}\", {}", cursor, existing)
  };

  Some(format!(
    "{}{}({}) {{{}",
    &query[..whole.start()],
    field,
    args,
    &query[whole.end()..]
  ))
}

/// Append `more` to the edges array found at `edges_path` in `target`.
pub fn splice_edges(target: &mut Value, edges_path: &[String], more: Vec<Value>) -> bool {
  match target.fetch_path_mut(edges_path) {
    Some(Value::Array(edges)) => {
      edges.extend(more);
      true
    }
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
  }

  #[test]
  fn injects_page_info_before_edges() {
    let q = add_page_info("query { information(){ edges { bla bla bla}}").unwrap();
    assert_eq!(
      squash(&q),
      "query { information(){ pageInfo { hasNextPage endCursor } edges { bla bla bla}}"
    );
  }

  #[test]
  fn queries_without_edges_are_untouched() {
    assert_eq!(add_page_info("query bla bla bla").unwrap(), "query bla bla bla");
  }

  #[test]
  fn existing_page_info_is_not_duplicated() {
    let q = "query { x { pageInfo { hasNextPage endCursor } edges { n } } }";
    assert_eq!(add_page_info(q).unwrap(), q);
  }

  #[test]
  fn multiple_connections_fail_loudly() {
    let q = "query { a { edges { n } } b { edges { n } } }";
    assert_eq!(add_page_info(q), Err(PaginationError::MultipleConnections(2)));
  }

  #[test]
  fn locates_page_info_and_cursor() {
    let v = json!({
      "data": {
        "holder": {
          "information": {
            "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29yOjEwMA==" },
            "edges": []
          }
        }
      }
    });

    let info = locate_page_info(&v).unwrap();
    assert_eq!(info.field(), Some("information"));
    assert!(info.has_next_page);
    assert_eq!(info.end_cursor.as_deref(), Some("Y3Vyc29yOjEwMA=="));
    assert_eq!(info.edges_path(), vec!["data", "holder", "information", "edges"]);
  }

  #[test]
  fn adds_argument_list_when_absent() {
    let q = "query { holder { information{edges { whatever }}}";
    let out = set_after_cursor(q, "information", "Y3Vyc29yOjEwMA==").unwrap();
    assert!(out.contains(r#"information(after: "Y3Vyc29yOjEwMA==") {edges"#), "{}", out);
  }

  #[test]
  fn keeps_existing_arguments_and_replaces_old_cursor() {
    let q = "query { holder { information(since: something) {edges { whatever }}}";
    let first = set_after_cursor(q, "information", "Y3Vyc29yOjEwMA==").unwrap();
    assert!(first.contains(r#"information(after: "Y3Vyc29yOjEwMA==", since: something)"#), "{}", first);

    let second = set_after_cursor(&first, "information", "YHGMADEUP==").unwrap();
    assert!(second.contains(r#"information(after: "YHGMADEUP==", since: something)"#), "{}", second);
    assert!(!second.contains("Y3Vyc29y"));
  }

  #[test]
  fn handles_cursors_containing_spaces() {
    let q = r#"history(after: "51461900c930fb5ed27b83b52ecd68eaaf1953bc 99", since: "2023-04-20T14:57:53.882Z"){ edges { node } }"#;
    let out = set_after_cursor(q, "history", "Y3Vyc29yOjEwMA==").unwrap();
    assert!(out.contains(r#"history(after: "Y3Vyc29yOjEwMA==", since: "2023-04-20T14:57:53.882Z")"#), "{}", out);
  }

  #[test]
  fn unknown_field_yields_none() {
    assert_eq!(set_after_cursor("query { a { edges { n } } }", "missing", "c"), None);
  }

  #[test]
  fn splices_edges_in_order() {
    let mut v = json!({ "data": { "c": { "edges": [1] } } });
    let path: Vec<String> = vec!["data".into(), "c".into(), "edges".into()];

    assert!(splice_edges(&mut v, &path, vec![json!(2), json!(3)]));
    assert_eq!(v["data"]["c"]["edges"], json!([1, 2, 3]));
    assert!(!splice_edges(&mut v, &["nope".to_string()], vec![]));
  }
}
