use serde_json::{json, Value};

use crate::common::{fixture_cmd, fixture_cmd_at, stdout_json, PACT_URL};

fn run(cache_dir: &std::path::Path, extra: &[&str], graphql: Option<&str>) -> Value {
  let mut cmd = fixture_cmd(cache_dir);
  if let Some(g) = graphql {
    cmd.env("EXT_TEST_GRAPHQL_JSON", g);
  }
  let out = cmd
    .args(["--scm-url", PACT_URL, "--minimum-contributor-count", "1"])
    .args(extra)
    .output()
    .unwrap();
  stdout_json(&out)
}

#[test]
fn caches_are_persisted_per_key() {
  let td = test_support::tempdir();
  run(td.path(), &[], None);

  for key in ["contributors", "companies", "issue-counts"] {
    let path = td.path().join(format!("{key}.json"));
    let dump: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert!(dump.is_array(), "{} should hold a dump array", path.display());
  }

  let companies: Value = serde_json::from_slice(&std::fs::read(td.path().join("companies.json")).unwrap()).unwrap();
  let entry = companies
    .as_array()
    .unwrap()
    .iter()
    .find(|e| e["key"] == "@RedHatOfficial")
    .expect("company lookup was cached");
  assert_eq!(entry["value"], "Red Hat");
}

#[test]
fn second_run_is_served_from_disk() {
  let td = test_support::tempdir();
  let first = run(td.path(), &[], None);

  // Without GraphQL fixtures every query would fail, so identical output proves cache hits.
  let second = run(td.path(), &[], Some("{}"));

  assert_eq!(first, second);
  assert_eq!(second[0]["sponsor"], "Red Hat");
}

#[test]
fn flush_cache_ignores_persisted_entries() {
  let td = test_support::tempdir();
  run(td.path(), &[], None);

  let flushed = run(td.path(), &["--flush-cache", "--no-persist"], Some("{}"));

  assert!(flushed[0].get("contributors").is_none());
  assert!(flushed[0].get("issues").is_none());
  assert_eq!(flushed[0]["issues_url"], json!("https://github.com/quarkiverse/quarkus-pact/issues"));
}

#[test]
fn no_persist_leaves_cache_dir_empty() {
  let td = test_support::tempdir();
  run(td.path(), &["--no-persist"], None);
  assert!(std::fs::read_dir(td.path()).unwrap().next().is_none());
}

#[test]
fn entries_expire_once_the_clock_passes_their_ttl() {
  let td = test_support::tempdir();
  run(td.path(), &["--skip-issues"], None);

  // Two days and one minute later the contributor list has to be fetched again.
  let later = fixture_cmd_at(td.path(), "2023-11-04T21:01:00Z")
    .env("EXT_TEST_GRAPHQL_JSON", "{}")
    .args(["--scm-url", PACT_URL, "--skip-issues", "--no-persist"])
    .output()
    .unwrap();

  let v = stdout_json(&later);
  assert!(v[0].get("contributors").is_none());
}

#[test]
fn failed_lookups_are_retried_on_the_next_run() {
  let td = test_support::tempdir();
  let failed = run(td.path(), &[], Some("{}"));
  assert!(failed[0].get("contributors").is_none());
  assert!(failed[0].get("issues").is_none());

  for key in ["contributors", "issue-counts"] {
    let dump: Value = serde_json::from_slice(&std::fs::read(td.path().join(format!("{key}.json"))).unwrap()).unwrap();
    assert_eq!(dump, json!([]), "{key} should not hold failed lookups");
  }

  let healthy = run(td.path(), &[], None);
  assert_eq!(healthy[0]["contributors"].as_array().map(Vec::len), Some(2));
  assert_eq!(healthy[0]["issues"], 3);
}
