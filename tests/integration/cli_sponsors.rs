use serde_json::json;

use crate::common::{fixture_cmd, stdout_json, PACT_URL};

#[test]
fn single_company_contributor_is_named_with_relaxed_threshold() {
  let td = test_support::tempdir();
  let out = fixture_cmd(td.path())
    .args(["--scm-url", PACT_URL, "--minimum-contributor-count", "1", "--no-persist"])
    .output()
    .unwrap();

  let v = stdout_json(&out);
  assert_eq!(v[0]["sponsors"], json!(["Red Hat"]));
  assert_eq!(v[0]["sponsor"], "Red Hat");
  assert_eq!(v[0]["issues"], 3);
}

#[test]
fn default_thresholds_need_two_contributors() {
  let td = test_support::tempdir();
  let out = fixture_cmd(td.path())
    .args(["--scm-url", PACT_URL, "--no-persist"])
    .output()
    .unwrap();

  let v = stdout_json(&out);
  assert!(v[0].get("sponsors").is_none());
  assert!(v[0].get("sponsor").is_none());
  // contributors are reported even when nobody qualifies as a sponsor
  assert_eq!(v[0]["contributors"][0]["login"], "a-person");
  assert_eq!(v[0]["contributors"][0]["contributions"], 4);
}

#[test]
fn companies_outside_the_opt_in_list_stay_anonymous() {
  let td = test_support::tempdir();
  let out = fixture_cmd(td.path())
    .env("EXT_TEST_RAW_JSON", "{}")
    .args(["--scm-url", PACT_URL, "--minimum-contributor-count", "1", "--no-persist"])
    .output()
    .unwrap();

  let v = stdout_json(&out);
  assert!(v[0].get("sponsor").is_none());
  assert_eq!(v[0]["contributors"].as_array().map(|a| a.len()), Some(2));
}

#[test]
fn bots_are_left_out_of_contributors() {
  let td = test_support::tempdir();
  let out = fixture_cmd(td.path())
    .args(["--scm-url", PACT_URL, "--skip-issues", "--no-persist"])
    .output()
    .unwrap();

  let v = stdout_json(&out);
  let logins: Vec<&str> = v[0]["contributors"]
    .as_array()
    .unwrap()
    .iter()
    .filter_map(|c| c["login"].as_str())
    .collect();
  assert_eq!(logins, vec!["a-person", "gastaldi"]);
  assert!(v[0].get("issues").is_none());
}

#[test]
fn zero_issue_count_drops_url_that_redirects_to_pulls() {
  let td = test_support::tempdir();
  let graphql = json!({
    "history(": { "data": { "repository": { "defaultBranchRef": null } } },
    "issues(": { "data": { "repository": { "issues": { "totalCount": 0 } } } }
  });
  let probe = json!({
    "https://github.com/quarkiverse/quarkus-pact/issues": {
      "status": 200,
      "final_url": "https://github.com/quarkiverse/quarkus-pact/pulls"
    }
  });
  let out = fixture_cmd(td.path())
    .env("EXT_TEST_GRAPHQL_JSON", graphql.to_string())
    .env("EXT_TEST_PROBE_JSON", probe.to_string())
    .args(["--scm-url", PACT_URL, "--skip-sponsors", "--no-persist"])
    .output()
    .unwrap();

  let v = stdout_json(&out);
  assert_eq!(v[0]["issues"], 0);
  assert!(v[0].get("issues_url").is_none());
}
