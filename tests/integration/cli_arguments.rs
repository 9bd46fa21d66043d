use predicates::prelude::*;
use test_support::{cmd_bin, BIN};

#[test]
fn missing_scm_url_is_a_usage_error() {
  cmd_bin(BIN)
    .assert()
    .failure()
    .stderr(predicate::str::contains("--scm-url"));
}

#[test]
fn surplus_artifact_ids_are_rejected() {
  cmd_bin(BIN)
    .args(["--scm-url", "https://github.com/a/b", "--artifact-id", "x", "--artifact-id", "y"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--artifact-id"));
}

#[test]
fn out_of_range_jitter_is_rejected() {
  cmd_bin(BIN)
    .args(["--scm-url", "https://github.com/a/b", "--cache-jitter", "2"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--cache-jitter"));
}

#[test]
fn skipped_stages_need_no_network() {
  let td = test_support::tempdir();
  let out = cmd_bin(BIN)
    .args(["--scm-url", "https://github.com/quarkiverse/quarkus-pact.git"])
    .args(["--skip-sponsors", "--skip-issues", "--no-persist"])
    .arg("--cache-dir")
    .arg(td.path())
    .output()
    .unwrap();

  let v = crate::common::stdout_json(&out);
  assert_eq!(
    v,
    serde_json::json!([{
      "url": "https://github.com/quarkiverse/quarkus-pact.git",
      "owner": "quarkiverse",
      "project": "quarkus-pact",
      "logo_url": "https://github.com/quarkiverse.png"
    }])
  );
  assert!(std::fs::read_dir(td.path()).unwrap().next().is_none());
}
