use assert_cmd::Command;
use test_support::{cmd_bin, fixture_env_value, BIN};

pub const NOW: &str = "2023-11-02T21:00:00Z";
pub const PACT_URL: &str = "https://github.com/quarkiverse/quarkus-pact";

/// Binary wired to the fixture backend, a fixed clock and `cache_dir`.
pub fn fixture_cmd(cache_dir: &std::path::Path) -> Command {
  fixture_cmd_at(cache_dir, NOW)
}

pub fn fixture_cmd_at(cache_dir: &std::path::Path, now: &str) -> Command {
  let mut cmd = cmd_bin(BIN);
  cmd
    .env("GITHUB_TOKEN", "test-token")
    .env("EXT_TEST_GRAPHQL_JSON", fixture_env_value("graphql.json"))
    .env("EXT_TEST_REST_JSON", fixture_env_value("rest.json"))
    .env("EXT_TEST_RAW_JSON", fixture_env_value("raw.json"))
    .args(["--now-override", now])
    .arg("--cache-dir")
    .arg(cache_dir);
  cmd
}

pub fn stdout_json(out: &std::process::Output) -> serde_json::Value {
  assert!(
    out.status.success(),
    "run failed: {}",
    String::from_utf8_lossy(&out.stderr)
  );
  serde_json::from_slice(&out.stdout).expect("stdout is JSON")
}
