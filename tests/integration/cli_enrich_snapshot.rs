use crate::common::{fixture_cmd, PACT_URL};

#[test]
fn cli_enrich_snapshot() {
  test_support::init_insta();
  let td = test_support::tempdir();

  let out = fixture_cmd(td.path())
    .args(["--scm-url", PACT_URL, "--minimum-contributor-count", "1", "--no-persist"])
    .args(["--scm-url", "https://gitlab.com/quarkiverse/quarkus-other"])
    .output()
    .unwrap();
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

  let stdout = String::from_utf8(out.stdout).unwrap();
  insta::assert_snapshot!(stdout.trim_end(), @r###"
  [
    {
      "url": "https://github.com/quarkiverse/quarkus-pact",
      "owner": "quarkiverse",
      "project": "quarkus-pact",
      "logo_url": "https://github.com/quarkiverse.png",
      "sponsors": [
        "Red Hat"
      ],
      "sponsor": "Red Hat",
      "contributors": [
        {
          "login": "a-person",
          "name": "A Person",
          "company": "@RedHatOfficial",
          "url": "https://github.com/a-person",
          "contributions": 4
        },
        {
          "login": "gastaldi",
          "name": "George Gastaldi",
          "url": "https://github.com/gastaldi",
          "contributions": 1
        }
      ],
      "issues": 3,
      "issues_url": "https://github.com/quarkiverse/quarkus-pact/issues"
    },
    {
      "url": "https://gitlab.com/quarkiverse/quarkus-other"
    }
  ]
  "###);
}
