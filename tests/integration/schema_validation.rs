use serde_json::Value;

use crate::common::{fixture_cmd, stdout_json, PACT_URL};

fn compile_schema() -> jsonschema::Validator {
  let schema_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/schemas/repository-enrichment.schema.json");
  let schema: Value = serde_json::from_slice(&std::fs::read(&schema_path).unwrap()).unwrap();
  jsonschema::validator_for(&schema).expect("valid schema")
}

fn assert_valid(validator: &jsonschema::Validator, instance: &Value) {
  let errors: Vec<String> = validator.iter_errors(instance).map(|e| e.to_string()).collect();
  assert!(errors.is_empty(), "schema errors: {:?}", errors);
}

#[test]
fn output_conforms_to_schema() {
  let validator = compile_schema();
  let td = test_support::tempdir();

  let out = fixture_cmd(td.path())
    .args(["--scm-url", PACT_URL, "--minimum-contributor-count", "1", "--no-persist"])
    .args(["--scm-url", "https://bitbucket.org/some/where"])
    .output()
    .unwrap();

  assert_valid(&validator, &stdout_json(&out));
}

#[test]
fn schema_rejects_sponsor_without_list() {
  let validator = compile_schema();
  let bad = serde_json::json!([{ "url": "https://github.com/a/b", "sponsor": "Red Hat", "issues": -1 }]);
  assert!(!validator.is_valid(&bad));
}
