// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the JSON model (contributors, company aggregates, issue info, per-repository enrichment) shared by stages and output
// role: model/types
// outputs: Serializable structs with stable field names and optional enrichment fields
// invariants: Absent enrichment is omitted from output rather than emitted as empty; sponsor == sponsors[0] when present
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryCoordinates {
  pub owner: String,
  pub name: String,
}

impl RepositoryCoordinates {
  pub fn cache_key(&self) -> String {
    format!("{}:{}", self.owner, self.name)
  }
}

/// One GitHub user's commits in the lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
  pub login: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  pub contributions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyContribution {
  pub company: String,
  pub commits: u64,
  /// Distinct logins.
  pub contributors: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueInformation {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub issues: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub issues_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEnrichment {
  pub url: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owner: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub logo_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sponsors: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sponsor: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contributors: Option<Vec<Contributor>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub issues: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub issues_url: Option<String>,
}
