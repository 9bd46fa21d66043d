// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Map free-text profile "company" fields to canonical company names
// role: enrichment/company
// inputs: Raw company string from a GitHub profile; GithubClient for @handle lookups; companies cache
// outputs: Canonical company name, or None when nothing usable remains
// invariants:
// - Text rules run in declaration order; parenthetical before @handle before "by"
// - "@handle" values are resolved through users/<handle>, falling back to the handle
// - Cache key is the raw string, never the resolved name
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::cache::PersistableCache;
use crate::github::client::GithubClient;

pub type CompanyCache = PersistableCache<Option<String>>;

/// One step of the text clean-up.
#[derive(Debug)]
pub enum NormalizationRule {
  /// Drop the first occurrence of a literal.
  Strip(&'static str),
  /// If the pattern matches, keep only its first capture group.
  KeepPrefix(Regex),
  /// Swap the first occurrence of a literal.
  Replace(&'static str, &'static str),
}

impl NormalizationRule {
  pub fn apply(&self, input: &str) -> String {
    match self {
      NormalizationRule::Strip(s) => input.replacen(s, "", 1),
      NormalizationRule::KeepPrefix(re) => match re.captures(input).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().to_string(),
        None => input.to_string(),
      },
      NormalizationRule::Replace(from, to) => input.replacen(from, to, 1),
    }
  }
}

fn keep_prefix(pattern: &str) -> NormalizationRule {
  NormalizationRule::KeepPrefix(Regex::new(pattern).unwrap())
}

pub static RULES: Lazy<Vec<NormalizationRule>> = Lazy::new(|| {
  vec![
    NormalizationRule::Strip(", Inc."),
    NormalizationRule::Strip(", Inc"),
    NormalizationRule::Strip(" Inc"),
    NormalizationRule::Strip("  GmbH"),
    keep_prefix(r"^(.*?) \(.*\)"),
    keep_prefix(r"^(.*?)(?: - )?@.*"),
    keep_prefix(r"^(.*?) by .*"),
    // acquisitions
    NormalizationRule::Replace("JBoss", "Red Hat"),
    NormalizationRule::Replace("https://www.redhat.com/", "Red Hat"),
    NormalizationRule::Replace("http://www.redhat.com/", "Red Hat"),
  ]
});

/// Text-only clean-up; no lookups.
pub fn normalize_text(raw: &str) -> String {
  RULES.iter().fold(raw.to_string(), |acc, rule| rule.apply(&acc)).trim().to_string()
}

pub struct CompanyNormalizer<'a> {
  pub client: &'a GithubClient,
  pub cache: &'a CompanyCache,
}

impl<'a> CompanyNormalizer<'a> {
  pub fn normalize_company_name(&self, raw: Option<&str>) -> Option<String> {
    let raw = raw.filter(|r| !r.trim().is_empty())?;

    self.cache.get_or_set(raw, || {
      let resolved = match raw.strip_prefix('@') {
        Some(handle) => self.lookup_handle(handle.trim()),
        None => normalize_text(raw),
      };
      Some(resolved).filter(|s| !s.is_empty())
    })
  }

  fn lookup_handle(&self, handle: &str) -> String {
    let name = self
      .client
      .query_rest(&format!("users/{}", handle))
      .and_then(|body| body.get("name").and_then(Value::as_str).map(str::to_string))
      .filter(|n| !n.trim().is_empty());

    debug!(handle, resolved = ?name, "resolved company handle");

    name.unwrap_or_else(|| handle.to_string())
  }
}
