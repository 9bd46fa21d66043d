// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Work out issue labels for extensions living in the Quarkus core repository
// role: enrichment/labels
// inputs: GitHub bot YAML (triage.rules[].directories/labels); listing of the extensions directory tree
// outputs: LabelExtractor answering get_labels(artifact_id)
// invariants:
// - Directories ending in "/" are exact names; others are name prefixes
// - Nested sub-directories of an exact directory inherit its labels, skipping api/spi/runtime/deployment/client/server
// - Exact names win over prefixes; prefixes are tried in declaration order
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ext::serde_json::JsonFetch;
use crate::github::client::GithubClient;
use crate::github::pagination::PaginationError;

pub const BOT_CONFIG_ORG: &str = "quarkusio";
pub const BOT_CONFIG_REPO: &str = "quarkus";
pub const BOT_CONFIG_PATH: &str = ".github/quarkus-github-bot.yml";

// An intermediate folder between `extensions` and the extension itself is skipped.
static RE_EXTENSION_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"extensions(?:/.*?)?/(.+)/?").unwrap());

const NOT_EXTENSIONS: [&str; 6] = ["api", "spi", "runtime", "deployment", "client", "server"];

const LISTING_QUERY: &str = r#"query {
  repository(owner: "quarkusio", name: "quarkus") {
    object(expression: "HEAD:extensions") {
      ... on Tree {
        entries {
          name
          type
          object {
            ... on Tree {
              entries {
                name
                type
              }
            }
          }
        }
      }
    }
  }
}"#;

#[derive(Debug, Default, Deserialize)]
struct BotConfig {
  #[serde(default)]
  triage: Option<Triage>,
}

#[derive(Debug, Default, Deserialize)]
struct Triage {
  #[serde(default)]
  rules: Vec<TriageRule>,
}

#[derive(Debug, Default, Deserialize)]
struct TriageRule {
  #[serde(default)]
  directories: Vec<String>,
  #[serde(default)]
  labels: Vec<String>,
}

/// A top-level folder under `extensions/` and the folders directly inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionDirectory {
  pub name: String,
  pub subdirectories: Vec<String>,
}

/// Read the tree listing returned by the `HEAD:extensions` query.
pub fn parse_listing(response: &Value) -> Vec<ExtensionDirectory> {
  let entries = response
    .fetch("data.repository.object.entries")
    .to::<Vec<Value>>()
    .unwrap_or_default();

  entries
    .iter()
    .filter_map(|entry| {
      let name = entry.get("name")?.as_str()?.to_string();
      let subdirectories = entry
        .fetch("object.entries")
        .to::<Vec<Value>>()
        .unwrap_or_default()
        .iter()
        .filter(|e| e.get("type").and_then(Value::as_str) == Some("tree"))
        .filter_map(|e| e.get("name").and_then(Value::as_str).map(str::to_string))
        .collect();
      Some(ExtensionDirectory { name, subdirectories })
    })
    .collect()
}

#[derive(Debug, Default)]
pub struct LabelExtractor {
  exact: HashMap<String, Vec<String>>,
  prefixes: Vec<(String, Vec<String>)>,
}

fn add_labels(labels: &mut Vec<String>, more: &[String]) {
  labels.extend(more.iter().cloned());
}

impl LabelExtractor {
  pub fn new(yaml: &str, listing: &[ExtensionDirectory]) -> Result<Self, serde_yaml::Error> {
    let config: Option<BotConfig> = serde_yaml::from_str(yaml)?;
    let rules = config.and_then(|c| c.triage).map(|t| t.rules).unwrap_or_default();

    let mut extractor = Self::default();

    for rule in &rules {
      for dir in &rule.directories {
        let Some(found) = RE_EXTENSION_DIR.captures(dir).and_then(|c| c.get(1)) else {
          continue;
        };
        let found = found.as_str();

        match found.strip_suffix('/') {
          Some(extension) => {
            if let Some(listed) = listing.iter().find(|d| d.name == extension) {
              for sub in listed.subdirectories.iter().filter(|s| !NOT_EXTENSIONS.contains(&s.as_str())) {
                let nested = sub.strip_prefix("quarkus-").unwrap_or(sub);
                add_labels(extractor.exact.entry(nested.to_string()).or_default(), &rule.labels);
              }
            }
            add_labels(extractor.exact.entry(extension.to_string()).or_default(), &rule.labels);
          }
          None => match extractor.prefixes.iter_mut().find(|(p, _)| p == found) {
            Some((_, labels)) => add_labels(labels, &rule.labels),
            None => extractor.prefixes.push((found.to_string(), rule.labels.clone())),
          },
        }
      }
    }

    Ok(extractor)
  }

  /// Load the bot configuration and directory listing from the Quarkus repository.
  pub fn fetch(client: &GithubClient) -> Result<Self, PaginationError> {
    let Some(yaml) = client.get_raw_file_contents(BOT_CONFIG_ORG, BOT_CONFIG_REPO, BOT_CONFIG_PATH) else {
      warn!("could not fetch the GitHub bot configuration; core extensions get no labels");
      return Ok(Self::default());
    };
    let listing = client.query_graphql(LISTING_QUERY)?.map(|v| parse_listing(&v)).unwrap_or_default();

    match Self::new(&yaml, &listing) {
      Ok(extractor) => {
        debug!(exact = extractor.exact.len(), prefixes = extractor.prefixes.len(), "loaded label rules");
        Ok(extractor)
      }
      Err(e) => {
        warn!(error = %e, "unreadable GitHub bot configuration; core extensions get no labels");
        Ok(Self::default())
      }
    }
  }

  pub fn get_labels(&self, artifact_id: &str) -> Option<Vec<String>> {
    let name = artifact_id.replacen("quarkus-", "", 1);

    let labels = self.exact.get(&name).cloned().or_else(|| {
      self
        .prefixes
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix.as_str()))
        .map(|(_, labels)| labels.clone())
    });

    if labels.is_none() {
      warn!(artifact_id, "could not work out labels for extension");
    }

    labels
  }
}
