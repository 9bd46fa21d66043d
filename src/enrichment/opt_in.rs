// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Load the allowlist of organisations that agreed to be named as sponsors
// role: enrichment/opt_in
// inputs: YAML document with a `named-sponsors` sequence, fetched as a raw file from a GitHub repository
// outputs: OptInList answering case-insensitive membership after company text normalisation
// invariants: An unavailable or unreadable allowlist is empty; nobody is named
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::enrichment::company::normalize_text;
use crate::github::client::GithubClient;

pub const DEFAULT_OPT_IN_REPO: &str = "quarkusio/quarkus-extension-catalog";
pub const DEFAULT_OPT_IN_PATH: &str = "named-contributing-orgs-opt-in.yml";

#[derive(Debug, Default, Deserialize)]
struct OptInDocument {
  #[serde(rename = "named-sponsors", default)]
  named_sponsors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptInList {
  names: HashSet<String>,
}

fn match_key(name: &str) -> String {
  normalize_text(name).to_lowercase()
}

impl OptInList {
  pub fn from_names<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self {
      names: names
        .into_iter()
        .map(|n| match_key(n.as_ref()))
        .filter(|n| !n.is_empty())
        .collect(),
    }
  }

  pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
    let doc: Option<OptInDocument> = serde_yaml::from_str(text)?;
    Ok(Self::from_names(doc.unwrap_or_default().named_sponsors))
  }

  /// Fetch `path` from the main branch of `repo` (`org/name`).
  pub fn fetch(client: &GithubClient, repo: &str, path: &str) -> Self {
    let Some((org, name)) = repo.split_once('/') else {
      warn!(repo, "opt-in repository should look like org/name; nobody will be named");
      return Self::default();
    };

    let Some(text) = client.get_raw_file_contents(org, name, path) else {
      warn!(repo, path, "could not fetch the sponsor opt-in list; nobody will be named");
      return Self::default();
    };

    match Self::from_yaml(&text) {
      Ok(list) if list.is_empty() => {
        warn!(repo, path, "sponsor opt-in list is empty; nobody will be named");
        list
      }
      Ok(list) => {
        debug!(count = list.len(), "loaded sponsor opt-in list");
        list
      }
      Err(e) => {
        warn!(error = %e, "unreadable sponsor opt-in list; nobody will be named");
        Self::default()
      }
    }
  }

  pub fn allows(&self, company: &str) -> bool {
    self.names.contains(&match_key(company))
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}
