// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Collect a repository's commit authors over a trailing window and fold them into per-login contributors
// role: enrichment/contributors
// inputs: RepositoryCoordinates; GithubClient; contributors cache; lookback window; Clock
// outputs: Vec<Contributor> sorted by contributions (desc, stable by first appearance)
// invariants:
// - Commits without a resolvable GitHub user are dropped
// - Bot logins (falsy, "[bot]", actions-user, quarkiversebot) never appear in the output
// - Results are cached per owner:name, including "unavailable"
// errors: PaginationError only; fetch failures become None
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::PersistableCache;
use crate::ext::serde_json::JsonFetch;
use crate::github::client::GithubClient;
use crate::github::pagination::PaginationError;
use crate::model::{Contributor, RepositoryCoordinates};

pub const DEFAULT_LOOKBACK_DAYS: i64 = 180;

const EXCLUDED_LOGINS: [&str; 2] = ["actions-user", "quarkiversebot"];

/// Only real answers are stored, an empty history included; failed lookups are retried next time.
pub type ContributorCache = PersistableCache<Vec<Contributor>>;

#[derive(Debug, Error)]
enum LookupError {
  #[error("contributor history is unavailable")]
  Unavailable,
  #[error(transparent)]
  Pagination(#[from] PaginationError),
}

/// Case-sensitive on purpose: the exclusion list holds exact GitHub logins.
pub fn is_bot(login: Option<&str>) -> bool {
  match login {
    None => true,
    Some(l) => l.is_empty() || l.contains("[bot]") || EXCLUDED_LOGINS.contains(&l),
  }
}

pub fn history_query(coords: &RepositoryCoordinates, since: DateTime<Utc>) -> String {
  format!(
    r#"query {{
  repository(owner: "{owner}", name: "{name}") {{
    defaultBranchRef {{
      target {{
        ... on Commit {{
          history(first: 100, since: "{since}") {{
            edges {{
              node {{
                ... on Commit {{
                  author {{
                    user {{
                      login
                      name
                      company
                      url
                    }}
                  }}
                }}
              }}
            }}
          }}
        }}
      }}
    }}
  }}
  rateLimit {{
    limit
    cost
    remaining
    resetAt
  }}
}}"#,
    owner = coords.owner,
    name = coords.name,
    since = since.to_rfc3339_opts(SecondsFormat::Millis, true),
  )
}

/// Fold commit edges into one contributor per login.
pub fn collate_history(response: &Value) -> Vec<Contributor> {
  let edges = response
    .fetch("data.repository.defaultBranchRef.target.history.edges")
    .to::<Vec<Value>>()
    .unwrap_or_default();

  let mut order: Vec<String> = Vec::new();
  let mut by_login: HashMap<String, Contributor> = HashMap::new();

  for edge in &edges {
    let user = edge.fetch("node.author.user");
    let login = user.value().and_then(|u| u.get("login")).and_then(Value::as_str);

    if is_bot(login) {
      continue;
    }
    let Some(login) = login else { continue };

    match by_login.get_mut(login) {
      Some(existing) => existing.contributions += 1,
      None => {
        let text = |field: &str| {
          user
            .value()
            .and_then(|u| u.get(field))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
        };
        order.push(login.to_string());
        by_login.insert(
          login.to_string(),
          Contributor {
            login: login.to_string(),
            name: text("name"),
            company: text("company"),
            url: text("url"),
            contributions: 1,
          },
        );
      }
    }
  }

  let mut out: Vec<Contributor> = order.into_iter().filter_map(|l| by_login.remove(&l)).collect();
  out.sort_by(|a, b| b.contributions.cmp(&a.contributions));

  out
}

pub struct ContributorAggregator<'a> {
  pub client: &'a GithubClient,
  pub cache: &'a ContributorCache,
  pub lookback_days: i64,
}

impl<'a> ContributorAggregator<'a> {
  pub fn get_contributors(&self, coords: &RepositoryCoordinates) -> Result<Option<Vec<Contributor>>, PaginationError> {
    let fetched: Result<Vec<Contributor>, LookupError> = self.cache.try_get_or_set(&coords.cache_key(), || {
      let since = self.window_start().ok_or(LookupError::Unavailable)?;
      let response = self
        .client
        .query_graphql(&history_query(coords, since))?
        .ok_or(LookupError::Unavailable)?;
      let contributors = collate_history(&response);

      debug!(repo = %coords.cache_key(), count = contributors.len(), "collated contributors");

      Ok(contributors)
    });

    match fetched {
      Ok(contributors) => Ok(Some(contributors)),
      Err(LookupError::Unavailable) => {
        debug!(repo = %coords.cache_key(), "contributors unavailable; nothing cached");
        Ok(None)
      }
      Err(LookupError::Pagination(e)) => Err(e),
    }
  }

  fn window_start(&self) -> Option<DateTime<Utc>> {
    let start = chrono::Duration::try_days(self.lookback_days)
      .and_then(|window| self.client.clock().now().checked_sub_signed(window));
    if start.is_none() {
      warn!(lookback_days = self.lookback_days, "lookback window is out of range");
    }

    start
  }
}
