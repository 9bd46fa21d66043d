// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Count open issues for a repository (optionally filtered by label) and produce a browsable issues URL
// role: enrichment/issues
// inputs: RepositoryCoordinates; scm URL; artifact id; LabelExtractor; GithubClient; issue-count cache
// outputs: IssueInformation { issues, issues_url }
// invariants:
// - Labels are only looked up for extensions in the Quarkus core repository
// - A URL is kept unchecked only when the count is positive; otherwise it must resolve and not land on /pulls
// - 429 answers while probing are retried with the URL probe policy
// - Only answers carrying a count are cached; unavailable counts are asked for again next time
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::cache::PersistableCache;
use crate::enrichment::labels::LabelExtractor;
use crate::ext::serde_json::JsonFetch;
use crate::github::client::GithubClient;
use crate::github::pagination::PaginationError;
use crate::github::transport::Probe;
use crate::model::{IssueInformation, RepositoryCoordinates};
use crate::retry::{Attempt, RetryOutcome, RetryPolicy};

pub const QUARKUS_CORE_SCM_URL: &str = "https://github.com/quarkusio/quarkus";

pub type IssueCache = PersistableCache<IssueInformation>;

static RE_DOUBLE_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^:/])/{2,}").unwrap());

/// Collapse doubled slashes outside the scheme and upgrade plain-http GitHub links.
pub fn normalise_url(url: &str) -> String {
  RE_DOUBLE_SLASH
    .replace_all(url, "$1/")
    .replacen("http://github.com", "https://github.com", 1)
}

pub fn issues_url(scm_url: &str, labels: Option<&[String]>) -> String {
  let plain = normalise_url(&format!("{}/issues", scm_url).replacen(".git/issues", "/issues", 1));

  let Some(labels) = labels else {
    return plain;
  };

  let search = format!("is:open is:issue label:{}", labels.join(","));
  match Url::parse_with_params(&plain, &[("q", search.as_str())]) {
    Ok(url) => url.as_str().to_string(),
    Err(e) => {
      warn!(url = %plain, error = %e, "cannot build label search url; linking all issues");
      plain
    }
  }
}

pub fn issue_count_query(coords: &RepositoryCoordinates, labels: Option<&[String]>) -> String {
  let filter = labels
    .map(|labels| {
      let quoted = labels.iter().map(|l| format!("\"{}\"", l)).collect::<Vec<_>>().join(",");
      format!(", filterBy: {{ labels: [{}] }}", quoted)
    })
    .unwrap_or_default();

  format!(
    r#"query {{
  repository(owner: "{}", name: "{}") {{
    issues(states: OPEN{}) {{
      totalCount
    }}
  }}
}}"#,
    coords.owner, coords.name, filter
  )
}

pub struct IssueCounter<'a> {
  pub client: &'a GithubClient,
  pub cache: &'a IssueCache,
  pub labels: &'a LabelExtractor,
}

impl<'a> IssueCounter<'a> {
  pub fn get_issue_information(
    &self,
    coords: &RepositoryCoordinates,
    artifact_id: Option<&str>,
    scm_url: &str,
  ) -> Result<IssueInformation, PaginationError> {
    let key = format!("{}:{}", coords.cache_key(), artifact_id.unwrap_or_default());
    if let Some(hit) = self.cache.get(&key) {
      return Ok(hit);
    }

    let labels = match artifact_id {
      Some(id) if scm_url == QUARKUS_CORE_SCM_URL => self.labels.get_labels(id),
      _ => None,
    };

    let url = issues_url(scm_url, labels.as_deref());
    let body = self.client.query_graphql(&issue_count_query(coords, labels.as_deref()))?;
    let issues = body.and_then(|b| b.fetch("data.repository.issues.totalCount").to::<u64>());

    let info = IssueInformation {
      issues,
      issues_url: self.checked_url(issues, url),
    };

    if info.issues.is_some() {
      self.cache.set(&key, info.clone());
    } else {
      debug!(key = %key, "issue count unavailable; nothing cached");
    }

    Ok(info)
  }

  fn checked_url(&self, issues: Option<u64>, url: String) -> Option<String> {
    if issues.unwrap_or(0) > 0 {
      return Some(url);
    }

    debug!(url = %url, ?issues, "validating issues url");

    let probe = self.probe_with_retry(&url)?;
    let exists = (200..400).contains(&probe.status);
    let redirected_to_pulls = probe.final_url.contains("/pulls");

    if exists && !redirected_to_pulls {
      Some(url)
    } else {
      debug!(url = %url, status = probe.status, final_url = %probe.final_url, "dropping issues url");
      None
    }
  }

  fn probe_with_retry(&self, url: &str) -> Option<Probe> {
    let outcome = RetryPolicy::URL_PROBE.run(self.client.sleeper(), |attempt| match self.client.probe_url(url) {
      None => Attempt::Abort(format!("could not reach {}", url)),
      Some(p) if p.status == 429 => Attempt::Retry(format!("Issues URL reports 429 on attempt {}", attempt)),
      Some(p) => Attempt::Done(p),
    });

    match outcome {
      RetryOutcome::Success(p) => Some(p),
      RetryOutcome::Aborted(reason) | RetryOutcome::Exhausted(reason) => {
        warn!("{}", reason);
        None
      }
    }
  }
}
