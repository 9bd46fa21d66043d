// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Tolerant GitHub client: token-gated fetches with retry, rate-limit waits, and GraphQL pagination
// role: github/client
// inputs: Transport, optional token, RetryPolicy, Clock, Sleeper
// outputs: Parsed JSON (GraphQL/REST) or raw text, or None when enrichment is unavailable
// side_effects: Network calls via the transport; sleeps via the Sleeper on backoff and rate limits
// invariants:
// - No token ⇒ warn and return None without issuing a request
// - Bodies carrying `errors` or `message` are treated as unavailable
// - A body mentioning "Parse error" is never retried
// - The last seen rateLimit.resetAt is remembered per client and honoured when a body says RATE_LIMITED
// - A paginated query yields all pages spliced in order, or None if any page is lost
// errors: Swallowed into warnings, except PaginationError for queries with several connections
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cell::Cell;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clock::{self, Clock, Sleeper};
use crate::ext::serde_json::JsonFetch;
use crate::github::pagination::{self, PaginationError};
use crate::github::transport::{HttpRequest, Method, Transport};
use crate::retry::{Attempt, RetryOutcome, RetryPolicy};

pub const GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const REST_BASE_URL: &str = "https://api.github.com/";
const RAW_HOST: &str = "raw.githubusercontent.com";

static RE_DOUBLE_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/{2,}").unwrap());

/// How a response body is read before it is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contents {
  Json,
  Text,
}

pub struct GithubClient {
  transport: Box<dyn Transport>,
  token: Option<String>,
  policy: RetryPolicy,
  clock: Arc<dyn Clock>,
  sleeper: Box<dyn Sleeper>,
  reset_at: Cell<Option<DateTime<Utc>>>,
}

/// Parse errors are the caller's fault; anything else may succeed on a later attempt.
pub fn is_recoverable_error(message: &str) -> bool {
  !message.contains("Parse error")
}

impl GithubClient {
  pub fn new(
    transport: Box<dyn Transport>,
    token: Option<String>,
    clock: Arc<dyn Clock>,
    sleeper: Box<dyn Sleeper>,
  ) -> Self {
    Self {
      transport,
      token,
      policy: RetryPolicy::GITHUB_FETCH,
      clock,
      sleeper,
      reset_at: Cell::new(None),
    }
  }

  pub fn has_token(&self) -> bool {
    self.token.is_some()
  }

  pub fn clock(&self) -> Arc<dyn Clock> {
    self.clock.clone()
  }

  pub fn sleeper(&self) -> &dyn Sleeper {
    self.sleeper.as_ref()
  }

  #[cfg(test)]
  pub fn last_reset_at(&self) -> Option<DateTime<Utc>> {
    self.reset_at.get()
  }

  fn remember_reset_time(&self, body: &Value) {
    let reset = body
      .fetch("data.rateLimit.resetAt")
      .to::<String>()
      .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
      .map(|d| d.with_timezone(&Utc));

    if let Some(r) = reset {
      self.reset_at.set(Some(r));
    }
  }

  fn decode(body: &str, contents: Contents) -> Value {
    match contents {
      Contents::Json => serde_json::from_str(body).unwrap_or(Value::Null),
      Contents::Text => Value::String(body.to_string()),
    }
  }

  /// Fetch with retries; `None` means the information is unavailable for now.
  pub fn tolerant_fetch(
    &self,
    method: Method,
    url: &str,
    body: Option<String>,
    is_successful: &dyn Fn(&Value) -> bool,
    contents: Contents,
  ) -> Option<Value> {
    let Some(token) = self.token.as_ref() else {
      warn!("Cannot read GitHub information, because the environment variable `GITHUB_TOKEN` has not been set.");
      return None;
    };

    let request = HttpRequest {
      method,
      url: url.to_string(),
      body,
      token: token.clone(),
    };

    let outcome = self.policy.run(self.sleeper.as_ref(), |attempt| {
      let response = match self.transport.send(&request) {
        Ok(r) => r,
        Err(e) => return Attempt::Retry(e.to_string()),
      };

      let parsed = Self::decode(&response.body, contents);
      self.remember_reset_time(&parsed);

      if is_successful(&parsed) {
        return Attempt::Done(parsed);
      }

      let message = format!("Unsuccessful GitHub fetch for {} - response is {}", url, parsed);

      if !is_recoverable_error(&message) {
        return Attempt::Abort(message);
      }

      if message.contains("RATE_LIMITED") {
        if let Some(reset) = self.reset_at.get() {
          let wait = clock::until(self.clock.now(), reset);
          debug!(attempt, wait_secs = wait.as_secs(), "rate limited; waiting for reset");
          self.sleeper.sleep(wait);
        }
      }

      Attempt::Retry(message)
    });

    let body = match outcome {
      RetryOutcome::Success(v) => v,
      RetryOutcome::Aborted(reason) => {
        warn!("{}", reason);
        return None;
      }
      RetryOutcome::Exhausted(reason) => {
        warn!("Giving up after retries: {}", reason);
        return None;
      }
    };

    if body.get("errors").is_some() || body.get("message").is_some() {
      warn!("Could not get GitHub information for {} - response is {}", url, body);
      return None;
    }

    Some(body)
  }

  fn fetch_graphql_page(&self, query: &str) -> Option<Value> {
    let payload = serde_json::json!({ "query": query }).to_string();
    let has_data = |v: &Value| v.get("data").map(|d| !d.is_null()).unwrap_or(false);

    self.tolerant_fetch(Method::Post, GRAPHQL_URL, Some(payload), &has_data, Contents::Json)
  }

  /// Run a GraphQL query, following cursor pagination of its single connection.
  pub fn query_graphql(&self, query: &str) -> Result<Option<Value>, PaginationError> {
    let query = pagination::add_page_info(query)?;

    Ok(self.fetch_graphql_page(&query).and_then(|body| self.follow_pages(&query, body)))
  }

  fn follow_pages(&self, query: &str, mut body: Value) -> Option<Value> {
    let Some(info) = pagination::locate_page_info(&body) else {
      return Some(body);
    };

    if !info.has_next_page {
      return Some(body);
    }

    let (Some(field), Some(cursor)) = (info.field(), info.end_cursor.as_deref()) else {
      warn!("Paginated response has no cursor; discarding partial results");
      return None;
    };

    let Some(next_query) = pagination::set_after_cursor(query, field, cursor) else {
      warn!(field, "Could not place pagination cursor in query; discarding partial results");
      return None;
    };

    let next = self.fetch_graphql_page(&next_query)?;
    let next = self.follow_pages(&next_query, next)?;
    let more = next
      .fetch_path(&info.edges_path())
      .to::<Vec<Value>>()
      .unwrap_or_default();

    if !pagination::splice_edges(&mut body, &info.edges_path(), more) {
      warn!(field, "Paginated response has no edges to extend; discarding partial results");
      return None;
    }

    Some(body)
  }

  pub fn query_rest(&self, path: &str) -> Option<Value> {
    let url = format!("{}{}", REST_BASE_URL, path);
    let present = |v: &Value| !v.is_null();

    self.tolerant_fetch(Method::Get, &url, None, &present, Contents::Json)
  }

  /// Raw text of `path` on the main branch of `org/repo`.
  pub fn get_raw_file_contents(&self, org: &str, repo: &str, path: &str) -> Option<String> {
    let full_path = format!("{}/{}/{}/main/{}", RAW_HOST, org, repo, path);
    let url = format!("https://{}", RE_DOUBLE_SLASH.replace_all(&full_path, "/"));
    let present = |v: &Value| v.as_str().map(|s| !s.is_empty()).unwrap_or(false);

    self
      .tolerant_fetch(Method::Get, &url, None, &present, Contents::Text)
      .and_then(|v| v.as_str().map(str::to_string))
  }

  /// Status and final location of `url`, or `None` when it cannot be reached.
  pub fn probe_url(&self, url: &str) -> Option<crate::github::transport::Probe> {
    match self.transport.probe(url) {
      Ok(p) => Some(p),
      Err(e) => {
        debug!(error = %e, "url probe failed");
        None
      }
    }
  }
}
