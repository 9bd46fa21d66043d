// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: HTTP seam for GitHub access: a ureq-backed transport, an env-fixture transport for tests, and token discovery
// role: github/transport
// inputs: HttpRequest (method, url, body, token); env GITHUB_TOKEN/GH_TOKEN; optional `gh` CLI; EXT_TEST_* fixtures
// outputs: HttpResponse (status, body text) and Probe (status, final url after redirects)
// side_effects: Network calls to api.github.com and raw.githubusercontent.com; spawns `gh` when no env token
// invariants:
// - Non-2xx statuses are responses, not transport errors (their bodies carry GitHub's error JSON)
// - Fixture transport is selected whenever any EXT_TEST_* variable is present
// - Real requests are bounded by connect and read timeouts
// errors: TransportError only for connection-level failures
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const USER_AGENT: &str = "extension-enricher";

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_GRAPHQL: &str = "EXT_TEST_GRAPHQL_JSON";
const ENV_REST: &str = "EXT_TEST_REST_JSON";
const ENV_RAW: &str = "EXT_TEST_RAW_JSON";
const ENV_PROBE: &str = "EXT_TEST_PROBE_JSON";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
  pub method: Method,
  pub url: String,
  pub body: Option<String>,
  pub token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
  pub status: u16,
  pub final_url: String,
}

#[derive(Error, Debug)]
#[error("transport failure for {url}: {reason}")]
pub struct TransportError {
  pub url: String,
  pub reason: String,
}

pub trait Transport {
  fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

  /// Follow redirects for `url` and report where they end.
  fn probe(&self, url: &str) -> Result<Probe, TransportError>;
}

/// Discover a GitHub token: env vars first, then `gh auth token` if available.
pub fn get_github_token() -> Option<String> {
  for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
    if let Ok(t) = std::env::var(var) {
      if !t.trim().is_empty() {
        return Some(t);
      }
    }
  }

  if let Ok(output) = std::process::Command::new("gh").args(["auth", "token"]).output() {
    if output.status.success() {
      let t = String::from_utf8_lossy(&output.stdout).trim().to_string();

      if !t.is_empty() {
        return Some(t);
      }
    }
  }

  None
}

pub struct HttpTransport {
  agent: ureq::Agent,
}

impl HttpTransport {
  pub fn new() -> Self {
    Self::with_timeouts(CONNECT_TIMEOUT, READ_TIMEOUT)
  }

  pub fn with_timeouts(connect: Duration, read: Duration) -> Self {
    Self {
      agent: ureq::AgentBuilder::new()
        .user_agent(USER_AGENT)
        .timeout_connect(connect)
        .timeout_read(read)
        .build(),
    }
  }
}

impl Default for HttpTransport {
  fn default() -> Self {
    Self::new()
  }
}

impl Transport for HttpTransport {
  fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    let builder = match request.method {
      Method::Get => self.agent.get(&request.url),
      Method::Post => self.agent.post(&request.url),
    }
    .set("Accept", "application/vnd.github+json")
    .set("Authorization", &format!("Bearer {}", request.token));

    let result = match &request.body {
      Some(body) => builder.set("Content-Type", "application/json").send_string(body),
      None => builder.call(),
    };

    let resp = match result {
      Ok(r) => r,
      Err(ureq::Error::Status(_, r)) => r,
      Err(ureq::Error::Transport(t)) => {
        return Err(TransportError {
          url: request.url.clone(),
          reason: t.to_string(),
        })
      }
    };

    let status = resp.status();
    let body = resp.into_string().map_err(|e| TransportError {
      url: request.url.clone(),
      reason: e.to_string(),
    })?;

    Ok(HttpResponse { status, body })
  }

  fn probe(&self, url: &str) -> Result<Probe, TransportError> {
    match self.agent.get(url).call() {
      Ok(r) => Ok(Probe {
        status: r.status(),
        final_url: r.get_url().to_string(),
      }),
      Err(ureq::Error::Status(code, r)) => Ok(Probe {
        status: code,
        final_url: r.get_url().to_string(),
      }),
      Err(ureq::Error::Transport(t)) => Err(TransportError {
        url: url.to_string(),
        reason: t.to_string(),
      }),
    }
  }
}

/// Transport answering from JSON fixtures held in environment variables.
///
/// - `EXT_TEST_GRAPHQL_JSON`: object mapping a query substring to a response; first match in key order wins
/// - `EXT_TEST_REST_JSON`: object mapping an api.github.com path (case-insensitive) to a response
/// - `EXT_TEST_RAW_JSON`: object mapping `org/repo/path` to raw text
/// - `EXT_TEST_PROBE_JSON`: object mapping a url to `{status, final_url}`; default is 200 at the same url
pub struct EnvTransport;

impl EnvTransport {
  fn fixture_map(var: &str) -> serde_json::Map<String, Value> {
    std::env::var(var)
      .ok()
      .and_then(|s| serde_json::from_str::<Value>(&s).ok())
      .and_then(|v| v.as_object().cloned())
      .unwrap_or_default()
  }

  fn graphql(&self, body: &str) -> HttpResponse {
    let query = serde_json::from_str::<Value>(body)
      .ok()
      .and_then(|v| v.get("query").and_then(|q| q.as_str()).map(str::to_string))
      .unwrap_or_default();

    let matched = Self::fixture_map(ENV_GRAPHQL)
      .into_iter()
      .find(|(needle, _)| query.contains(needle.as_str()))
      .map(|(_, v)| v);

    match matched {
      Some(v) => HttpResponse {
        status: 200,
        body: v.to_string(),
      },
      None => HttpResponse {
        status: 200,
        body: serde_json::json!({ "errors": [{ "message": "Parse error: no fixture for query" }] }).to_string(),
      },
    }
  }

  fn rest(&self, path: &str) -> HttpResponse {
    let map = Self::fixture_map(ENV_REST);
    let found = map
      .get(path)
      .or_else(|| map.get(&path.to_lowercase()))
      .or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(path)).map(|(_, v)| v));

    match found {
      Some(v) => HttpResponse {
        status: 200,
        body: v.to_string(),
      },
      None => HttpResponse {
        status: 404,
        body: serde_json::json!({ "message": "Not Found" }).to_string(),
      },
    }
  }

  fn raw(&self, path: &str) -> HttpResponse {
    match Self::fixture_map(ENV_RAW).get(path).and_then(|v| v.as_str()) {
      Some(text) => HttpResponse {
        status: 200,
        body: text.to_string(),
      },
      None => HttpResponse {
        status: 404,
        body: "404: Not Found".to_string(),
      },
    }
  }
}

impl Transport for EnvTransport {
  fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    if let Some(path) = request.url.strip_prefix("https://raw.githubusercontent.com/") {
      return Ok(self.raw(path));
    }

    if request.url == super::client::GRAPHQL_URL {
      return Ok(self.graphql(request.body.as_deref().unwrap_or_default()));
    }

    match request.url.strip_prefix(super::client::REST_BASE_URL) {
      Some(path) => Ok(self.rest(path)),
      None => Err(TransportError {
        url: request.url.clone(),
        reason: "no fixture route".into(),
      }),
    }
  }

  fn probe(&self, url: &str) -> Result<Probe, TransportError> {
    let map = Self::fixture_map(ENV_PROBE);
    let Some(entry) = map.get(url) else {
      return Ok(Probe {
        status: 200,
        final_url: url.to_string(),
      });
    };

    Ok(Probe {
      status: entry.get("status").and_then(|s| s.as_u64()).unwrap_or(200) as u16,
      final_url: entry
        .get("final_url")
        .and_then(|s| s.as_str())
        .unwrap_or(url)
        .to_string(),
    })
  }
}

pub fn env_wants_fixtures() -> bool {
  [ENV_GRAPHQL, ENV_REST, ENV_RAW, ENV_PROBE]
    .iter()
    .any(|var| std::env::var(var).is_ok())
}

pub fn build_transport() -> Box<dyn Transport> {
  if env_wants_fixtures() {
    Box::new(EnvTransport)
  } else {
    Box::new(HttpTransport::new())
  }
}

/// In-memory transport that replays queued responses and records requests.
#[cfg(test)]
pub mod scripted {
  use super::*;
  use std::cell::RefCell;
  use std::collections::VecDeque;
  use std::rc::Rc;

  #[derive(Clone, Default)]
  pub struct ScriptedTransport {
    pub responses: Rc<RefCell<VecDeque<Result<HttpResponse, TransportError>>>>,
    pub probes: Rc<RefCell<VecDeque<Probe>>>,
    pub requests: Rc<RefCell<Vec<HttpRequest>>>,
  }

  impl ScriptedTransport {
    pub fn push_json(&self, v: Value) -> &Self {
      self.responses.borrow_mut().push_back(Ok(HttpResponse {
        status: 200,
        body: v.to_string(),
      }));
      self
    }

    pub fn push_text(&self, text: &str) -> &Self {
      self.responses.borrow_mut().push_back(Ok(HttpResponse {
        status: 200,
        body: text.to_string(),
      }));
      self
    }

    pub fn push_failure(&self) -> &Self {
      self.responses.borrow_mut().push_back(Err(TransportError {
        url: "scripted".into(),
        reason: "connection reset".into(),
      }));
      self
    }

    pub fn push_probe(&self, status: u16, final_url: &str) -> &Self {
      self.probes.borrow_mut().push_back(Probe {
        status,
        final_url: final_url.to_string(),
      });
      self
    }

    pub fn request_count(&self) -> usize {
      self.requests.borrow().len()
    }

    /// The GraphQL query text of the nth request.
    pub fn query_of(&self, n: usize) -> String {
      let requests = self.requests.borrow();
      let body = requests[n].body.clone().unwrap_or_default();
      let v: Value = serde_json::from_str(&body).unwrap();
      v["query"].as_str().unwrap().to_string()
    }
  }

  impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
      self.requests.borrow_mut().push(request.clone());
      self.responses.borrow_mut().pop_front().unwrap_or_else(|| {
        Ok(HttpResponse {
          status: 200,
          body: "null".into(),
        })
      })
    }

    fn probe(&self, url: &str) -> Result<Probe, TransportError> {
      Ok(self.probes.borrow_mut().pop_front().unwrap_or(Probe {
        status: 200,
        final_url: url.to_string(),
      }))
    }
  }
}
