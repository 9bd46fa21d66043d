// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Navigate GraphQL/REST responses held as serde_json::Value: dotted fetch, key-path fetch, and key search
// role: extension/serde_json
// outputs: JsonFetch trait and JsonFetched wrapper for typed extraction with defaults
// invariants: No panics; missing paths yield None; find_key_path searches objects depth-first in key order and skips arrays
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Wrapper around a JSON location to allow typed extraction via a clear second step.
pub struct JsonFetched<'a> {
  inner: Option<&'a Value>,
}

impl<'a> JsonFetched<'a> {
  /// Attempt to deserialize the fetched value as `T`.
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self.inner.and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
  }

  pub fn value(&self) -> Option<&'a Value> {
    self.inner
  }
}

pub trait JsonFetch {
  /// Fetch a nested value via a dotted path like "author.user.login".
  fn fetch(&self, path: &str) -> JsonFetched<'_>;

  /// Fetch a nested value via explicit key segments (keys may contain dots).
  fn fetch_path(&self, path: &[String]) -> JsonFetched<'_>;

  fn fetch_path_mut(&mut self, path: &[String]) -> Option<&mut Value>;

  /// Path of keys to the first object that directly holds `key`.
  fn find_key_path(&self, key: &str) -> Option<Vec<String>>;
}

impl JsonFetch for Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;

    for key in path.split('.') {
      match cur.get(key) {
        Some(next) => cur = next,
        None => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }

  fn fetch_path(&self, path: &[String]) -> JsonFetched<'_> {
    let mut cur = self;

    for key in path {
      match cur.get(key.as_str()) {
        Some(next) => cur = next,
        None => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }

  fn fetch_path_mut(&mut self, path: &[String]) -> Option<&mut Value> {
    let mut cur = self;

    for key in path {
      cur = cur.get_mut(key.as_str())?;
    }

    Some(cur)
  }

  fn find_key_path(&self, key: &str) -> Option<Vec<String>> {
    let obj = self.as_object()?;

    if obj.contains_key(key) {
      return Some(Vec::new());
    }

    for (k, child) in obj {
      if let Some(mut rest) = child.find_key_path(key) {
        rest.insert(0, k.clone());
        return Some(rest);
      }
    }

    None
  }
}
