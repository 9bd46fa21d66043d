// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Key/value cache with per-entry expiry that can be dumped to and re-ingested from disk between runs
// role: storage/cache
// inputs: CacheOptions (key, ttl, jitter, dir); injected Clock
// outputs: Cached values; dumps as ordered {key, value, ts} lists; <dir>/<key>.json files
// side_effects: persist() writes a file; ready() reads one
// invariants:
// - Expired entries behave as absent for get/has/dump/size; get evicts what it finds expired
// - ingest_dump preserves each entry's original ts (never resets TTL)
// - persist() without a key is an error; ready() without a key is a no-op
// errors: CacheError for missing key, io and serde failures; unreadable dumps are warned about and ignored
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};

#[derive(Error, Debug)]
pub enum CacheError {
  #[error("cannot persist cache: no key was configured")]
  MissingKey,
  #[error("cache io error for {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("cache serialization error: {0}")]
  Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct CacheOptions {
  /// Identity of the persisted dump; also its file stem.
  pub key: Option<String>,
  /// `None` keeps entries forever.
  pub ttl: Option<chrono::Duration>,
  pub jitter_ratio: f64,
  pub dir: PathBuf,
}

impl Default for CacheOptions {
  fn default() -> Self {
    Self {
      key: None,
      ttl: None,
      jitter_ratio: 0.0,
      dir: PathBuf::from(".cache"),
    }
  }
}

/// One dumped entry; `ts` is the expiry instant in epoch milliseconds (0 = never).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
  pub key: String,
  pub value: V,
  pub ts: i64,
}

/// Lets moka drop entries once their `ts` passes on the injected clock.
struct ExpireAtTs {
  clock: Arc<dyn Clock>,
}

impl ExpireAtTs {
  fn remaining(&self, ts: i64) -> Option<Duration> {
    if ts == 0 {
      return None;
    }
    let left = ts.saturating_sub(self.clock.now_millis()).max(0);
    Some(Duration::from_millis(left as u64))
  }
}

impl<V> Expiry<String, (V, i64)> for ExpireAtTs {
  fn expire_after_create(&self, _key: &String, value: &(V, i64), _created_at: Instant) -> Option<Duration> {
    self.remaining(value.1)
  }

  fn expire_after_update(
    &self,
    _key: &String,
    value: &(V, i64),
    _updated_at: Instant,
    _duration_until_expiry: Option<Duration>,
  ) -> Option<Duration> {
    self.remaining(value.1)
  }
}

pub struct PersistableCache<V> {
  options: CacheOptions,
  clock: Arc<dyn Clock>,
  entries: Cache<String, (V, i64)>,
}

impl<V> PersistableCache<V>
where
  V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
  pub fn new(options: CacheOptions) -> Self {
    Self::with_clock(options, Arc::new(SystemClock))
  }

  pub fn with_clock(options: CacheOptions, clock: Arc<dyn Clock>) -> Self {
    let entries = Cache::builder()
      .expire_after(ExpireAtTs { clock: clock.clone() })
      .build();

    Self { options, clock, entries }
  }

  fn is_live(&self, ts: i64) -> bool {
    ts == 0 || ts > self.clock.now_millis()
  }

  fn expiry_for_new_entry(&self) -> i64 {
    let Some(ttl) = self.options.ttl else { return 0 };
    let ttl_ms = ttl.num_milliseconds() as f64;

    let jittered = if self.options.jitter_ratio > 0.0 {
      let r: f64 = rand::thread_rng().gen();
      ttl_ms + ttl_ms * self.options.jitter_ratio * (r - 0.5)
    } else {
      ttl_ms
    };

    self.clock.now_millis() + jittered.round() as i64
  }

  pub fn set(&self, key: &str, value: V) {
    let ts = self.expiry_for_new_entry();
    self.entries.insert(key.to_string(), (value, ts));
  }

  pub fn get(&self, key: &str) -> Option<V> {
    let (value, ts) = self.entries.get(key)?;

    if self.is_live(ts) {
      Some(value)
    } else {
      self.entries.invalidate(key);
      None
    }
  }

  #[allow(dead_code)]
  pub fn has(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  /// Return the cached value or compute, store and return it.
  ///
  /// Concurrent misses are not de-duplicated; the producer runs once per call that misses.
  pub fn get_or_set<F>(&self, key: &str, producer: F) -> V
  where
    F: FnOnce() -> V,
  {
    if let Some(v) = self.get(key) {
      return v;
    }
    let v = producer();
    self.set(key, v.clone());

    v
  }

  /// Like `get_or_set`, but producer errors propagate and are not cached.
  pub fn try_get_or_set<F, E>(&self, key: &str, producer: F) -> Result<V, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    if let Some(v) = self.get(key) {
      return Ok(v);
    }
    let v = producer()?;
    self.set(key, v.clone());

    Ok(v)
  }

  /// Live entries ordered by key.
  pub fn dump(&self) -> Vec<CacheEntry<V>> {
    let mut out: Vec<CacheEntry<V>> = self
      .entries
      .iter()
      .filter(|(_, (_, ts))| self.is_live(*ts))
      .map(|(key, (value, ts))| CacheEntry {
        key: key.as_ref().clone(),
        value,
        ts,
      })
      .collect();
    out.sort_by(|a, b| a.key.cmp(&b.key));

    out
  }

  pub fn ingest_dump(&self, dump: Vec<CacheEntry<V>>) {
    for entry in dump {
      if self.is_live(entry.ts) {
        self.entries.insert(entry.key, (entry.value, entry.ts));
      }
    }
  }

  pub fn size(&self) -> usize {
    self
      .entries
      .iter()
      .filter(|(_, (_, ts))| self.is_live(*ts))
      .count()
  }

  pub fn flush_all(&self) {
    let keys: Vec<Arc<String>> = self.entries.iter().map(|(k, _)| k).collect();
    for key in keys {
      self.entries.invalidate(key.as_ref());
    }
  }

  fn backing_path(&self) -> Option<PathBuf> {
    self
      .options
      .key
      .as_ref()
      .map(|k| self.options.dir.join(format!("{}.json", k)))
  }

  pub fn persist(&self) -> Result<(), CacheError> {
    let path = self.backing_path().ok_or(CacheError::MissingKey)?;
    let io_err = |source| CacheError::Io {
      path: path.display().to_string(),
      source,
    };

    std::fs::create_dir_all(&self.options.dir).map_err(io_err)?;
    let bytes = serde_json::to_vec_pretty(&self.dump())?;
    std::fs::write(&path, bytes).map_err(io_err)?;
    debug!(path = %path.display(), entries = self.size(), "persisted cache");

    Ok(())
  }

  /// Load the persisted dump for this cache's key, if any.
  pub fn ready(&self) -> Result<(), CacheError> {
    let Some(path) = self.backing_path() else {
      return Ok(());
    };

    let bytes = match std::fs::read(&path) {
      Ok(b) => b,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
      Err(source) => {
        return Err(CacheError::Io {
          path: path.display().to_string(),
          source,
        })
      }
    };

    match serde_json::from_slice::<Vec<CacheEntry<V>>>(&bytes) {
      Ok(dump) => {
        self.ingest_dump(dump);
        debug!(path = %path.display(), entries = self.size(), "ingested cache dump");
      }
      Err(e) => warn!(path = %path.display(), error = %e, "ignoring unreadable cache dump"),
    }

    Ok(())
  }
}
