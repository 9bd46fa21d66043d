// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Own everything one enrichment run shares: the GitHub client, the persistent caches, the opt-in list and label rules
// role: orchestration/context
// inputs: GithubClient; ContextOptions (cache dir, jitter, thresholds, opt-in location, stage toggles)
// outputs: Stage handles (SponsorFinder, IssueCounter) borrowing the shared state
// side_effects: init reads cache dumps and fetches the opt-in list / label rules; persist writes cache dumps
// invariants:
// - Each cache has a fixed key, which names its dump file under the cache dir
// - Caches share the client's clock, so expiry and rate-limit waits agree on "now"
// errors: init/persist surface CacheError with context; remote failures degrade inside the stages
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::cache::{CacheOptions, PersistableCache};
use crate::enrichment::company::CompanyCache;
use crate::enrichment::contributors::{ContributorCache, DEFAULT_LOOKBACK_DAYS};
use crate::enrichment::issues::{IssueCache, IssueCounter};
use crate::enrichment::labels::LabelExtractor;
use crate::enrichment::opt_in::{OptInList, DEFAULT_OPT_IN_PATH, DEFAULT_OPT_IN_REPO};
use crate::enrichment::sponsors::{SponsorFinder, SponsorThresholds};
use crate::github::client::GithubClient;

pub const CONTRIBUTORS_CACHE_KEY: &str = "contributors";
pub const COMPANIES_CACHE_KEY: &str = "companies";
pub const ISSUE_COUNT_CACHE_KEY: &str = "issue-counts";

#[derive(Debug, Clone)]
pub struct ContextOptions {
  pub cache_dir: PathBuf,
  pub jitter_ratio: f64,
  pub lookback_days: i64,
  pub thresholds: SponsorThresholds,
  pub opt_in_repo: String,
  pub opt_in_path: String,
  pub sponsors: bool,
  pub issues: bool,
}

impl Default for ContextOptions {
  fn default() -> Self {
    Self {
      cache_dir: PathBuf::from(".cache"),
      jitter_ratio: 0.0,
      lookback_days: DEFAULT_LOOKBACK_DAYS,
      thresholds: SponsorThresholds::default(),
      opt_in_repo: DEFAULT_OPT_IN_REPO.to_string(),
      opt_in_path: DEFAULT_OPT_IN_PATH.to_string(),
      sponsors: true,
      issues: true,
    }
  }
}

pub struct EnrichmentContext {
  client: GithubClient,
  options: ContextOptions,
  pub contributors: ContributorCache,
  pub companies: CompanyCache,
  pub issue_counts: IssueCache,
  opt_in: OptInList,
  labels: LabelExtractor,
}

impl EnrichmentContext {
  pub fn new(client: GithubClient, options: ContextOptions) -> Self {
    let cache_options = |key: &str, ttl: chrono::Duration| CacheOptions {
      key: Some(key.to_string()),
      ttl: Some(ttl),
      jitter_ratio: options.jitter_ratio,
      dir: options.cache_dir.clone(),
    };
    let clock = client.clock();

    let contributors = PersistableCache::with_clock(
      cache_options(CONTRIBUTORS_CACHE_KEY, chrono::Duration::days(2)),
      clock.clone(),
    );
    let companies = PersistableCache::with_clock(
      cache_options(COMPANIES_CACHE_KEY, chrono::Duration::hours(36)),
      clock.clone(),
    );
    let issue_counts = PersistableCache::with_clock(cache_options(ISSUE_COUNT_CACHE_KEY, chrono::Duration::days(1)), clock);

    Self {
      client,
      options,
      contributors,
      companies,
      issue_counts,
      opt_in: OptInList::default(),
      labels: LabelExtractor::default(),
    }
  }

  pub fn options(&self) -> &ContextOptions {
    &self.options
  }

  /// Load cache dumps, then the remote configuration the enabled stages need.
  pub fn init(&mut self, needs_labels: bool) -> Result<()> {
    self.contributors.ready().context("loading contributors cache")?;
    self.companies.ready().context("loading companies cache")?;
    self.issue_counts.ready().context("loading issue count cache")?;

    info!(
      contributors = self.contributors.size(),
      companies = self.companies.size(),
      issue_counts = self.issue_counts.size(),
      "caches ready"
    );

    if self.options.sponsors {
      self.opt_in = OptInList::fetch(&self.client, &self.options.opt_in_repo, &self.options.opt_in_path);
    }
    if self.options.issues && needs_labels {
      self.labels = LabelExtractor::fetch(&self.client).context("loading extension label rules")?;
    }

    Ok(())
  }

  pub fn flush(&self) {
    self.contributors.flush_all();
    self.companies.flush_all();
    self.issue_counts.flush_all();
  }

  pub fn persist(&self) -> Result<()> {
    self.contributors.persist().context("persisting contributors cache")?;
    self.companies.persist().context("persisting companies cache")?;
    self.issue_counts.persist().context("persisting issue count cache")?;

    Ok(())
  }

  pub fn sponsor_finder(&self) -> SponsorFinder<'_> {
    SponsorFinder::new(
      &self.client,
      &self.contributors,
      &self.companies,
      self.options.lookback_days,
      self.options.thresholds,
      self.opt_in.clone(),
    )
  }

  pub fn issue_counter(&self) -> IssueCounter<'_> {
    IssueCounter {
      client: &self.client,
      cache: &self.issue_counts,
      labels: &self.labels,
    }
  }
}
