// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Command-line surface and its validation into an EffectiveConfig
// role: cli/config
// inputs: Process arguments via clap derive
// outputs: EffectiveConfig (serialisable) consumed by main
// invariants:
// - At least one --scm-url unless --gen-man
// - --artifact-id values pair with --scm-url values by position and never outnumber them
// - Thresholds are finite and non-negative; jitter ratio lies in [0, 1]
// - Lookback lies in 1..=MAX_LOOKBACK_DAYS
// errors: Misconfiguration fails fast with a readable anyhow error
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::enrich::ExtensionSource;
use crate::enrichment::contributors::DEFAULT_LOOKBACK_DAYS;
use crate::enrichment::opt_in::{DEFAULT_OPT_IN_PATH, DEFAULT_OPT_IN_REPO};
use crate::util;

/// Upper bound for --lookback-days (a century).
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

#[derive(Parser, Debug)]
#[command(
    name = "extension-enricher",
    version,
    about = "Enrich extension catalog entries with GitHub sponsor, contributor and issue data",
    long_about = None
)]
pub struct Cli {
  /// Source-control URL of an extension (repeatable)
  #[arg(long = "scm-url", required_unless_present = "gen_man")]
  pub scm_urls: Vec<String>,

  /// Artifact id for the --scm-url in the same position (repeatable)
  #[arg(long = "artifact-id")]
  pub artifact_ids: Vec<String>,

  /// Output file path (default stdout "-")
  #[arg(long, default_value = "-")]
  pub out: String,

  /// Directory holding persisted cache dumps
  #[arg(long, default_value = ".cache")]
  pub cache_dir: PathBuf,

  /// Do not write caches back to disk at the end of the run
  #[arg(long)]
  pub no_persist: bool,

  /// Start from empty caches, ignoring anything persisted
  #[arg(long)]
  pub flush_cache: bool,

  /// Randomise cache expiry by this fraction of the TTL (0 disables)
  #[arg(long, default_value_t = 0.0)]
  pub cache_jitter: f64,

  /// Distinct contributors a company needs before it can be named
  #[arg(long, default_value_t = 2)]
  pub minimum_contributor_count: u64,

  /// Share of all commits (percent) a company needs before it can be named
  #[arg(long, default_value_t = 20.0)]
  pub minimum_contribution_percent: f64,

  /// Commits a single contributor needs before counting towards their company
  #[arg(long, default_value_t = 1)]
  pub minimum_contribution_count: u64,

  /// Days of commit history to consider
  #[arg(long, default_value_t = DEFAULT_LOOKBACK_DAYS)]
  pub lookback_days: i64,

  /// Repository (org/name) holding the sponsor opt-in list
  #[arg(long, default_value = DEFAULT_OPT_IN_REPO)]
  pub opt_in_repo: String,

  /// Path of the opt-in list inside --opt-in-repo
  #[arg(long, default_value = DEFAULT_OPT_IN_PATH)]
  pub opt_in_path: String,

  /// Skip contributor and sponsor enrichment
  #[arg(long)]
  pub skip_sponsors: bool,

  /// Skip issue counts and issue URLs
  #[arg(long)]
  pub skip_issues: bool,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant, RFC3339 (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EffectiveConfig {
  pub sources: Vec<ExtensionSource>,
  pub out: String,
  pub cache_dir: String, // absolute path for stability
  pub persist: bool,
  pub flush_cache: bool,
  pub cache_jitter: f64,
  pub minimum_contributor_count: u64,
  pub minimum_contribution_percent: f64,
  pub minimum_contribution_count: u64,
  pub lookback_days: i64,
  pub opt_in_repo: String,
  pub opt_in_path: String,
  pub sponsors: bool,
  pub issues: bool,
  pub now_override: Option<DateTime<Utc>>,
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  if cli.scm_urls.is_empty() {
    bail!("Provide at least one --scm-url");
  }
  if cli.artifact_ids.len() > cli.scm_urls.len() {
    bail!(
      "Got {} --artifact-id values for {} --scm-url values; artifact ids pair with URLs by position",
      cli.artifact_ids.len(),
      cli.scm_urls.len()
    );
  }
  if !(0.0..=1.0).contains(&cli.cache_jitter) {
    bail!("--cache-jitter must be between 0 and 1 (got {})", cli.cache_jitter);
  }
  if !(0.0..=100.0).contains(&cli.minimum_contribution_percent) {
    bail!(
      "--minimum-contribution-percent must be between 0 and 100 (got {})",
      cli.minimum_contribution_percent
    );
  }
  if !(1..=MAX_LOOKBACK_DAYS).contains(&cli.lookback_days) {
    bail!("--lookback-days must be between 1 and {} (got {})", MAX_LOOKBACK_DAYS, cli.lookback_days);
  }
  if !cli.opt_in_repo.contains('/') {
    bail!("--opt-in-repo should look like org/name (got {})", cli.opt_in_repo);
  }

  let now_override = match cli.now_override.as_deref() {
    None => None,
    Some(s) => match DateTime::parse_from_rfc3339(s) {
      Ok(t) => Some(t.with_timezone(&Utc)),
      Err(e) => bail!("--now-override must be an RFC3339 instant: {}", e),
    },
  };

  let mut artifact_ids = cli.artifact_ids.into_iter();
  let sources = cli
    .scm_urls
    .into_iter()
    .map(|url| ExtensionSource {
      scm_url: url.trim().to_string(),
      artifact_id: artifact_ids.next().filter(|a| !a.is_empty()),
    })
    .collect();

  Ok(EffectiveConfig {
    sources,
    out: cli.out,
    cache_dir: util::canonicalize_lossy(&cli.cache_dir),
    persist: !cli.no_persist,
    flush_cache: cli.flush_cache,
    cache_jitter: cli.cache_jitter,
    minimum_contributor_count: cli.minimum_contributor_count,
    minimum_contribution_percent: cli.minimum_contribution_percent,
    minimum_contribution_count: cli.minimum_contribution_count,
    lookback_days: cli.lookback_days,
    opt_in_repo: cli.opt_in_repo,
    opt_in_path: cli.opt_in_path,
    sponsors: !cli.skip_sponsors,
    issues: !cli.skip_issues,
    now_override,
  })
}
