use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod cache;
mod cli;
mod clock;
mod context;
mod enrich;
mod enrichment;
mod ext;
mod github;
mod model;
mod retry;
mod util;

use crate::cli::{normalize, Cli};
use crate::clock::{Clock, ClockSleeper, ManualClock, Sleeper, SystemClock, ThreadSleeper};
use crate::context::{ContextOptions, EnrichmentContext};
use crate::enrichment::sponsors::SponsorThresholds;
use crate::github::client::GithubClient;
use crate::github::transport::{build_transport, get_github_token};

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  init_tracing();

  // Phase 1: normalize CLI
  let cfg = normalize(cli)?;
  debug!(config = %serde_json::to_string(&cfg)?, "effective config");

  // Phase 2: wire clock, client and caches
  let (clock, sleeper): (Arc<dyn Clock>, Box<dyn Sleeper>) = match cfg.now_override {
    Some(now) => {
      let manual = ManualClock::new(now);
      (Arc::new(manual.clone()), Box::new(ClockSleeper::new(manual)))
    }
    None => (Arc::new(SystemClock), Box::new(ThreadSleeper)),
  };
  let client = GithubClient::new(build_transport(), get_github_token(), clock, sleeper);
  if !client.has_token() && (cfg.sponsors || cfg.issues) {
    warn!("No GITHUB_TOKEN, GH_TOKEN or `gh auth token` found; GitHub data will be missing");
  }

  let options = ContextOptions {
    cache_dir: cfg.cache_dir.clone().into(),
    jitter_ratio: cfg.cache_jitter,
    lookback_days: cfg.lookback_days,
    thresholds: SponsorThresholds {
      minimum_contributor_count: cfg.minimum_contributor_count,
      minimum_contribution_percent: cfg.minimum_contribution_percent,
      minimum_contribution_count: cfg.minimum_contribution_count,
    },
    opt_in_repo: cfg.opt_in_repo.clone(),
    opt_in_path: cfg.opt_in_path.clone(),
    sponsors: cfg.sponsors,
    issues: cfg.issues,
  };
  let mut ctx = EnrichmentContext::new(client, options);
  ctx.init(enrich::needs_core_labels(&cfg.sources))?;
  if cfg.flush_cache {
    ctx.flush();
  }

  // Phase 3: enrich, emit, persist
  let enriched = enrich::enrich_all(&ctx, &cfg.sources)?;
  util::write_json(&cfg.out, &enriched)?;

  if cfg.persist {
    ctx.persist()?;
  }

  Ok(())
}
