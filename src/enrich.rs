// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Enrich each extension's source-control URL with owner, logo, sponsors, contributors and issue information
// role: orchestration/enrich
// inputs: ExtensionSource list (scm URL + optional artifact id); initialised EnrichmentContext
// outputs: Vec<RepositoryEnrichment> in input order
// invariants:
// - Non-GitHub URLs yield an entry carrying only `url`
// - `sponsor` is the first of `sponsors` whenever sponsors are present
// - Disabled stages leave their fields absent
// errors: PaginationError (programming error) propagates; every remote failure leaves fields absent
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::EnrichmentContext;
use crate::enrichment::issues::QUARKUS_CORE_SCM_URL;
use crate::model::{RepositoryCoordinates, RepositoryEnrichment};

static RE_GITHUB_URL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?:git@github\.com:|(?:https?|git)://(?:www\.)?github\.com/)([^/\s]+)/([^/\s]+?)(?:\.git)?/?$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionSource {
  pub scm_url: String,
  pub artifact_id: Option<String>,
}

pub fn parse_scm_url(url: &str) -> Option<RepositoryCoordinates> {
  let caps = RE_GITHUB_URL.captures(url.trim())?;

  Some(RepositoryCoordinates {
    owner: caps.get(1)?.as_str().to_string(),
    name: caps.get(2)?.as_str().to_string(),
  })
}

pub fn needs_core_labels(sources: &[ExtensionSource]) -> bool {
  sources.iter().any(|s| s.scm_url == QUARKUS_CORE_SCM_URL && s.artifact_id.is_some())
}

pub fn enrich_repository(ctx: &EnrichmentContext, source: &ExtensionSource) -> Result<RepositoryEnrichment> {
  let mut out = RepositoryEnrichment {
    url: source.scm_url.clone(),
    ..RepositoryEnrichment::default()
  };

  let Some(coords) = parse_scm_url(&source.scm_url) else {
    debug!(url = %source.scm_url, "not a GitHub repository; nothing to enrich");
    return Ok(out);
  };

  out.owner = Some(coords.owner.clone());
  out.project = Some(coords.name.clone());
  out.logo_url = Some(format!("https://github.com/{}.png", coords.owner));

  if ctx.options().sponsors {
    let finder = ctx.sponsor_finder();
    let (org, project) = (Some(coords.owner.as_str()), Some(coords.name.as_str()));

    // Both calls read the same cached contributor list.
    out.sponsors = finder
      .find_sponsor(org, project)
      .with_context(|| format!("finding sponsors for {}", coords.cache_key()))?;
    out.contributors = finder
      .get_contributors(org, project)
      .with_context(|| format!("collecting contributors for {}", coords.cache_key()))?;
    out.sponsor = out.sponsors.as_ref().and_then(|s| s.first().cloned());
  }

  if ctx.options().issues {
    let info = ctx
      .issue_counter()
      .get_issue_information(&coords, source.artifact_id.as_deref(), &source.scm_url)
      .with_context(|| format!("counting issues for {}", coords.cache_key()))?;
    out.issues = info.issues;
    out.issues_url = info.issues_url;
  }

  Ok(out)
}

pub fn enrich_all(ctx: &EnrichmentContext, sources: &[ExtensionSource]) -> Result<Vec<RepositoryEnrichment>> {
  let mut out = Vec::with_capacity(sources.len());

  for source in sources {
    let enriched = enrich_repository(ctx, source)?;
    info!(
      url = %enriched.url,
      sponsor = enriched.sponsor.as_deref().unwrap_or("-"),
      issues = enriched.issues.unwrap_or(0),
      "enriched repository"
    );
    out.push(enriched);
  }

  Ok(out)
}
