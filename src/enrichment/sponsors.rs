// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn a repository's contributors into a ranked list of opted-in sponsoring companies
// role: enrichment/sponsors
// inputs: Contributor lists (fetched or supplied); CompanyNormalizer; OptInList; SponsorThresholds
// outputs: Some(non-empty Vec<company>) sorted by commits descending, or None
// invariants:
// - Companies below minimum_contributor_count distinct logins are dropped
// - Companies whose share of all non-bot commits is below minimum_contribution_percent are dropped
// - Companies not on the opt-in list are never named
// - Lowering either threshold never removes a company that passed a stricter one
// - Missing org or project means no lookups at all
// errors: PaginationError from contributor collection; everything else degrades to None
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::enrichment::company::{CompanyCache, CompanyNormalizer};
use crate::enrichment::contributors::{is_bot, ContributorAggregator, ContributorCache};
use crate::enrichment::opt_in::OptInList;
use crate::github::client::GithubClient;
use crate::github::pagination::PaginationError;
use crate::model::{CompanyContribution, Contributor, RepositoryCoordinates};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SponsorThresholds {
  pub minimum_contributor_count: u64,
  pub minimum_contribution_percent: f64,
  /// Per-login commits needed before a contributor counts towards a company.
  pub minimum_contribution_count: u64,
}

impl Default for SponsorThresholds {
  fn default() -> Self {
    Self {
      minimum_contributor_count: 2,
      minimum_contribution_percent: 20.0,
      minimum_contribution_count: 1,
    }
  }
}

/// A login's commits, attributed to its normalised company.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
  pub login: String,
  pub company: Option<String>,
  pub commits: u64,
}

/// Sum commits per company and count distinct logins. Companies keep first-seen order.
pub fn fold_by_company(attributions: &[Attribution]) -> Vec<CompanyContribution> {
  let mut order: Vec<String> = Vec::new();
  let mut totals: HashMap<String, (u64, HashSet<&str>)> = HashMap::new();

  for a in attributions {
    let Some(company) = a.company.as_ref() else { continue };
    let entry = totals.entry(company.clone()).or_insert_with(|| {
      order.push(company.clone());
      (0, HashSet::new())
    });
    entry.0 += a.commits;
    entry.1.insert(a.login.as_str());
  }

  order
    .into_iter()
    .filter_map(|company| {
      totals.remove(&company).map(|(commits, logins)| CompanyContribution {
        company,
        commits,
        contributors: logins.len() as u64,
      })
    })
    .collect()
}

/// Apply thresholds and the allowlist; `total` is every non-bot commit in the window.
pub fn select_sponsors(
  companies: &[CompanyContribution],
  total: u64,
  thresholds: &SponsorThresholds,
  opt_in: &OptInList,
) -> Option<Vec<String>> {
  if total == 0 {
    return None;
  }

  let mut survivors: Vec<&CompanyContribution> = companies
    .iter()
    .filter(|c| c.contributors >= thresholds.minimum_contributor_count)
    .filter(|c| (c.commits as f64) * 100.0 / (total as f64) >= thresholds.minimum_contribution_percent)
    .filter(|c| opt_in.allows(&c.company))
    .collect();

  survivors.sort_by(|a, b| b.commits.cmp(&a.commits));

  let names: Vec<String> = survivors.into_iter().map(|c| c.company.clone()).collect();
  if names.is_empty() {
    None
  } else {
    Some(names)
  }
}

/// Merge repeated logins and drop bots, keeping first-seen order.
fn merge_logins(contributors: &[Contributor]) -> Vec<Contributor> {
  let mut merged: Vec<Contributor> = Vec::new();
  let mut index: HashMap<&str, usize> = HashMap::new();

  for c in contributors.iter().filter(|c| !is_bot(Some(&c.login))) {
    match index.get(c.login.as_str()) {
      Some(&i) => merged[i].contributions += c.contributions,
      None => {
        index.insert(&c.login, merged.len());
        merged.push(c.clone());
      }
    }
  }

  merged
}

pub struct SponsorFinder<'a> {
  contributors: ContributorAggregator<'a>,
  companies: CompanyNormalizer<'a>,
  thresholds: SponsorThresholds,
  opt_in: OptInList,
}

impl<'a> SponsorFinder<'a> {
  pub fn new(
    client: &'a GithubClient,
    contributor_cache: &'a ContributorCache,
    company_cache: &'a CompanyCache,
    lookback_days: i64,
    thresholds: SponsorThresholds,
    opt_in: OptInList,
  ) -> Self {
    Self {
      contributors: ContributorAggregator {
        client,
        cache: contributor_cache,
        lookback_days,
      },
      companies: CompanyNormalizer {
        client,
        cache: company_cache,
      },
      thresholds,
      opt_in,
    }
  }

  pub fn get_contributors(
    &self,
    org: Option<&str>,
    project: Option<&str>,
  ) -> Result<Option<Vec<Contributor>>, PaginationError> {
    let (Some(owner), Some(name)) = (org, project) else {
      return Ok(None);
    };
    let coords = RepositoryCoordinates {
      owner: owner.to_string(),
      name: name.to_string(),
    };

    self.contributors.get_contributors(&coords)
  }

  pub fn find_sponsor(&self, org: Option<&str>, project: Option<&str>) -> Result<Option<Vec<String>>, PaginationError> {
    let contributors = self.get_contributors(org, project)?;

    Ok(contributors.and_then(|list| self.find_sponsor_from_contributor_list(&list)))
  }

  pub fn find_sponsor_from_contributor_list(&self, contributors: &[Contributor]) -> Option<Vec<String>> {
    let merged = merge_logins(contributors);
    let total: u64 = merged.iter().map(|c| c.contributions).sum();

    let attributions: Vec<Attribution> = merged
      .iter()
      .filter(|c| c.contributions >= self.thresholds.minimum_contribution_count)
      .map(|c| Attribution {
        login: c.login.clone(),
        company: self.companies.normalize_company_name(c.company.as_deref()),
        commits: c.contributions,
      })
      .collect();

    let companies = fold_by_company(&attributions);
    debug!(total, companies = ?companies, "company contributions");

    select_sponsors(&companies, total, &self.thresholds, &self.opt_in)
  }
}
