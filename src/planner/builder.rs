//! Plan builder.
//!
//! `live` drives the cascade against the site; `artifact` filters a pairs
//! snapshot in memory (orders of magnitude faster, staleness-advisory);
//! `auto` takes a fresh artifact when one exists and falls back to live.

use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use crate::browser;
use crate::cascade::filter::FilterSpec;
use crate::cascade::resolver::CascadeResolver;
use crate::config::Config;
use crate::dropdown::control::{ControlKind, OptionEntry};
use crate::dropdown::dialect::DropdownPort;
use crate::dropdown::native_select::NativeSelectPort;
use crate::dropdown::token_widget::TokenWidgetPort;
use crate::error::{AppError, Result};
use crate::infrastructure::PageDriver;
use crate::models::combo::Combo;
use crate::models::pairs::{PairsArtifact, PairsBody, Staleness};
use crate::models::plan::{parse_plan_date, Plan};
use crate::models::site::Site;

/// Where the combos come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanSource {
    Live,
    Artifact,
    Auto,
}

impl FromStr for PlanSource {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(PlanSource::Live),
            "artifact" => Ok(PlanSource::Artifact),
            "auto" => Ok(PlanSource::Auto),
            other => Err(AppError::Other(format!("unknown plan source: {other}"))),
        }
    }
}

/// One plan-building request.
#[derive(Clone, Debug)]
pub struct PlanRequest {
    pub site: Site,
    pub date: String,
    pub secao: String,
    pub filters: Vec<FilterSpec>,
    pub out_path: PathBuf,
    pub overwrite: bool,
}

pub struct PlanBuilder<'a> {
    config: &'a Config,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Build and persist a plan. The shared scraping defaults are merged in
    /// uniformly; the file is never silently overwritten.
    pub async fn build(&self, source: PlanSource, request: &PlanRequest) -> Result<Plan> {
        parse_plan_date(&request.date)?;

        let combos = match source {
            PlanSource::Live => self.resolve_live(request).await?,
            PlanSource::Artifact => self.resolve_artifact(request)?,
            PlanSource::Auto => match self.try_fresh_artifact(request) {
                Some(combos) => combos,
                None => {
                    info!("no fresh pairs artifact; falling back to live resolution");
                    self.resolve_live(request).await?
                }
            },
        };
        info!("{} combo(s) selected for the plan", combos.len());

        let plan = Plan::new(
            request.date.clone(),
            request.secao.clone(),
            self.config.defaults.clone(),
            combos,
        );
        plan.save(&request.out_path, request.overwrite)?;
        Ok(plan)
    }

    async fn resolve_live(&self, request: &PlanRequest) -> Result<Vec<Combo>> {
        resolve_site_live(
            self.config,
            request.site,
            &request.date,
            &request.secao,
            &request.filters,
        )
        .await
    }

    /// Artifact mode: stale artifacts are usable (the warning is logged by
    /// the staleness check); only a missing or unreadable file errors.
    fn resolve_artifact(&self, request: &PlanRequest) -> Result<Vec<Combo>> {
        let path = PairsArtifact::default_path(&self.config.pairs_dir, request.site);
        let artifact = PairsArtifact::load(&path)?;
        artifact.check_staleness();
        Ok(filter_artifact(artifact.body(), &request.filters))
    }

    fn try_fresh_artifact(&self, request: &PlanRequest) -> Option<Vec<Combo>> {
        let path = PairsArtifact::default_path(&self.config.pairs_dir, request.site);
        let artifact = match PairsArtifact::load(&path) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!("pairs artifact unavailable: {e}");
                return None;
            }
        };
        match artifact.check_staleness() {
            Staleness::Fresh => Some(filter_artifact(artifact.body(), &request.filters)),
            Staleness::Stale { .. } => None,
        }
    }
}

/// Drive the live cascade for `site` and enumerate the filtered combos.
/// Shared with the pairs updater (which runs it unfiltered).
pub(crate) async fn resolve_site_live(
    config: &Config,
    site: Site,
    date: &str,
    secao: &str,
    filters: &[FilterSpec],
) -> Result<Vec<Combo>> {
    let url = site.edition_url(config, date, secao);
    let (_browser, page) = if config.browser_debug_port > 0 {
        browser::connect_to_browser_and_page(config.browser_debug_port, Some(&url)).await?
    } else {
        browser::launch_headless_browser(&url).await?
    };
    let driver = PageDriver::new(page);

    let port: Box<dyn DropdownPort> = match site.dialect() {
        ControlKind::NativeSelect => Box::new(NativeSelectPort::new(driver, config.waits)),
        ControlKind::TokenWidget => Box::new(TokenWidgetPort::new(driver, config.waits)),
    };
    let resolver = CascadeResolver::new(port.as_ref(), site.levels(), config.waits)
        .with_level3_excludes(site.leaf_excludes());
    resolver.resolve(filters).await
}

/// In-memory filtering of a pairs snapshot. Labels double as keys in the
/// artifact; the live replay tolerates drift via prefix matching.
pub(crate) fn filter_artifact(body: &PairsBody, filters: &[FilterSpec]) -> Vec<Combo> {
    let filter_at = |i: usize| filters.get(i).cloned().unwrap_or_default();
    let entries = |labels: Vec<&String>| -> Vec<OptionEntry> {
        labels
            .into_iter()
            .enumerate()
            .map(|(index, label)| OptionEntry {
                label: label.clone(),
                value: label.clone(),
                index,
            })
            .collect()
    };

    let mut combos = Vec::new();
    match body {
        PairsBody::Pairs(orgs) => {
            let l1_entries = entries(orgs.keys().collect());
            for l1 in filter_at(0).apply(&l1_entries) {
                let subs = &orgs[&l1.label];
                let l2_entries = entries(subs.iter().collect());
                for l2 in filter_at(1).apply(&l2_entries) {
                    combos.push(Combo::from_levels(&l1, &l2, None));
                }
            }
        }
        PairsBody::Hierarchy(orgs) => {
            let l1_entries = entries(orgs.keys().collect());
            for l1 in filter_at(0).apply(&l1_entries) {
                let roles = &orgs[&l1.label];
                let l2_entries = entries(roles.keys().collect());
                for l2 in filter_at(1).apply(&l2_entries) {
                    let people = &roles[&l2.label];
                    let l3_entries = entries(people.iter().collect());
                    for l3 in filter_at(2).apply(&l3_entries) {
                        combos.push(Combo::from_levels(&l1, &l2, Some(&l3)));
                    }
                }
            }
        }
    }
    combos
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_pairs() -> PairsBody {
        let mut orgs = BTreeMap::new();
        orgs.insert(
            "Ministério da Fazenda".to_string(),
            vec!["Todos".to_string(), "Banco Central".to_string()],
        );
        orgs.insert("Presidência".to_string(), vec!["Todos".to_string()]);
        PairsBody::Pairs(orgs)
    }

    #[test]
    fn unfiltered_artifact_yields_every_path() {
        let combos = filter_artifact(&sample_pairs(), &[]);
        assert_eq!(combos.len(), 3);
    }

    #[test]
    fn level1_filter_prunes_branches() {
        let filters = vec![FilterSpec::new(Some("^Minist"), None, None).unwrap()];
        let combos = filter_artifact(&sample_pairs(), &filters);
        assert_eq!(combos.len(), 2);
        assert!(combos.iter().all(|c| c.label1.starts_with("Ministério")));
    }

    #[test]
    fn level2_limit_applies_per_branch() {
        let filters = vec![
            FilterSpec::default(),
            FilterSpec::new(None, None, Some(1)).unwrap(),
        ];
        let combos = filter_artifact(&sample_pairs(), &filters);
        assert_eq!(combos.len(), 2);
    }

    #[test]
    fn hierarchy_filtering_reaches_level3() {
        let mut roles = BTreeMap::new();
        roles.insert(
            "Ministro".to_string(),
            vec!["Fulano".to_string(), "Beltrano".to_string()],
        );
        let mut orgs = BTreeMap::new();
        orgs.insert("CGU".to_string(), roles);
        let body = PairsBody::Hierarchy(orgs);

        let filters = vec![
            FilterSpec::default(),
            FilterSpec::default(),
            FilterSpec::new(Some("^Fulano"), None, None).unwrap(),
        ];
        let combos = filter_artifact(&body, &filters);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].label3.as_deref(), Some("Fulano"));
    }
}
