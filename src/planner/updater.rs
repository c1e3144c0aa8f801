//! Pairs-artifact updater.
//!
//! Runs the full unfiltered traversal and snapshots it. Meant to run
//! unattended (scheduled), so the artifact is marked `auto_generated` and
//! carries its own staleness policy.

use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::models::combo::Combo;
use crate::models::pairs::{PairsArtifact, PairsBody};
use crate::models::site::Site;
use crate::planner::builder::resolve_site_live;

pub struct PairsUpdater<'a> {
    config: &'a Config,
}

impl<'a> PairsUpdater<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Traverse the whole cascade and persist the snapshot. Returns the
    /// written artifact.
    pub async fn update(
        &self,
        site: Site,
        max_age_days: i64,
        out_path: Option<PathBuf>,
    ) -> Result<PairsArtifact> {
        let today = chrono::Local::now().format("%d-%m-%Y").to_string();
        let secao = default_secao(site);
        info!("updating pairs artifact for {site} ({today})");

        // no filters: the artifact must cover everything
        let combos = resolve_site_live(self.config, site, &today, secao, &[]).await?;
        let body = build_body(site, &combos);

        let artifact = PairsArtifact::new(today, body, true, max_age_days);
        let path = out_path
            .unwrap_or_else(|| PairsArtifact::default_path(&self.config.pairs_dir, site));
        artifact.save(&path)?;
        Ok(artifact)
    }
}

fn default_secao(site: Site) -> &'static str {
    match site {
        Site::Dou => "DO1",
        Site::Eagendas => "",
    }
}

/// Fold the enumerated combos back into the nested snapshot shape.
pub(crate) fn build_body(site: Site, combos: &[Combo]) -> PairsBody {
    use std::collections::BTreeMap;

    match site.levels() {
        2 => {
            let mut orgs: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for combo in combos {
                orgs.entry(combo.label1.clone())
                    .or_default()
                    .push(combo.label2.clone());
            }
            PairsBody::Pairs(orgs)
        }
        _ => {
            let mut orgs: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
            for combo in combos {
                let Some(label3) = &combo.label3 else { continue };
                orgs.entry(combo.label1.clone())
                    .or_default()
                    .entry(combo.label2.clone())
                    .or_default()
                    .push(label3.clone());
            }
            PairsBody::Hierarchy(orgs)
        }
    }
}
