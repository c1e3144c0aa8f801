//! Cascade resolver.
//!
//! Enumerates the selection paths that survive the per-level filters.
//! Filters and limits are applied before any selection is issued, so the
//! resolver never pays the (slow, network-bound) selection cost for a branch
//! it was never going to keep. A branch whose dependent level fails to
//! repopulate is skipped with a log line; partial enumerations are useful
//! because resolution usually runs once to build a reusable artifact.

use regex::Regex;
use tracing::{debug, info, warn};

use crate::cascade::filter::FilterSpec;
use crate::config::WaitTuning;
use crate::dropdown::actor::select_and_wait;
use crate::dropdown::control::{OptionEntry, OptionMatcher, SelectionControl};
use crate::dropdown::dialect::DropdownPort;
use crate::error::Result;
use crate::models::combo::Combo;

pub struct CascadeResolver<'a> {
    port: &'a dyn DropdownPort,
    /// Cascade depth: 2 (DOU) or 3 (e-agendas).
    levels: usize,
    waits: WaitTuning,
    /// Extra exclusions for level-3 option reads (the "all occupants of this
    /// role" pseudo-option is not a real selectable value).
    level3_excludes: Vec<Regex>,
}

impl<'a> CascadeResolver<'a> {
    pub fn new(port: &'a dyn DropdownPort, levels: usize, waits: WaitTuning) -> Self {
        Self {
            port,
            levels,
            waits,
            level3_excludes: Vec::new(),
        }
    }

    pub fn with_level3_excludes(mut self, excludes: Vec<Regex>) -> Self {
        self.level3_excludes = excludes;
        self
    }

    /// Enumerate surviving combos. Zero survivors at any point yields an
    /// empty result, never an error.
    pub async fn resolve(&self, filters: &[FilterSpec]) -> Result<Vec<Combo>> {
        let filter_at = |i: usize| filters.get(i).cloned().unwrap_or_default();

        let controls = self.port.discover().await?;
        let Some(level1) = controls.first().cloned() else {
            warn!("no level-1 control found; nothing to resolve");
            return Ok(Vec::new());
        };

        let l1_options = self.port.read_options(&level1, &[]).await?;
        let l1_survivors = filter_at(0).apply(&l1_options);
        log_level_survivors(1, l1_options.len(), l1_survivors.len());
        if l1_survivors.is_empty() {
            return Ok(Vec::new());
        }

        let mut combos = Vec::new();
        for l1 in &l1_survivors {
            match self.resolve_branch(&level1, l1, &filter_at).await {
                Ok(mut branch) => combos.append(&mut branch),
                Err(e) => {
                    // partial results beat aborting the whole traversal
                    warn!("branch '{}' failed, skipping: {}", l1.label, e);
                }
            }
        }

        info!("resolution complete: {} combo(s)", combos.len());
        Ok(combos)
    }

    /// Everything below one level-1 option.
    async fn resolve_branch(
        &self,
        level1: &SelectionControl,
        l1: &OptionEntry,
        filter_at: &dyn Fn(usize) -> FilterSpec,
    ) -> Result<Vec<Combo>> {
        let Some(level1_now) = self.refreshed(level1, 0).await? else {
            warn!("level-1 control vanished before selecting '{}'", l1.label);
            return Ok(Vec::new());
        };
        let downstream = self.control_at(1).await?;

        let selected = select_and_wait(
            self.port,
            &level1_now,
            downstream.as_ref(),
            &OptionMatcher::Exact(l1.clone()),
            &self.waits,
        )
        .await?;
        if !selected {
            warn!("skipping branch '{}': level-2 never repopulated", l1.label);
            return Ok(Vec::new());
        }

        let Some(level2) = self.control_at(1).await? else {
            debug!("no level-2 control under '{}'", l1.label);
            return Ok(Vec::new());
        };
        let l2_options = self.port.read_options(&level2, &[]).await?;
        let l2_survivors = filter_at(1).apply(&l2_options);
        log_level_survivors(2, l2_options.len(), l2_survivors.len());

        if self.levels == 2 {
            return Ok(l2_survivors
                .iter()
                .map(|l2| Combo::from_levels(l1, l2, None))
                .collect());
        }

        let mut combos = Vec::new();
        for l2 in &l2_survivors {
            match self.resolve_leaf(&level2, l1, l2, filter_at).await {
                Ok(mut leaves) => combos.append(&mut leaves),
                Err(e) => warn!("branch '{}' / '{}' failed, skipping: {}", l1.label, l2.label, e),
            }
        }
        Ok(combos)
    }

    /// Level-3 enumeration under one (level-1, level-2) pair.
    async fn resolve_leaf(
        &self,
        level2: &SelectionControl,
        l1: &OptionEntry,
        l2: &OptionEntry,
        filter_at: &dyn Fn(usize) -> FilterSpec,
    ) -> Result<Vec<Combo>> {
        let Some(level2_now) = self.refreshed(level2, 1).await? else {
            warn!("level-2 control vanished before selecting '{}'", l2.label);
            return Ok(Vec::new());
        };
        let downstream = self.control_at(2).await?;

        let selected = select_and_wait(
            self.port,
            &level2_now,
            downstream.as_ref(),
            &OptionMatcher::Exact(l2.clone()),
            &self.waits,
        )
        .await?;
        if !selected {
            warn!("skipping '{}': level-3 never repopulated", l2.label);
            return Ok(Vec::new());
        }

        let Some(level3) = self.control_at(2).await? else {
            debug!("no level-3 control under '{}'", l2.label);
            return Ok(Vec::new());
        };
        let l3_options = self
            .port
            .read_options(&level3, &self.level3_excludes)
            .await?;
        let l3_survivors = filter_at(2).apply(&l3_options);
        log_level_survivors(3, l3_options.len(), l3_survivors.len());

        Ok(l3_survivors
            .iter()
            .map(|l3| Combo::from_levels(l1, l2, Some(l3)))
            .collect())
    }

    /// Re-find a control by identity, falling back to fresh discovery at the
    /// same cascade position when the node was replaced.
    async fn refreshed(
        &self,
        control: &SelectionControl,
        position: usize,
    ) -> Result<Option<SelectionControl>> {
        if let Some(found) = self.port.relocate(&control.identity).await? {
            return Ok(Some(found));
        }
        self.control_at(position).await
    }

    /// Control at a 0-based cascade position, if it exists yet.
    async fn control_at(&self, position: usize) -> Result<Option<SelectionControl>> {
        Ok(self.port.discover().await?.into_iter().nth(position))
    }
}

fn log_level_survivors(level: usize, total: usize, surviving: usize) {
    debug!(
        "level {}: {} option(s), {} surviving filters",
        level, total, surviving
    );
}
