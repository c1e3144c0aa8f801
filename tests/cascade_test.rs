//! Cascade resolver behavior against a scripted in-memory cascade.
//!
//! The fake port simulates the site: selecting a level-1 option populates
//! level 2, selecting level 2 populates level 3. Branches listed in
//! `dead_branches` accept the selection but never repopulate downstream,
//! which is exactly how the real sites fail.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use dou_robo::cascade::{CascadeResolver, FilterSpec};
use dou_robo::dropdown::control::{dedup_options, ControlKind, OptionEntry, SelectionControl};
use dou_robo::dropdown::sentinel::SentinelRule;
use dou_robo::dropdown::DropdownPort;
use dou_robo::error::Result;
use dou_robo::WaitTuning;

/// level-1 label → level-2 label → level-3 labels (empty for 2-level trees).
type Tree = BTreeMap<String, BTreeMap<String, Vec<String>>>;

#[derive(Default)]
struct FakeState {
    selected_l1: Option<String>,
    selected_l2: Option<String>,
}

struct FakeCascadePort {
    levels: usize,
    tree: Tree,
    /// level-1 labels whose selection never repopulates level 2.
    dead_branches: Vec<String>,
    state: Mutex<FakeState>,
    select_calls: AtomicUsize,
}

impl FakeCascadePort {
    fn new(levels: usize, tree: Tree) -> Self {
        Self {
            levels,
            tree,
            dead_branches: Vec::new(),
            state: Mutex::new(FakeState::default()),
            select_calls: AtomicUsize::new(0),
        }
    }

    fn with_dead_branches(mut self, branches: &[&str]) -> Self {
        self.dead_branches = branches.iter().map(|s| s.to_string()).collect();
        self
    }

    fn select_count(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Whether the control for a 1-based level is present in the "DOM".
    /// Dependent controls appear once the level above has a selection, even
    /// while their option list is still empty - exactly like the real sites.
    fn control_exists(&self, level: usize) -> bool {
        if level > self.levels {
            return false;
        }
        let state = self.state.lock().unwrap();
        match level {
            1 => true,
            2 => state.selected_l1.is_some(),
            3 => state.selected_l2.is_some(),
            _ => false,
        }
    }

    /// Raw labels currently offered at a 1-based level, placeholder included.
    fn labels_at(&self, level: usize) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut labels = vec!["Selecione...".to_string()];
        match level {
            1 => labels.extend(self.tree.keys().cloned()),
            2 => {
                if let Some(l1) = &state.selected_l1 {
                    if !self.dead_branches.contains(l1) {
                        if let Some(subs) = self.tree.get(l1) {
                            labels.extend(subs.keys().cloned());
                        }
                    }
                }
            }
            3 => {
                if let (Some(l1), Some(l2)) = (&state.selected_l1, &state.selected_l2) {
                    if let Some(people) = self.tree.get(l1).and_then(|subs| subs.get(l2)) {
                        labels.extend(people.iter().cloned());
                    }
                }
            }
            _ => {}
        }
        // a level holding only its placeholder has no real options yet
        if labels.len() == 1 {
            return Vec::new();
        }
        labels
    }

    fn control(&self, level: usize) -> SelectionControl {
        SelectionControl {
            identity: format!("ctl-{level}"),
            kind: ControlKind::NativeSelect,
            level,
            is_disabled: false,
            option_count: self.labels_at(level).len(),
        }
    }

    fn level_of(&self, identity: &str) -> Option<usize> {
        identity.strip_prefix("ctl-").and_then(|n| n.parse().ok())
    }
}

#[async_trait]
impl DropdownPort for FakeCascadePort {
    fn kind(&self) -> ControlKind {
        ControlKind::NativeSelect
    }

    async fn discover(&self) -> Result<Vec<SelectionControl>> {
        Ok((1..=self.levels)
            .filter(|level| self.control_exists(*level))
            .map(|level| self.control(level))
            .collect())
    }

    async fn relocate(&self, identity: &str) -> Result<Option<SelectionControl>> {
        Ok(self
            .level_of(identity)
            .filter(|level| self.control_exists(*level))
            .map(|level| self.control(level)))
    }

    async fn read_options(
        &self,
        control: &SelectionControl,
        exclude: &[Regex],
    ) -> Result<Vec<OptionEntry>> {
        let level = self.level_of(&control.identity).unwrap_or(0);
        let rule = SentinelRule::standard().with_excludes(exclude);
        let options = self
            .labels_at(level)
            .into_iter()
            .enumerate()
            .map(|(index, label)| OptionEntry {
                value: label.clone(),
                label,
                index,
            })
            .collect();
        Ok(dedup_options(options)
            .into_iter()
            .filter(|o| !rule.is_sentinel(&o.label))
            .collect())
    }

    async fn option_count(&self, control: &SelectionControl) -> Result<usize> {
        let level = self.level_of(&control.identity).unwrap_or(0);
        Ok(self.labels_at(level).len())
    }

    async fn select(&self, control: &SelectionControl, option: &OptionEntry) -> Result<bool> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        let level = self.level_of(&control.identity).unwrap_or(0);
        let mut state = self.state.lock().unwrap();
        match level {
            1 => {
                state.selected_l1 = Some(option.label.clone());
                state.selected_l2 = None;
                Ok(true)
            }
            2 => {
                state.selected_l2 = Some(option.label.clone());
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    async fn close(&self, _control: &SelectionControl) -> Result<()> {
        Ok(())
    }
}

fn fast_waits() -> WaitTuning {
    WaitTuning {
        poll_ms: 2,
        settle_ms: 20,
        options_ms: 50,
        repopulate_ms: 60,
        navigation_ms: 100,
    }
}

fn two_level_tree(orgs: &[(&str, &[&str])]) -> Tree {
    orgs.iter()
        .map(|(org, subs)| {
            let subs = subs
                .iter()
                .map(|s| (s.to_string(), Vec::new()))
                .collect();
            (org.to_string(), subs)
        })
        .collect()
}

#[tokio::test]
async fn regex_filter_keeps_matching_entries_in_original_order() {
    let tree = two_level_tree(&[
        ("Presidência", &["Todos os vinculados"]),
        ("Ministério da Fazenda", &["Todos os vinculados"]),
        ("Ministério da Saúde", &["Todos os vinculados"]),
    ]);
    let port = FakeCascadePort::new(2, tree);
    let resolver = CascadeResolver::new(&port, 2, fast_waits());

    let filters = vec![FilterSpec::new(Some("^Minist"), None, None).unwrap()];
    let combos = resolver.resolve(&filters).await.unwrap();

    let level1: Vec<&str> = combos.iter().map(|c| c.label1.as_str()).collect();
    assert_eq!(level1, ["Ministério da Fazenda", "Ministério da Saúde"]);
}

#[tokio::test]
async fn limits_bound_survivors_and_selection_work() {
    let tree = two_level_tree(&[
        ("Org A", &["Sub 1", "Sub 2"]),
        ("Org B", &["Sub 1"]),
        ("Org C", &["Sub 1"]),
    ]);
    let port = FakeCascadePort::new(2, tree);
    let resolver = CascadeResolver::new(&port, 2, fast_waits());

    let filters = vec![FilterSpec::new(None, None, Some(1)).unwrap()];
    let combos = resolver.resolve(&filters).await.unwrap();

    assert_eq!(combos.len(), 2); // Org A × {Sub 1, Sub 2}
    assert!(combos.iter().all(|c| c.label1 == "Org A"));
    // truncation happened before selection: only one level-1 select issued
    assert_eq!(port.select_count(), 1);
}

#[tokio::test]
async fn regex_and_pick_list_admit_the_union() {
    let tree = two_level_tree(&[
        ("Presidência", &["Todos os vinculados"]),
        ("Ministério da Fazenda", &["Todos os vinculados"]),
        ("Banco Central", &["Todos os vinculados"]),
    ]);
    let port = FakeCascadePort::new(2, tree);
    let resolver = CascadeResolver::new(&port, 2, fast_waits());

    let filters = vec![FilterSpec::new(
        Some("^Minist"),
        Some(vec!["Banco Central".to_string()]),
        None,
    )
    .unwrap()];
    let combos = resolver.resolve(&filters).await.unwrap();

    // option order is the fake's sorted key order; survivors keep it
    let level1: Vec<&str> = combos.iter().map(|c| c.label1.as_str()).collect();
    assert_eq!(level1, ["Banco Central", "Ministério da Fazenda"]);
}

#[tokio::test]
async fn dead_branch_times_out_and_is_skipped_not_fatal() {
    // "Org Alfa" selects fine but has nothing below it; "Org Morta" accepts
    // the selection and then never repopulates level 2 (frozen empty
    // downstream - the repopulation-timeout path); "Org Zeta" works.
    let tree = two_level_tree(&[
        ("Org Alfa", &[]),
        ("Org Morta", &["Sub 1"]),
        ("Org Zeta", &["Sub 1", "Sub 2"]),
    ]);
    let port = FakeCascadePort::new(2, tree).with_dead_branches(&["Org Morta"]);
    let resolver = CascadeResolver::new(&port, 2, fast_waits());

    let combos = resolver.resolve(&[]).await.unwrap();

    assert_eq!(combos.len(), 2);
    assert!(combos.iter().all(|c| c.label1 == "Org Zeta"));
}

#[tokio::test]
async fn empty_level1_yields_nothing() {
    let port = FakeCascadePort::new(2, Tree::new());
    let resolver = CascadeResolver::new(&port, 2, fast_waits());
    let combos = resolver.resolve(&[]).await.unwrap();
    assert!(combos.is_empty());
}

#[tokio::test]
async fn three_level_resolution_excludes_occupant_pseudo_options() {
    let mut roles = BTreeMap::new();
    roles.insert(
        "Ministro de Estado".to_string(),
        vec![
            "Todos os ocupantes do cargo".to_string(),
            "Fulano de Tal".to_string(),
        ],
    );
    let mut tree = Tree::new();
    tree.insert("CGU".to_string(), roles);

    let port = FakeCascadePort::new(3, tree);
    let resolver = CascadeResolver::new(&port, 3, fast_waits())
        .with_level3_excludes(vec![Regex::new(r"ocupantes do cargo").unwrap()]);

    let combos = resolver.resolve(&[]).await.unwrap();

    assert_eq!(combos.len(), 1);
    assert_eq!(combos[0].label3.as_deref(), Some("Fulano de Tal"));
    assert_eq!(combos[0].topic, "cgu-ministro-de-estado-fulano-de-tal");
}

#[tokio::test]
async fn option_reading_is_idempotent() {
    let tree = two_level_tree(&[("Org A", &["Sub 1"]), ("Org B", &["Sub 1"])]);
    let port = FakeCascadePort::new(2, tree);
    let control = port.control(1);

    let first = port.read_options(&control, &[]).await.unwrap();
    let second = port.read_options(&control, &[]).await.unwrap();

    assert_eq!(first, second);
    // no placeholder entries survive the shared sentinel rule
    assert_eq!(first.len(), 2);
    assert!(first
        .iter()
        .all(|o| !o.label.to_lowercase().starts_with("selecione")));
}
