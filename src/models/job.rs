//! The batch execution unit.

use serde::{Deserialize, Serialize};

use crate::config::ScrapeDefaults;
use crate::models::combo::Combo;
use crate::models::plan::Plan;
use crate::models::site::Site;

/// One unit of batch work, derived 1:1 from a plan combo at run time and
/// enriched with the runtime knobs the executor needs. Serializable because
/// the process pool ships buckets of jobs to child workers as JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    /// Position in the plan, for deterministic result file names.
    pub index: usize,
    pub site: Site,
    pub combo: Combo,
    pub date: String,
    /// Effective section (combo override already applied).
    pub secao: String,
    pub defaults: ScrapeDefaults,
    pub retry_count: usize,
    pub timeout_secs: u64,
}

impl Job {
    /// Derive all jobs from a plan.
    pub fn from_plan(plan: &Plan, site: Site, retry_count: usize, timeout_secs: u64) -> Vec<Job> {
        plan.combos
            .iter()
            .enumerate()
            .map(|(index, combo)| {
                let secao = plan.secao_for(combo);
                Job {
                    id: format!("{}-{}-{}-{:03}", combo.topic, plan.date, secao, index),
                    index,
                    site,
                    combo: combo.clone(),
                    date: plan.date.clone(),
                    secao,
                    defaults: plan.defaults.clone(),
                    retry_count,
                    timeout_secs,
                }
            })
            .collect()
    }

    /// Bucket key: jobs sharing it can reuse one navigated page.
    pub fn reuse_key(&self) -> (String, String) {
        (self.date.clone(), self.secao.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dropdown::control::OptionEntry;

    #[test]
    fn jobs_inherit_plan_defaults_and_override_secao() {
        let mk = |l: &str, v: &str| OptionEntry {
            label: l.into(),
            value: v.into(),
            index: 0,
        };
        let mut combo_a = Combo::from_levels(&mk("A", "1"), &mk("Todos", "0"), None);
        let combo_b = Combo::from_levels(&mk("B", "2"), &mk("Todos", "0"), None);
        combo_a.secao = Some("DO2".into());

        let plan = Plan::new(
            "01-01-2025".into(),
            "DO1".into(),
            ScrapeDefaults::default(),
            vec![combo_a, combo_b],
        );
        let jobs = Job::from_plan(&plan, Site::Dou, 2, 300);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].secao, "DO2");
        assert_eq!(jobs[1].secao, "DO1");
        assert_ne!(jobs[0].id, jobs[1].id);
        assert_eq!(jobs[0].reuse_key(), ("01-01-2025".into(), "DO2".into()));
    }
}
