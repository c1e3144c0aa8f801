//! The plan document: one batch run's work, persisted as JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::config::ScrapeDefaults;
use crate::error::{PlanError, Result};
use crate::models::combo::Combo;

/// A persisted list of combos plus the shared defaults. The file is the
/// single source of truth for a batch run and is hand-editable between
/// building and running. Stale combos (options that no longer exist on the
/// site) are allowed to fail at execution time, not at load time; structural
/// malformation fails here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plan {
    /// Edition date, `DD-MM-YYYY`.
    pub date: String,
    #[serde(rename = "secaoDefault")]
    pub secao_default: String,
    pub defaults: ScrapeDefaults,
    pub combos: Vec<Combo>,
}

impl Plan {
    pub fn new(date: String, secao_default: String, defaults: ScrapeDefaults, combos: Vec<Combo>) -> Self {
        Self {
            date,
            secao_default,
            defaults,
            combos,
        }
    }

    /// Load and validate. Malformation here is fatal: it indicates a broken
    /// file, not a per-job problem.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlanError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)?;
        let plan: Plan = serde_json::from_str(&content).map_err(|e| PlanError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        plan.validate(path)?;
        Ok(plan)
    }

    /// Persist. Refuses to clobber an existing file unless told to.
    pub fn save(&self, path: &Path, overwrite: bool) -> Result<()> {
        if path.exists() && !overwrite {
            return Err(PlanError::AlreadyExists {
                path: path.display().to_string(),
            }
            .into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("plan with {} combo(s) written to {}", self.combos.len(), path.display());
        Ok(())
    }

    fn validate(&self, path: &Path) -> Result<()> {
        parse_plan_date(&self.date)?;
        if self.secao_default.trim().is_empty() {
            return Err(PlanError::Malformed {
                path: path.display().to_string(),
                reason: "secaoDefault is empty".to_string(),
            }
            .into());
        }
        for (i, combo) in self.combos.iter().enumerate() {
            if !combo.is_well_formed() {
                return Err(PlanError::Malformed {
                    path: path.display().to_string(),
                    reason: format!("combo {i} has an empty key"),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Effective section for one combo.
    pub fn secao_for(&self, combo: &Combo) -> String {
        combo
            .secao
            .clone()
            .unwrap_or_else(|| self.secao_default.clone())
    }
}

/// Parse the plan's `DD-MM-YYYY` date.
pub fn parse_plan_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%d-%m-%Y").map_err(|_| {
        PlanError::InvalidDate {
            value: value.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dropdown::control::OptionEntry;

    fn sample_plan() -> Plan {
        let combo = Combo::from_levels(
            &OptionEntry {
                label: "Ministério da Fazenda".into(),
                value: "315".into(),
                index: 0,
            },
            &OptionEntry {
                label: "Todos".into(),
                value: "0".into(),
                index: 0,
            },
            None,
        );
        Plan::new("01-01-2025".into(), "DO1".into(), ScrapeDefaults::default(), vec![combo])
    }

    #[test]
    fn json_uses_wire_field_names() {
        let json = serde_json::to_string(&sample_plan()).unwrap();
        assert!(json.contains("\"secaoDefault\""));
        assert!(json.contains("\"key1\""));
    }

    #[test]
    fn rejects_bad_date() {
        assert!(parse_plan_date("2025-01-01").is_err());
        assert!(parse_plan_date("31-02-2025").is_err());
        assert!(parse_plan_date("01-01-2025").is_ok());
    }

    #[test]
    fn secao_override_wins() {
        let mut plan = sample_plan();
        plan.combos[0].secao = Some("DO2".into());
        let secao = plan.secao_for(&plan.combos[0]);
        assert_eq!(secao, "DO2");
    }
}
