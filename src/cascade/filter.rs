//! Per-level filter specification.

use regex::Regex;

use crate::dropdown::control::{normalize_label, OptionEntry};
use crate::error::{AppError, Result};

/// Filter applied to one cascade level's options.
///
/// Survival semantics: an option survives iff it matches `select_regex` (when
/// given) OR its label is in `pick_list` (when given). When both are given
/// the union is kept: either criterion admits the option. With neither,
/// every option survives. `limit` truncates the survivors afterwards,
/// preserving their original relative order.
#[derive(Clone, Debug, Default)]
pub struct FilterSpec {
    pub select_regex: Option<Regex>,
    pub pick_list: Option<Vec<String>>,
    pub limit: Option<usize>,
}

impl FilterSpec {
    pub fn new(
        select_regex: Option<&str>,
        pick_list: Option<Vec<String>>,
        limit: Option<usize>,
    ) -> Result<Self> {
        let select_regex = match select_regex {
            Some(pattern) => Some(
                Regex::new(pattern)
                    .map_err(|e| AppError::Other(format!("invalid filter regex '{pattern}': {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            select_regex,
            pick_list,
            limit,
        })
    }

    /// Apply the filter, preserving input order.
    pub fn apply(&self, options: &[OptionEntry]) -> Vec<OptionEntry> {
        let survivors: Vec<OptionEntry> = options
            .iter()
            .filter(|o| self.admits(&o.label))
            .cloned()
            .collect();
        match self.limit {
            Some(limit) => survivors.into_iter().take(limit).collect(),
            None => survivors,
        }
    }

    fn admits(&self, label: &str) -> bool {
        let by_regex = self
            .select_regex
            .as_ref()
            .map(|re| re.is_match(label))
            .unwrap_or(false);
        let by_pick = self
            .pick_list
            .as_ref()
            .map(|picks| {
                picks
                    .iter()
                    .any(|p| normalize_label(p) == normalize_label(label))
            })
            .unwrap_or(false);

        if self.select_regex.is_none() && self.pick_list.is_none() {
            return true;
        }
        by_regex || by_pick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(labels: &[&str]) -> Vec<OptionEntry> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| OptionEntry {
                label: l.to_string(),
                value: format!("v{i}"),
                index: i,
            })
            .collect()
    }

    #[test]
    fn no_criteria_admits_all() {
        let f = FilterSpec::default();
        let options = opts(&["A", "B"]);
        assert_eq!(f.apply(&options).len(), 2);
    }

    #[test]
    fn regex_keeps_relative_order() {
        let f = FilterSpec::new(Some("^Minist"), None, None).unwrap();
        let options = opts(&["Presidência", "Ministério da Fazenda", "Ministério da Saúde"]);
        let survivors = f.apply(&options);
        let labels: Vec<&str> = survivors.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, ["Ministério da Fazenda", "Ministério da Saúde"]);
    }

    #[test]
    fn regex_and_pick_list_are_or_combined() {
        let f = FilterSpec::new(
            Some("^Minist"),
            Some(vec!["Presidência".to_string()]),
            None,
        )
        .unwrap();
        let options = opts(&["Presidência", "Ministério da Fazenda", "Banco Central"]);
        let survivors = f.apply(&options);
        assert_eq!(survivors.len(), 2);
    }

    #[test]
    fn pick_list_matches_case_insensitively() {
        let f = FilterSpec::new(None, Some(vec!["ministério da fazenda".to_string()]), None).unwrap();
        let options = opts(&["Ministério da Fazenda"]);
        assert_eq!(f.apply(&options).len(), 1);
    }

    #[test]
    fn limit_truncates_after_filtering() {
        let f = FilterSpec::new(Some("^M"), None, Some(1)).unwrap();
        let options = opts(&["Meio Ambiente", "Minas e Energia", "Presidência"]);
        let survivors = f.apply(&options);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].label, "Meio Ambiente");
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(FilterSpec::new(Some("("), None, None).is_err());
    }
}
