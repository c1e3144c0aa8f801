//! Placeholder-option detection.
//!
//! Both sites seed their dropdowns with pseudo-entries ("Selecione...",
//! "Todos") that are not real selectable values. One shared rule keeps the
//! option readers consistent.

use regex::Regex;

use crate::dropdown::control::normalize_label;

/// Compiled sentinel patterns. Built once per reader.
pub struct SentinelRule {
    patterns: Vec<Regex>,
}

impl SentinelRule {
    /// Default placeholders seen on DOU and e-agendas.
    pub fn standard() -> Self {
        let patterns = [
            r"^selecione\b",
            r"^escolha\b",
            r"^todos$",
            r"^todas$",
            r"^-+\s*$",
            r"^\s*$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static sentinel pattern"))
        .collect();
        Self { patterns }
    }

    /// Extend with caller-supplied exclusions (e.g. the e-agendas
    /// "all occupants of this role" pseudo-option).
    pub fn with_excludes(mut self, excludes: &[Regex]) -> Self {
        self.patterns.extend(excludes.iter().cloned());
        self
    }

    pub fn is_sentinel(&self, label: &str) -> bool {
        let normalized = normalize_label(label);
        self.patterns.iter().any(|p| p.is_match(&normalized))
    }
}
