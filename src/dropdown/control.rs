//! Control handles and option entries.

use serde::{Deserialize, Serialize};

/// Widget dialect of a control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    /// Native `<select>` element.
    NativeSelect,
    /// Tokenized combobox widget (option panel rendered outside the element).
    TokenWidget,
}

/// Handle to one dropdown on the page.
///
/// `identity` is a marker stamped on the DOM node at discovery time so the
/// control can be re-located after a cascade step replaces its surroundings.
/// Handles are rediscovered on every page load and never persisted.
#[derive(Clone, Debug)]
pub struct SelectionControl {
    pub identity: String,
    pub kind: ControlKind,
    /// 1-based position in the cascade, by discovery order.
    pub level: usize,
    pub is_disabled: bool,
    pub option_count: usize,
}

/// One selectable option, as read from a control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub label: String,
    pub value: String,
    pub index: usize,
}

/// How the actor finds the option to select.
#[derive(Clone, Debug)]
pub enum OptionMatcher {
    /// A previously-read entry; matched by value, then by label.
    Exact(OptionEntry),
    /// A label recorded earlier (e.g. in a plan). Falls back to prefix
    /// matching to tolerate minor drift between resolution and replay.
    Label(String),
}

/// Prefix length used by the label-drift fallback.
const PREFIX_LEN: usize = 5;

impl OptionMatcher {
    /// Find the matching entry among `options`, exact label first, then the
    /// prefix fallback.
    pub fn find<'a>(&self, options: &'a [OptionEntry]) -> Option<&'a OptionEntry> {
        match self {
            OptionMatcher::Exact(wanted) => options
                .iter()
                .find(|o| o.value == wanted.value)
                .or_else(|| options.iter().find(|o| label_eq(&o.label, &wanted.label)))
                .or_else(|| options.iter().find(|o| label_prefix_eq(&o.label, &wanted.label))),
            OptionMatcher::Label(wanted) => options
                .iter()
                .find(|o| label_eq(&o.label, wanted))
                .or_else(|| options.iter().find(|o| label_prefix_eq(&o.label, wanted))),
        }
    }

    /// Label to report when matching fails.
    pub fn describe(&self) -> &str {
        match self {
            OptionMatcher::Exact(o) => &o.label,
            OptionMatcher::Label(l) => l,
        }
    }
}

pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

fn label_eq(a: &str, b: &str) -> bool {
    normalize_label(a) == normalize_label(b)
}

fn label_prefix_eq(a: &str, b: &str) -> bool {
    let a = normalize_label(a);
    let b = normalize_label(b);
    let a_prefix: String = a.chars().take(PREFIX_LEN).collect();
    let b_prefix: String = b.chars().take(PREFIX_LEN).collect();
    !a_prefix.is_empty() && a_prefix == b_prefix
}

/// Deduplicate by normalized label+value, keeping first occurrence order.
pub fn dedup_options(options: Vec<OptionEntry>) -> Vec<OptionEntry> {
    let mut seen = std::collections::HashSet::new();
    options
        .into_iter()
        .filter(|o| seen.insert((normalize_label(&o.label), o.value.clone())))
        .collect()
}
