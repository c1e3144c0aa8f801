//! One fully-resolved selection path.

use serde::{Deserialize, Serialize};

use crate::dropdown::control::OptionEntry;

/// A resolved path through the cascade: one option per level, plus the
/// derived topic used for result file names. Wire-compatible with the plan
/// document; never mutated after creation (plan-level editing replaces
/// entries wholesale).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Combo {
    pub key1: String,
    pub key2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key3: Option<String>,
    pub label1: String,
    pub label2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label3: Option<String>,
    pub topic: String,
    /// Per-combo section override; the plan's `secaoDefault` applies when
    /// absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secao: Option<String>,
}

impl Combo {
    pub fn from_levels(l1: &OptionEntry, l2: &OptionEntry, l3: Option<&OptionEntry>) -> Self {
        let topic = derive_topic(&l1.label, &l2.label, l3.map(|o| o.label.as_str()));
        Self {
            key1: l1.value.clone(),
            key2: l2.value.clone(),
            key3: l3.map(|o| o.value.clone()),
            label1: l1.label.clone(),
            label2: l2.label.clone(),
            label3: l3.map(|o| o.label.clone()),
            topic,
            secao: None,
        }
    }

    /// Structural validity: every level present must carry a key.
    pub fn is_well_formed(&self) -> bool {
        !self.key1.trim().is_empty()
            && !self.key2.trim().is_empty()
            && self.key3.as_deref().map(|k| !k.trim().is_empty()).unwrap_or(true)
    }
}

/// Filesystem-safe topic from the level labels.
fn derive_topic(l1: &str, l2: &str, l3: Option<&str>) -> String {
    let joined = match l3 {
        Some(l3) => format!("{l1} {l2} {l3}"),
        None => format!("{l1} {l2}"),
    };
    slugify(&joined)
}

/// Lowercase, alphanumerics kept, everything else collapsed to single
/// hyphens. Accented characters survive (they are valid in file names and
/// keep topics readable).
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_hyphen = true;
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
