//! Precomputed cascade snapshots ("pairs artifacts").
//!
//! A full Discovery+Reader traversal is slow (every selection is a server
//! round-trip), so an unattended updater snapshots it periodically. The plan
//! builder can then filter the snapshot in memory instead of driving the
//! site live. Staleness is advisory: an old artifact is flagged, never
//! rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{PlanError, Result};
use crate::models::site::Site;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PairsMetadata {
    /// Edition date the traversal ran against.
    pub source_date: String,
    /// Level-1 entry count at snapshot time.
    pub total_n1: usize,
    /// Leaf-path count at snapshot time.
    pub total_pairs: usize,
    /// Set by the unattended updater; hand-built artifacts leave it false.
    pub auto_generated: bool,
    pub max_age_days: i64,
    /// RFC 3339 snapshot instant.
    pub timestamp: DateTime<Utc>,
}

/// Snapshot body: two levels for DOU, three for e-agendas. Labels double as
/// keys here; the live replay tolerates drift via prefix matching.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PairsBody {
    /// org label → sub-org labels.
    Pairs(BTreeMap<String, Vec<String>>),
    /// org label → role label → person labels.
    Hierarchy(BTreeMap<String, BTreeMap<String, Vec<String>>>),
}

impl PairsBody {
    pub fn levels(&self) -> usize {
        match self {
            PairsBody::Pairs(_) => 2,
            PairsBody::Hierarchy(_) => 3,
        }
    }

    pub fn total_n1(&self) -> usize {
        match self {
            PairsBody::Pairs(m) => m.len(),
            PairsBody::Hierarchy(m) => m.len(),
        }
    }

    pub fn total_pairs(&self) -> usize {
        match self {
            PairsBody::Pairs(m) => m.values().map(Vec::len).sum(),
            PairsBody::Hierarchy(m) => m
                .values()
                .flat_map(|roles| roles.values().map(Vec::len))
                .sum(),
        }
    }
}

/// Staleness verdict for an artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    Stale { age_days: i64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PairsArtifact {
    #[serde(rename = "_metadata")]
    pub metadata: PairsMetadata,
    pub pairs: PairsBody,
}

impl PairsArtifact {
    pub fn new(source_date: String, body: PairsBody, auto_generated: bool, max_age_days: i64) -> Self {
        let metadata = PairsMetadata {
            source_date,
            total_n1: body.total_n1(),
            total_pairs: body.total_pairs(),
            auto_generated,
            max_age_days,
            timestamp: Utc::now(),
        };
        Self {
            metadata,
            pairs: body,
        }
    }

    pub fn body(&self) -> &PairsBody {
        &self.pairs
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlanError::ArtifactNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)?;
        let artifact: PairsArtifact = serde_json::from_str(&content)?;
        Ok(artifact)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(
            "pairs artifact written to {} ({} level-1 entries, {} paths)",
            path.display(),
            self.metadata.total_n1,
            self.metadata.total_pairs
        );
        Ok(())
    }

    /// Conventional artifact path for a site.
    pub fn default_path(pairs_dir: &str, site: Site) -> std::path::PathBuf {
        Path::new(pairs_dir).join(format!("pares-{site}.json"))
    }

    pub fn staleness_at(&self, now: DateTime<Utc>) -> Staleness {
        let age_days = (now - self.metadata.timestamp).num_days();
        if age_days > self.metadata.max_age_days {
            Staleness::Stale { age_days }
        } else {
            Staleness::Fresh
        }
    }

    /// Staleness check with the advisory warning. Returns the verdict so
    /// callers that want to fall back (auto mode) can.
    pub fn check_staleness(&self) -> Staleness {
        let verdict = self.staleness_at(Utc::now());
        if let Staleness::Stale { age_days } = verdict {
            warn!(
                "pairs artifact is {} day(s) old (max {}); results may be stale",
                age_days, self.metadata.max_age_days
            );
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn two_level_body() -> PairsBody {
        let mut m = BTreeMap::new();
        m.insert(
            "Ministério da Fazenda".to_string(),
            vec!["Todos".to_string(), "Banco Central".to_string()],
        );
        PairsBody::Pairs(m)
    }

    #[test]
    fn counts_paths() {
        let body = two_level_body();
        assert_eq!(body.total_n1(), 1);
        assert_eq!(body.total_pairs(), 2);
    }

    #[test]
    fn staleness_is_advisory_and_threshold_based() {
        let artifact = PairsArtifact::new("01-01-2025".into(), two_level_body(), true, 7);
        let now = artifact.metadata.timestamp;
        assert_eq!(artifact.staleness_at(now), Staleness::Fresh);
        assert_eq!(
            artifact.staleness_at(now + Duration::days(10)),
            Staleness::Stale { age_days: 10 }
        );
    }

    #[test]
    fn round_trips_with_metadata_key() {
        let artifact = PairsArtifact::new("01-01-2025".into(), two_level_body(), false, 7);
        let json = serde_json::to_string(&artifact).unwrap();
        assert!(json.contains("\"_metadata\""));
        let back: PairsArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back.metadata.total_pairs, 2);
        assert_eq!(back.body().levels(), 2);
    }

    #[test]
    fn hierarchy_body_round_trips() {
        let mut roles = BTreeMap::new();
        roles.insert("Ministro".to_string(), vec!["Fulano".to_string()]);
        let mut orgs = BTreeMap::new();
        orgs.insert("CGU".to_string(), roles);
        let artifact =
            PairsArtifact::new("01-01-2025".into(), PairsBody::Hierarchy(orgs), true, 7);
        let json = serde_json::to_string(&artifact).unwrap();
        let back: PairsArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back.body().levels(), 3);
        assert_eq!(back.metadata.total_pairs, 1);
    }
}
