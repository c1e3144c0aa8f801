//! Job results and the run-level report.

use serde::{Deserialize, Serialize};

use crate::models::combo::Combo;

/// One listing entry scraped from a result page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub title: String,
    pub org_label: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_text: Option<String>,
}

/// Wall-clock milliseconds per executor phase. Collected for observability
/// and to justify the page-reuse optimization upstream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub nav: u64,
    pub view: u64,
    pub select: u64,
    pub collect: u64,
}

/// Per-job lifecycle. Terminal states are `Succeeded` and `Exhausted`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Retrying,
    Exhausted,
}

/// Outcome of one job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    /// Collection stopped early but at least one row was captured.
    #[serde(default)]
    pub partial: bool,
    pub items: Vec<ResultRow>,
    pub timings: PhaseTimings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Attempts consumed, including the successful one.
    #[serde(default)]
    pub attempts: usize,
}

impl JobResult {
    pub fn failure(job_id: String, error: String, attempts: usize) -> Self {
        Self {
            job_id,
            success: false,
            partial: false,
            items: Vec::new(),
            timings: PhaseTimings::default(),
            error: Some(error),
            attempts,
        }
    }
}

/// Per-job result file body: `{selecoes, itens, timings}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobResultFile {
    pub selecoes: Combo,
    pub itens: Vec<ResultRow>,
    pub timings: PhaseTimings,
}

/// Run-level aggregate, persisted once per batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total_jobs: usize,
    pub ok: usize,
    pub fail: usize,
    pub items_total: usize,
    pub outputs: Vec<String>,
}

impl BatchReport {
    /// Build from results in any completion order. The merge is commutative:
    /// counts are sums and outputs are sorted, so permuting the input yields
    /// an identical report.
    pub fn from_results(results: &[(JobResult, Option<String>)]) -> Self {
        let mut report = BatchReport {
            total_jobs: results.len(),
            ..Default::default()
        };
        for (result, output) in results {
            if result.success {
                report.ok += 1;
            } else {
                report.fail += 1;
            }
            report.items_total += result.items.len();
            if let Some(path) = output {
                report.outputs.push(path.clone());
            }
        }
        report.outputs.sort();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, success: bool, items: usize) -> JobResult {
        JobResult {
            job_id: id.to_string(),
            success,
            partial: false,
            items: (0..items)
                .map(|i| ResultRow {
                    title: format!("item {i}"),
                    org_label: "org".into(),
                    link: format!("https://example.gov.br/{i}"),
                    detail_url: None,
                    detail_text: None,
                })
                .collect(),
            timings: PhaseTimings::default(),
            error: None,
            attempts: 1,
        }
    }

    #[test]
    fn merge_is_commutative() {
        let a = (result("a", true, 2), Some("out/a.json".to_string()));
        let b = (result("b", false, 0), None);
        let c = (result("c", true, 3), Some("out/c.json".to_string()));

        let forward = BatchReport::from_results(&[a.clone(), b.clone(), c.clone()]);
        let backward = BatchReport::from_results(&[c, b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward.total_jobs, 3);
        assert_eq!(forward.ok, 2);
        assert_eq!(forward.fail, 1);
        assert_eq!(forward.items_total, 5);
    }
}
