//! Runtime configuration.
//!
//! Defaults cover a normal run against the public sites; every field can be
//! overridden from the environment, and a TOML file can replace the whole
//! block when batches are driven unattended.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Program configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How many bucket workers run at once.
    pub max_parallel_buckets: usize,
    /// Debug port of an already-running browser. When 0, a headless
    /// instance is launched per worker instead.
    pub browser_debug_port: u16,
    /// DOU reading URL; `{date}` and `{secao}` are substituted.
    pub dou_url: String,
    /// e-agendas root URL.
    pub eagendas_url: String,
    /// Directory for per-job result files and the batch report.
    pub output_dir: String,
    /// Directory holding pairs artifacts.
    pub pairs_dir: String,
    /// Run-level plain text log file.
    pub run_log_file: String,
    /// Retries per job on transient failure.
    pub retry_count: usize,
    /// Overall wall-clock budget per job, in seconds.
    pub job_timeout_secs: u64,
    /// Wait tuning for the polling primitive.
    pub waits: WaitTuning,
    /// Shared scraping knobs merged into every combo of a plan.
    pub defaults: ScrapeDefaults,
}

/// Timeout classes for the condition-polling primitive. All waits in the
/// crate use one of these; none of them is a fixed sleep.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitTuning {
    /// Poll interval for every conditional wait.
    pub poll_ms: u64,
    /// Cheap DOM settles: control open, view switch.
    pub settle_ms: u64,
    /// Option list population after opening a control.
    pub options_ms: u64,
    /// Dependent-level repopulation after a selection. This is the slowest,
    /// most failure-prone wait in the system (full server round-trip).
    pub repopulate_ms: u64,
    /// Page navigation.
    pub navigation_ms: u64,
}

impl Default for WaitTuning {
    fn default() -> Self {
        Self {
            poll_ms: 50,
            settle_ms: 500,
            options_ms: 2_000,
            repopulate_ms: 15_000,
            navigation_ms: 30_000,
        }
    }
}

/// Scraping knobs shared by every job of a plan. Persisted inside the plan
/// document so a batch run is reproducible from the file alone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrapeDefaults {
    /// Stop collecting after this many result rows.
    pub max_results: usize,
    /// Pause between scroll rounds while collecting, in ms.
    pub scroll_pause_ms: u64,
    /// Stop scrolling after this many consecutive rounds without new rows.
    pub scroll_stable_rounds: usize,
    /// Hard cap on scroll rounds.
    pub max_scroll_rounds: usize,
    /// Characters kept when summarizing detail text.
    pub summary_chars: usize,
    /// Whether to visit each result link for full text.
    pub fetch_details: bool,
}

impl Default for ScrapeDefaults {
    fn default() -> Self {
        Self {
            max_results: 200,
            scroll_pause_ms: 400,
            scroll_stable_rounds: 3,
            max_scroll_rounds: 40,
            summary_chars: 600,
            fetch_details: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_parallel_buckets: 3,
            browser_debug_port: 0,
            dou_url: "https://www.in.gov.br/leiturajornal?data={date}&secao={secao}".to_string(),
            eagendas_url: "https://eagendas.cgu.gov.br/".to_string(),
            output_dir: "saida".to_string(),
            pairs_dir: "pares".to_string(),
            run_log_file: "execucao.log".to_string(),
            retry_count: 2,
            job_timeout_secs: 300,
            waits: WaitTuning::default(),
            defaults: ScrapeDefaults::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_parallel_buckets: env_parse("DOU_ROBO_PARALLEL", default.max_parallel_buckets),
            browser_debug_port: env_parse("DOU_ROBO_DEBUG_PORT", default.browser_debug_port),
            dou_url: std::env::var("DOU_ROBO_DOU_URL").unwrap_or(default.dou_url),
            eagendas_url: std::env::var("DOU_ROBO_EAGENDAS_URL").unwrap_or(default.eagendas_url),
            output_dir: std::env::var("DOU_ROBO_OUTPUT_DIR").unwrap_or(default.output_dir),
            pairs_dir: std::env::var("DOU_ROBO_PAIRS_DIR").unwrap_or(default.pairs_dir),
            run_log_file: std::env::var("DOU_ROBO_RUN_LOG").unwrap_or(default.run_log_file),
            retry_count: env_parse("DOU_ROBO_RETRY", default.retry_count),
            job_timeout_secs: env_parse("DOU_ROBO_JOB_TIMEOUT", default.job_timeout_secs),
            waits: default.waits,
            defaults: default.defaults,
        }
    }

    /// Load a full configuration from a TOML file, environment on top.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = Config::default();
        assert!(c.waits.poll_ms < c.waits.settle_ms);
        assert!(c.waits.options_ms < c.waits.repopulate_ms);
        assert!(c.defaults.scroll_stable_rounds < c.defaults.max_scroll_rounds);
    }

    #[test]
    fn toml_round_trip() {
        let c = Config::default();
        let s = toml::to_string(&c).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.max_parallel_buckets, c.max_parallel_buckets);
        assert_eq!(back.defaults, c.defaults);
    }
}
