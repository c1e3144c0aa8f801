//! Result persistence.
//!
//! One JSON file per job plus the run-level batch report. File names are
//! deterministic so re-runs overwrite their own output and the aggregator
//! can find everything from the report alone.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::models::combo::slugify;
use crate::models::job::Job;
use crate::models::report::{BatchReport, JobResult, JobResultFile};

#[derive(Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Deterministic per-job file name: topic + date + section + index.
    pub fn job_file_name(job: &Job) -> String {
        format!(
            "{}-{}-{}-{:03}.json",
            job.combo.topic,
            job.date,
            slugify(&job.secao),
            job.index
        )
    }

    /// Persist one job's `{selecoes, itens, timings}` file.
    pub fn write_job_result(&self, job: &Job, result: &JobResult) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(Self::job_file_name(job));
        let file = JobResultFile {
            selecoes: job.combo.clone(),
            itens: result.items.clone(),
            timings: result.timings,
        };
        std::fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        Ok(path)
    }

    /// Persist the run-level report.
    pub fn write_batch_report(&self, report: &BatchReport, date: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("relatorio-{date}.json"));
        std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
        info!(
            "batch report written to {}: {}/{} ok, {} item(s)",
            path.display(),
            report.ok,
            report.total_jobs,
            report.items_total
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrapeDefaults;
    use crate::dropdown::control::OptionEntry;
    use crate::models::combo::Combo;
    use crate::models::plan::Plan;
    use crate::models::report::PhaseTimings;
    use crate::models::site::Site;
    use tempfile::tempdir;

    fn sample_job() -> Job {
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
        let plan = Plan::new(
            "01-01-2025".into(),
            "DO1".into(),
            ScrapeDefaults::default(),
            vec![combo],
        );
        Job::from_plan(&plan, Site::Dou, 2, 300).remove(0)
    }

    #[test]
    fn file_name_is_deterministic() {
        let job = sample_job();
        assert_eq!(
            ReportWriter::job_file_name(&job),
            "ministério-da-fazenda-todos-01-01-2025-do1-000.json"
        );
    }

    #[test]
    fn job_file_round_trips() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let job = sample_job();
        let result = JobResult {
            job_id: job.id.clone(),
            success: true,
            partial: false,
            items: vec![],
            timings: PhaseTimings::default(),
            error: None,
            attempts: 1,
        };
        let path = writer.write_job_result(&job, &result).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let back: JobResultFile = serde_json::from_str(&content).unwrap();
        assert_eq!(back.selecoes, job.combo);
    }
}
