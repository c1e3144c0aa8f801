//! Batch scheduler.
//!
//! Partitions a plan's jobs into buckets, runs one worker per bucket under
//! the chosen pool kind, and folds every outcome into the batch report. A
//! failing bucket never aborts its siblings; the report is the single source
//! of truth for what happened.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::job::Job;
use crate::models::plan::Plan;
use crate::models::report::{BatchReport, JobResult};
use crate::models::site::Site;
use crate::orchestrator::bucket_worker::{run_bucket, BucketOutcome};
use crate::services::report_writer::ReportWriter;
use crate::services::run_lock::RunLock;
use crate::workflow::job_flow::{EditionRunner, ExecuteJob};

/// Worker pool kind.
///
/// `Task` runs buckets as tokio tasks in this process - cheap, but a
/// process-level fault takes every bucket down. `Process` runs one child
/// process per bucket for full crash containment at higher startup cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolKind {
    Task,
    Process,
}

impl FromStr for PoolKind {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task" | "thread" => Ok(PoolKind::Task),
            "process" | "subprocess" => Ok(PoolKind::Process),
            other => Err(AppError::Other(format!("unknown pool kind: {other}"))),
        }
    }
}

/// Scheduler knobs for one batch run.
#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub parallelism: usize,
    pub pool: PoolKind,
    pub retry_count: usize,
    pub job_timeout_secs: u64,
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            parallelism: config.max_parallel_buckets,
            pool: PoolKind::Task,
            retry_count: config.retry_count,
            job_timeout_secs: config.job_timeout_secs,
        }
    }
}

/// Creates one executor per bucket worker. The live factory launches a
/// browser; tests script outcomes instead.
#[async_trait]
pub trait ExecutorFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn ExecuteJob>>;
}

/// Launches one browser session per bucket.
pub struct LiveExecutorFactory {
    config: Config,
}

impl LiveExecutorFactory {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ExecutorFactory for LiveExecutorFactory {
    async fn create(&self) -> Result<Box<dyn ExecuteJob>> {
        let runner = EditionRunner::launch(self.config.clone()).await?;
        Ok(Box::new(runner))
    }
}

/// Group jobs into at most `parallelism` buckets, keeping jobs that share a
/// `(date, secao)` reuse key in the same bucket so one navigated page serves
/// them all. Groups are placed greedily on the least-loaded bucket; job
/// order within a group is preserved.
pub fn partition_into_buckets(jobs: Vec<Job>, parallelism: usize) -> Vec<Vec<Job>> {
    let bucket_count = parallelism.max(1);

    // group by reuse key, preserving first-seen order
    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Vec<Job>> = HashMap::new();
    for job in jobs {
        let key = job.reuse_key();
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(job);
    }

    let mut buckets: Vec<Vec<Job>> = vec![Vec::new(); bucket_count];
    // biggest groups first so the greedy placement balances
    order.sort_by_key(|key| std::cmp::Reverse(groups[key].len()));
    for key in order {
        let group = groups.remove(&key).expect("group exists for ordered key");
        let target = buckets
            .iter()
            .enumerate()
            .min_by_key(|(_, b)| b.len())
            .map(|(i, _)| i)
            .expect("bucket_count >= 1");
        buckets[target].extend(group);
    }

    buckets.retain(|b| !b.is_empty());
    buckets
}

/// The batch scheduler.
pub struct BatchRunner {
    config: Config,
    factory: Arc<dyn ExecutorFactory>,
}

impl BatchRunner {
    pub fn new(config: Config) -> Self {
        let factory = Arc::new(LiveExecutorFactory::new(config.clone()));
        Self { config, factory }
    }

    /// Scheduler with an injected factory; the task pool then runs without a
    /// browser. Used by tests.
    pub fn with_factory(config: Config, factory: Arc<dyn ExecutorFactory>) -> Self {
        Self { config, factory }
    }

    /// Execute every job of the plan and persist the batch report.
    ///
    /// Partial job failures are data, not errors: the returned report carries
    /// them and the call still succeeds. Only setup problems (lock held,
    /// unwritable output) error out.
    pub async fn run_batch(
        &self,
        plan: &Plan,
        site: Site,
        options: &BatchOptions,
    ) -> Result<BatchReport> {
        let _lock = RunLock::acquire(Path::new(&self.config.output_dir))?;
        let writer = ReportWriter::new(&self.config.output_dir);

        let jobs = Job::from_plan(plan, site, options.retry_count, options.job_timeout_secs);
        let buckets = partition_into_buckets(jobs, options.parallelism);
        log_batch_start(plan, options, buckets.len());

        let outcomes = match options.pool {
            PoolKind::Task => self.run_task_pool(buckets, &writer).await,
            PoolKind::Process => self.run_process_pool(buckets).await?,
        };

        let report = BatchReport::from_results(&outcomes);
        writer.write_batch_report(&report, &plan.date)?;
        log_batch_complete(&report);
        Ok(report)
    }

    /// One tokio task per bucket. The bucket count is the concurrency bound:
    /// partitioning never yields more buckets than `parallelism`.
    async fn run_task_pool(
        &self,
        buckets: Vec<Vec<Job>>,
        writer: &ReportWriter,
    ) -> Vec<(JobResult, Option<String>)> {
        let mut handles = Vec::with_capacity(buckets.len());
        for (bucket_index, bucket) in buckets.into_iter().enumerate() {
            let factory = self.factory.clone();
            let writer = writer.clone();
            let handle = tokio::spawn(async move {
                run_bucket(factory, bucket_index, bucket, writer).await
            });
            handles.push((bucket_index, handle));
        }

        let mut outcomes = Vec::new();
        for (bucket_index, handle) in handles {
            match handle.await {
                Ok(mut bucket_outcomes) => outcomes.append(&mut bucket_outcomes),
                Err(e) => {
                    // a panicked bucket loses its per-job attribution; the
                    // report still counts the bucket as failed work
                    error!("[bucket {bucket_index}] worker panicked: {e}");
                }
            }
        }
        outcomes
    }

    /// One child process per bucket. A crashed child is indistinguishable
    /// from a bucket whose jobs all exhausted their retries.
    async fn run_process_pool(
        &self,
        buckets: Vec<Vec<Job>>,
    ) -> Result<Vec<(JobResult, Option<String>)>> {
        let exe = std::env::current_exe()?;
        let scratch = Path::new(&self.config.output_dir).join("worker-scratch");
        std::fs::create_dir_all(&scratch)?;

        let mut children = Vec::with_capacity(buckets.len());
        for (bucket_index, bucket) in buckets.into_iter().enumerate() {
            let payload_path = scratch.join(format!("bucket-{bucket_index}.json"));
            let out_path = scratch.join(format!("bucket-{bucket_index}-out.json"));
            let payload = WorkerPayload {
                bucket_index,
                jobs: bucket.clone(),
                config: self.config.clone(),
            };
            std::fs::write(&payload_path, serde_json::to_string(&payload)?)?;

            let child = tokio::process::Command::new(&exe)
                .arg("worker")
                .arg("--payload")
                .arg(&payload_path)
                .arg("--out")
                .arg(&out_path)
                .spawn()?;
            children.push((bucket_index, bucket, out_path, child));
        }

        let mut outcomes = Vec::new();
        for (bucket_index, bucket, out_path, mut child) in children {
            let clean_exit = match child.wait().await {
                Ok(status) => status.success(),
                Err(e) => {
                    warn!("[bucket {bucket_index}] could not wait on worker: {e}");
                    false
                }
            };
            match read_worker_output(&out_path) {
                Some(entries) => {
                    outcomes.extend(entries.into_iter().map(|e| (e.result, e.output)));
                }
                None => {
                    error!(
                        "[bucket {bucket_index}] worker produced no output (clean exit: {clean_exit})"
                    );
                    for job in &bucket {
                        outcomes.push((
                            JobResult::failure(job.id.clone(), "worker process died".into(), 0),
                            None,
                        ));
                    }
                }
            }
        }
        Ok(outcomes)
    }
}

/// What a process-pool child receives.
#[derive(Serialize, Deserialize)]
pub struct WorkerPayload {
    pub bucket_index: usize,
    pub jobs: Vec<Job>,
    pub config: Config,
}

/// What a process-pool child writes back.
#[derive(Serialize, Deserialize)]
pub struct WorkerOutput {
    pub entries: Vec<WorkerEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct WorkerEntry {
    pub result: JobResult,
    pub output: Option<String>,
}

fn read_worker_output(path: &Path) -> Option<Vec<WorkerEntry>> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str::<WorkerOutput>(&content)
        .ok()
        .map(|o| o.entries)
}

/// Process-pool child entry point: run one bucket and write the outcome
/// file. Called from the hidden `worker` CLI command.
pub async fn run_worker(payload_path: &Path, out_path: &Path) -> Result<()> {
    let payload: WorkerPayload = serde_json::from_str(&std::fs::read_to_string(payload_path)?)?;
    let factory: Arc<dyn ExecutorFactory> =
        Arc::new(LiveExecutorFactory::new(payload.config.clone()));
    let writer = ReportWriter::new(&payload.config.output_dir);

    let outcomes: BucketOutcome =
        run_bucket(factory, payload.bucket_index, payload.jobs, writer).await;

    let output = WorkerOutput {
        entries: outcomes
            .into_iter()
            .map(|(result, output)| WorkerEntry { result, output })
            .collect(),
    };
    std::fs::write(out_path, serde_json::to_string(&output)?)?;
    Ok(())
}

// ========== log helpers ==========

fn log_batch_start(plan: &Plan, options: &BatchOptions, bucket_count: usize) {
    info!("{}", "=".repeat(60));
    info!(
        "batch run: {} combo(s) for {} / {}",
        plan.combos.len(),
        plan.date,
        plan.secao_default
    );
    info!(
        "{} bucket(s), pool {:?}, {} retr(y/ies), {}s job budget",
        bucket_count, options.pool, options.retry_count, options.job_timeout_secs
    );
    info!("{}", "=".repeat(60));
}

fn log_batch_complete(report: &BatchReport) {
    info!("{}", "=".repeat(60));
    info!(
        "batch complete: {} ok, {} failed, {} item(s) collected",
        report.ok, report.fail, report.items_total
    );
    info!("{}", "=".repeat(60));
}
