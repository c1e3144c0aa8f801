//! One bucket's worker loop.
//!
//! Jobs in a bucket run strictly sequentially on one executor so the
//! navigated page can be reused between jobs sharing `(date, secao)`. The
//! loop never lets an error escape: every outcome is a `JobResult`.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::models::job::Job;
use crate::models::report::{JobResult, JobState};
use crate::orchestrator::batch_runner::ExecutorFactory;
use crate::services::report_writer::ReportWriter;
use crate::workflow::job_ctx::JobCtx;
use crate::workflow::job_flow::ExecuteJob;

/// One job's outcome plus the path of its result file, when written.
pub type BucketOutcome = Vec<(JobResult, Option<String>)>;

/// Run every job of one bucket. Infallible by design: executor creation
/// failures and per-job errors all fold into failed `JobResult`s.
pub async fn run_bucket(
    factory: Arc<dyn ExecutorFactory>,
    bucket_index: usize,
    jobs: Vec<Job>,
    writer: ReportWriter,
) -> BucketOutcome {
    let mut outcomes = Vec::with_capacity(jobs.len());

    let mut executor = match factory.create().await {
        Ok(executor) => executor,
        Err(e) => {
            error!("[bucket {bucket_index}] worker setup failed: {e}");
            for job in &jobs {
                let result =
                    JobResult::failure(job.id.clone(), format!("worker setup failed: {e}"), 0);
                outcomes.push((result, None));
            }
            return outcomes;
        }
    };

    let total = jobs.len();
    for (position, job) in jobs.iter().enumerate() {
        let ctx = JobCtx::new(job.id.clone(), bucket_index, position + 1, total);
        let result = run_with_retries(executor.as_mut(), job, &ctx).await;

        if !result.success {
            // the page may be hung or mid-navigation; never hand it to the
            // next job
            recycle_or_replace(&factory, &mut executor, &ctx).await;
        }

        let output = if result.success {
            match writer.write_job_result(job, &result) {
                Ok(path) => Some(path.display().to_string()),
                Err(e) => {
                    warn!("{ctx} result file write failed: {e}");
                    None
                }
            }
        } else {
            None
        };
        outcomes.push((result, output));
    }

    info!("[bucket {bucket_index}] completed {total} job(s)");
    outcomes
}

/// The per-job state machine:
/// `Pending → Running → (Succeeded | Failed→Retrying→Running | Failed→Exhausted)`.
///
/// Transient failures retry with a recycled page up to `job.retry_count`
/// times. A wall-clock timeout skips retries entirely - a job that blew its
/// whole budget is stuck, not flaky.
async fn run_with_retries(executor: &mut dyn ExecuteJob, job: &Job, ctx: &JobCtx) -> JobResult {
    let budget = Duration::from_secs(job.timeout_secs);
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        log_state(ctx, JobState::Running, attempts);

        match tokio::time::timeout(budget, executor.run_job(job, ctx)).await {
            Err(_) => {
                log_state(ctx, JobState::Exhausted, attempts);
                return JobResult::failure(
                    job.id.clone(),
                    format!("job exceeded its {}s wall-clock budget", job.timeout_secs),
                    attempts,
                );
            }
            Ok(Ok(mut result)) => {
                result.attempts = attempts;
                log_state(ctx, JobState::Succeeded, attempts);
                return result;
            }
            Ok(Err(e)) => {
                if e.is_transient() && attempts <= job.retry_count {
                    log_state(ctx, JobState::Retrying, attempts);
                    warn!("{ctx} attempt {attempts} failed ({e}), retrying with a fresh page");
                    if let Err(recycle_err) = executor.recycle().await {
                        warn!("{ctx} recycle failed ({recycle_err}); retrying on the old page");
                    }
                    continue;
                }
                log_state(ctx, JobState::Exhausted, attempts);
                return JobResult::failure(job.id.clone(), e.to_string(), attempts);
            }
        }
    }
}

/// Recycle the executor's page; when even that fails, replace the whole
/// executor. A worker that cannot get a clean context fails its remaining
/// jobs quickly instead of poisoning them silently.
async fn recycle_or_replace(
    factory: &Arc<dyn ExecutorFactory>,
    executor: &mut Box<dyn ExecuteJob>,
    ctx: &JobCtx,
) {
    if executor.recycle().await.is_ok() {
        return;
    }
    warn!("{ctx} page recycle failed, replacing the browser session");
    match factory.create().await {
        Ok(fresh) => *executor = fresh,
        Err(e) => error!("{ctx} could not replace browser session: {e}"),
    }
}

fn log_state(ctx: &JobCtx, state: JobState, attempts: usize) {
    match state {
        JobState::Running => info!("{ctx} running (attempt {attempts})"),
        JobState::Succeeded => info!("{ctx} succeeded"),
        JobState::Retrying => info!("{ctx} retrying"),
        JobState::Exhausted => warn!("{ctx} exhausted after {attempts} attempt(s)"),
        JobState::Pending => {}
    }
}
