//! Orchestration layer.
//!
//! ## Responsibilities
//!
//! The command center of a batch run: turn a plan into jobs, partition them
//! into buckets, drive the worker pool, and aggregate the report.
//!
//! ### `batch_runner` - batch scheduler
//! - Derives jobs from the plan and groups them into buckets by
//!   `(date, secao)` so workers can reuse a navigated page
//! - Runs one worker per bucket: tokio tasks (`task` pool) or one child
//!   process per bucket (`process` pool, full crash containment)
//! - Aggregates every job result into the commutative batch report
//!
//! ### `bucket_worker` - one bucket's sequential loop
//! - Owns one executor (one browser session) for the bucket's lifetime
//! - Applies the per-job retry policy: transient failures retry with a
//!   recycled page, deterministic failures and wall-clock timeouts do not
//! - Persists each job's result file as it completes
//!
//! ## Layering
//!
//! ```text
//! batch_runner (Vec<Job> → buckets → BatchReport)
//!     ↓
//! bucket_worker (sequential jobs on one executor)
//!     ↓
//! workflow::EditionRunner (one job: navigate/view/select/collect)
//!     ↓
//! services / dropdown (capabilities)
//!     ↓
//! infrastructure (PageDriver, wait primitive)
//! ```
//!
//! Raw errors never escape a worker: every failure becomes a `JobResult`
//! with an error string, so a crashed worker and an exhausted retry look the
//! same to the scheduler - and to the report.

pub mod batch_runner;
pub mod bucket_worker;

pub use batch_runner::{
    partition_into_buckets, BatchOptions, BatchRunner, ExecutorFactory, PoolKind,
};
