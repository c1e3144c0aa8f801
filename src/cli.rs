//! Command line surface.
//!
//! Thin by design: parse, build the request objects, dispatch. A batch run
//! with partial job failures still exits 0 - failure is data in the batch
//! report, not a process-level error. Non-zero exits are reserved for
//! unrecoverable setup problems (browser unavailable, lock held, malformed
//! plan).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use crate::cascade::filter::FilterSpec;
use crate::config::Config;
use crate::error::Result;
use crate::models::plan::Plan;
use crate::models::site::Site;
use crate::orchestrator::batch_runner::{self, BatchOptions, BatchRunner, PoolKind};
use crate::planner::builder::{PlanBuilder, PlanRequest, PlanSource};
use crate::planner::updater::PairsUpdater;
use crate::utils::logging;

/// dou-robo - batch automation for DOU and e-agendas listings.
#[derive(Parser, Debug)]
#[command(name = "dou-robo", version, about = "Cascade resolution and batch edition runs")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a plan from live resolution or a pairs artifact.
    Plan {
        /// Target site: dou | e-agendas
        #[arg(long, default_value = "dou")]
        site: String,

        /// Combo source: live | artifact | auto
        #[arg(long, default_value = "auto")]
        source: String,

        /// Edition date, DD-MM-YYYY (default: today).
        #[arg(long)]
        date: Option<String>,

        /// Default section for every combo.
        #[arg(long, default_value = "DO1")]
        secao: String,

        /// Level-1 selection regex.
        #[arg(long)]
        filter1: Option<String>,
        /// Level-1 pick list, comma separated labels.
        #[arg(long)]
        pick1: Option<String>,
        /// Level-1 survivor cap.
        #[arg(long)]
        limit1: Option<usize>,

        /// Level-2 selection regex.
        #[arg(long)]
        filter2: Option<String>,
        /// Level-2 pick list, comma separated labels.
        #[arg(long)]
        pick2: Option<String>,
        /// Level-2 survivor cap.
        #[arg(long)]
        limit2: Option<usize>,

        /// Level-3 selection regex (e-agendas only).
        #[arg(long)]
        filter3: Option<String>,
        /// Level-3 pick list, comma separated labels.
        #[arg(long)]
        pick3: Option<String>,
        /// Level-3 survivor cap.
        #[arg(long)]
        limit3: Option<usize>,

        /// Output plan path.
        #[arg(long, default_value = "plano.json")]
        out: PathBuf,

        /// Replace an existing plan file.
        #[arg(long)]
        overwrite: bool,
    },

    /// Execute a plan as a batch run.
    Run {
        /// Plan file path.
        plan: PathBuf,

        /// Target site: dou | e-agendas
        #[arg(long, default_value = "dou")]
        site: String,

        /// Concurrent bucket workers.
        #[arg(long)]
        parallel: Option<usize>,

        /// Worker pool: task | process (aliases: thread | subprocess).
        #[arg(long, default_value = "task")]
        pool: String,

        /// Retries per job on transient failure.
        #[arg(long)]
        retry: Option<usize>,

        /// Per-job wall-clock budget in seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Refresh a site's pairs artifact (full unfiltered traversal).
    UpdatePairs {
        /// Target site: dou | e-agendas
        #[arg(long, default_value = "dou")]
        site: String,

        /// Staleness threshold recorded in the artifact.
        #[arg(long, default_value_t = 7)]
        max_age_days: i64,

        /// Artifact path (default: the site's conventional path).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Process-pool child: run one bucket. Internal.
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        payload: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

/// Parse arguments and dispatch. Returns `Err` only for unrecoverable setup
/// failures.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env(),
    };

    match cli.command {
        Command::Plan {
            site,
            source,
            date,
            secao,
            filter1,
            pick1,
            limit1,
            filter2,
            pick2,
            limit2,
            filter3,
            pick3,
            limit3,
            out,
            overwrite,
        } => {
            let site = Site::from_str(&site)?;
            let source = PlanSource::from_str(&source)?;
            let date =
                date.unwrap_or_else(|| chrono::Local::now().format("%d-%m-%Y").to_string());
            let filters = vec![
                FilterSpec::new(filter1.as_deref(), split_picks(pick1), limit1)?,
                FilterSpec::new(filter2.as_deref(), split_picks(pick2), limit2)?,
                FilterSpec::new(filter3.as_deref(), split_picks(pick3), limit3)?,
            ];
            let request = PlanRequest {
                site,
                date,
                secao,
                filters,
                out_path: out,
                overwrite,
            };
            PlanBuilder::new(&config).build(source, &request).await?;
            Ok(())
        }

        Command::Run {
            plan,
            site,
            parallel,
            pool,
            retry,
            timeout,
        } => {
            let site = Site::from_str(&site)?;
            let plan = Plan::load(&plan)?;
            logging::init_run_log(&config.run_log_file)
                .map_err(|e| crate::error::AppError::Other(e.to_string()))?;

            let mut options = BatchOptions::from_config(&config);
            options.pool = PoolKind::from_str(&pool)?;
            if let Some(parallel) = parallel {
                options.parallelism = parallel;
            }
            if let Some(retry) = retry {
                options.retry_count = retry;
            }
            if let Some(timeout) = timeout {
                options.job_timeout_secs = timeout;
            }

            // partial failures are reported, not raised
            BatchRunner::new(config).run_batch(&plan, site, &options).await?;
            Ok(())
        }

        Command::UpdatePairs {
            site,
            max_age_days,
            out,
        } => {
            let site = Site::from_str(&site)?;
            PairsUpdater::new(&config).update(site, max_age_days, out).await?;
            Ok(())
        }

        Command::Worker { payload, out } => batch_runner::run_worker(&payload, &out).await,
    }
}

fn split_picks(picks: Option<String>) -> Option<Vec<String>> {
    picks.map(|p| {
        p.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
