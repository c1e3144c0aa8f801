//! Live-browser integration tests.
//!
//! These drive a real browser against the public sites and are ignored by
//! default. Run manually: `cargo test -- --ignored`

use std::path::Path;
use std::str::FromStr;

use dou_robo::browser::launch_headless_browser;
use dou_robo::cascade::FilterSpec;
use dou_robo::config::Config;
use dou_robo::models::{Plan, Site};
use dou_robo::orchestrator::{BatchOptions, BatchRunner, PoolKind};
use dou_robo::planner::{PlanBuilder, PlanRequest, PlanSource};
use dou_robo::utils::logging;

#[tokio::test]
#[ignore] // needs a browser and network access
async fn test_headless_browser_launch() {
    logging::init();

    let result = launch_headless_browser("about:blank").await;
    assert!(result.is_ok(), "headless browser should launch");
}

#[tokio::test]
#[ignore]
async fn test_live_plan_build_dou() {
    logging::init();

    let config = Config::from_env();
    let date = chrono::Local::now().format("%d-%m-%Y").to_string();

    let request = PlanRequest {
        site: Site::Dou,
        date,
        secao: "DO1".into(),
        filters: vec![
            FilterSpec::new(Some("^Minist"), None, Some(2)).unwrap(),
            FilterSpec::new(None, None, Some(1)).unwrap(),
        ],
        out_path: Path::new("plano-teste.json").to_path_buf(),
        overwrite: true,
    };

    let plan = PlanBuilder::new(&config)
        .build(PlanSource::Live, &request)
        .await
        .expect("live resolution should produce a plan");

    // at most 2 level-1 survivors × 1 level-2 survivor each
    assert!(plan.combos.len() <= 2);
}

#[tokio::test]
#[ignore]
async fn test_small_batch_run() {
    logging::init();

    let config = Config::from_env();
    let plan = Plan::load(Path::new("plano-teste.json")).expect("build plano-teste.json first");

    let options = BatchOptions {
        parallelism: 1,
        pool: PoolKind::from_str("task").unwrap(),
        retry_count: 1,
        job_timeout_secs: 180,
    };

    let report = BatchRunner::new(config)
        .run_batch(&plan, Site::Dou, &options)
        .await
        .expect("batch run should complete");

    assert_eq!(report.total_jobs, plan.combos.len());
}
