//! Plan and pairs-artifact behavior on disk: round trips, overwrite
//! protection, malformation at load time, and the advisory staleness policy
//! (scenario: a 10-day-old artifact with a 7-day threshold still builds a
//! plan).

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use tempfile::tempdir;

use dou_robo::cascade::FilterSpec;
use dou_robo::config::{Config, ScrapeDefaults};
use dou_robo::dropdown::control::OptionEntry;
use dou_robo::error::AppError;
use dou_robo::models::pairs::{PairsArtifact, PairsBody, Staleness};
use dou_robo::models::{Combo, Plan, Site};
use dou_robo::planner::{PlanBuilder, PlanRequest, PlanSource};

fn sample_combo(label1: &str) -> Combo {
    let mk = |l: &str| OptionEntry {
        label: l.to_string(),
        value: l.to_string(),
        index: 0,
    };
    Combo::from_levels(&mk(label1), &mk("Todos"), None)
}

fn sample_body() -> PairsBody {
    let mut orgs = BTreeMap::new();
    orgs.insert(
        "Ministério da Fazenda".to_string(),
        vec!["Todos".to_string(), "Banco Central".to_string()],
    );
    orgs.insert("Presidência".to_string(), vec!["Todos".to_string()]);
    PairsBody::Pairs(orgs)
}

#[test]
fn plan_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plano.json");

    let plan = Plan::new(
        "01-01-2025".into(),
        "DO1".into(),
        ScrapeDefaults::default(),
        vec![sample_combo("Ministério da Fazenda")],
    );
    plan.save(&path, false).unwrap();

    let loaded = Plan::load(&path).unwrap();
    assert_eq!(loaded.date, "01-01-2025");
    assert_eq!(loaded.combos, plan.combos);
}

#[test]
fn save_refuses_silent_overwrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plano.json");

    let plan = Plan::new(
        "01-01-2025".into(),
        "DO1".into(),
        ScrapeDefaults::default(),
        vec![sample_combo("A")],
    );
    plan.save(&path, false).unwrap();

    let second = plan.save(&path, false);
    assert!(matches!(
        second,
        Err(AppError::Plan(dou_robo::error::PlanError::AlreadyExists { .. }))
    ));

    // explicit overwrite goes through
    plan.save(&path, true).unwrap();
}

#[test]
fn malformed_plan_fails_at_load_not_at_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plano.json");

    // missing secaoDefault entirely
    std::fs::write(&path, r#"{"date": "01-01-2025", "combos": []}"#).unwrap();
    assert!(Plan::load(&path).is_err());

    // bad date
    std::fs::write(
        &path,
        r#"{"date": "2025/01/01", "secaoDefault": "DO1", "defaults": {}, "combos": []}"#,
    )
    .unwrap();
    assert!(Plan::load(&path).is_err());

    // empty combo key
    std::fs::write(
        &path,
        r#"{"date": "01-01-2025", "secaoDefault": "DO1", "defaults": {}, "combos":
            [{"key1": "", "key2": "0", "label1": "A", "label2": "Todos", "topic": "a-todos"}]}"#,
    )
    .unwrap();
    assert!(Plan::load(&path).is_err());
}

#[tokio::test]
async fn artifact_mode_builds_plan_without_network() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.pairs_dir = dir.path().join("pares").display().to_string();

    let artifact = PairsArtifact::new("01-01-2025".into(), sample_body(), true, 7);
    artifact
        .save(&PairsArtifact::default_path(&config.pairs_dir, Site::Dou))
        .unwrap();

    let request = PlanRequest {
        site: Site::Dou,
        date: "01-01-2025".into(),
        secao: "DO1".into(),
        filters: vec![FilterSpec::new(Some("^Minist"), None, None).unwrap()],
        out_path: dir.path().join("plano.json"),
        overwrite: false,
    };
    let plan = PlanBuilder::new(&config)
        .build(PlanSource::Artifact, &request)
        .await
        .unwrap();

    assert_eq!(plan.combos.len(), 2);
    assert!(plan.combos.iter().all(|c| c.label1 == "Ministério da Fazenda"));
    assert!(request.out_path.exists());
}

#[tokio::test]
async fn stale_artifact_is_flagged_but_still_usable() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.pairs_dir = dir.path().join("pares").display().to_string();

    // 10 days old with a 7-day threshold
    let mut artifact = PairsArtifact::new("01-01-2025".into(), sample_body(), true, 7);
    artifact.metadata.timestamp = Utc::now() - Duration::days(10);
    artifact
        .save(&PairsArtifact::default_path(&config.pairs_dir, Site::Dou))
        .unwrap();

    let reloaded =
        PairsArtifact::load(&PairsArtifact::default_path(&config.pairs_dir, Site::Dou)).unwrap();
    assert!(matches!(
        reloaded.check_staleness(),
        Staleness::Stale { age_days: 10 }
    ));

    // staleness is advisory: artifact mode still builds the plan
    let request = PlanRequest {
        site: Site::Dou,
        date: "01-01-2025".into(),
        secao: "DO1".into(),
        filters: vec![],
        out_path: dir.path().join("plano.json"),
        overwrite: false,
    };
    let plan = PlanBuilder::new(&config)
        .build(PlanSource::Artifact, &request)
        .await
        .unwrap();
    assert_eq!(plan.combos.len(), 3);
}

#[tokio::test]
async fn auto_mode_uses_a_fresh_artifact() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.pairs_dir = dir.path().join("pares").display().to_string();

    let artifact = PairsArtifact::new("01-01-2025".into(), sample_body(), true, 7);
    artifact
        .save(&PairsArtifact::default_path(&config.pairs_dir, Site::Dou))
        .unwrap();

    let request = PlanRequest {
        site: Site::Dou,
        date: "01-01-2025".into(),
        secao: "DO1".into(),
        filters: vec![],
        out_path: dir.path().join("plano.json"),
        overwrite: false,
    };
    // fresh artifact: no live resolution, no browser
    let plan = PlanBuilder::new(&config)
        .build(PlanSource::Auto, &request)
        .await
        .unwrap();
    assert_eq!(plan.combos.len(), 3);
}

#[test]
fn missing_artifact_is_an_error_in_artifact_mode() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.pairs_dir = dir.path().join("vazio").display().to_string();

    let path = PairsArtifact::default_path(&config.pairs_dir, Site::Dou);
    assert!(PairsArtifact::load(&path).is_err());
}
