//! Tests for command handlers and their text output

use super::common::CommandContext;
use super::query::*;
use super::update::{format_report as format_sync_report, run_update, UpdateParams};
use crate::cli::types::{PitcherId, Season};
use crate::config::Config;
use crate::metrics::FipConstants;
use crate::provider::RetryPolicy;
use crate::query::Bucket;
use crate::storage::{DatabaseLocation, PitcherFilter, Repository};
use crate::sync::{CancelFlag, UnitStatus};
use crate::testing::{date, raw_game, raw_pitcher, team, FakeSource};
use crate::Metric;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

fn test_config() -> Config {
    Config {
        database: DatabaseLocation::InMemory,
        provider_url: "http://127.0.0.1:1".to_string(),
        min_request_interval: Duration::ZERO,
        retry: RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        },
        request_timeout: Duration::from_secs(1),
        fip_constants: FipConstants::new().with(Season::new(2024), 3.166),
        current_season: Season::new(2024),
        log_level: "info".to_string(),
    }
}

fn context() -> CommandContext {
    CommandContext::new(test_config()).unwrap()
}

fn params(codes: &[&str]) -> UpdateParams {
    UpdateParams {
        teams: codes.iter().map(|c| team(c)).collect(),
        years: 1,
        force: false,
        clear_db: false,
        as_json: false,
    }
}

fn starter_game(game_pk: u64, on: &str, away: &str, innings: &str, earned_runs: u32) -> Value {
    let starter = raw_pitcher(10, "Home Starter", "NYY", innings, earned_runs);
    raw_game(game_pk, on, "NYY", away, vec![starter])
}

async fn synced_context() -> CommandContext {
    let ctx = context();
    let source = FakeSource::new();
    source.push_games(
        "NYY",
        0,
        vec![
            starter_game(1, "2024-04-10", "BOS", "6.0", 2),
            starter_game(2, "2024-04-16", "TOR", "5.1", 1),
        ],
        None,
    );
    run_update(&ctx, source, &params(&["NYY"]), date(2024, 5, 1), &CancelFlag::new())
        .await
        .unwrap();
    ctx
}

#[tokio::test]
async fn test_run_update_and_report_text() {
    let ctx = context();
    let source = FakeSource::new();
    source.push_games(
        "NYY",
        0,
        vec![starter_game(1, "2024-04-10", "BOS", "6.0", 2)],
        None,
    );
    source.push("BOS", 0, Err(crate::provider::SourceError::Fatal("HTTP 500".into())));

    let report = run_update(
        &ctx,
        source,
        &params(&["NYY", "BOS"]),
        date(2024, 5, 1),
        &CancelFlag::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.units[0].status, UnitStatus::Complete);
    assert_eq!(report.units[1].status, UnitStatus::Failed);
    assert_eq!(report.exit_code(), 1);

    let text = format_sync_report(&report);
    assert!(text.contains("NYY 2024"));
    assert!(text.contains("1 complete, 1 failed"));
    assert!(text.contains("Failed units:"));
    assert!(text.contains("BOS 2024: provider unavailable"));
}

#[tokio::test]
async fn test_run_update_clear_db() {
    let ctx = synced_context().await;
    assert_eq!(ctx.repo.counts().unwrap().appearances, 2);

    let mut clear = params(&["NYY"]);
    clear.clear_db = true;
    run_update(&ctx, FakeSource::new(), &clear, date(2024, 5, 1), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(ctx.repo.counts().unwrap().appearances, 0);
}

#[tokio::test]
async fn test_search_text() {
    let ctx = synced_context().await;
    let results = ctx
        .query_service()
        .search(&PitcherFilter {
            name: Some("starter".into()),
            ..Default::default()
        })
        .unwrap();

    let text = format_search(&results);
    assert!(text.contains("Home Starter"));
    assert!(text.contains("apps=2"));
    assert!(text.contains("2024-04-10..2024-04-16"));
    assert!(text.contains("NYY 2024"));
    assert!(!text.contains("incomplete sync"));
}

#[tokio::test]
async fn test_series_and_report_text() {
    let ctx = synced_context().await;
    let service = ctx.query_service();

    let series = service
        .time_series(PitcherId::new(10), &Metric::Era, None, Bucket::Game)
        .unwrap();
    let text = format_series(&series);
    assert!(text.starts_with("Pitcher 10 era by game"));
    assert!(text.contains("2024-04-10      3.000"));

    let report = service.pitcher_report(PitcherId::new(10), None).unwrap();
    let text = format_report(&report);
    assert!(text.contains("(all games)"));
    assert!(text.contains("IP 11.1"));
    assert!(text.contains("FF"));
}

#[tokio::test]
async fn test_appearances_and_status_text() {
    let ctx = synced_context().await;
    let service = ctx.query_service();

    let apps = service.appearances(PitcherId::new(10), None).unwrap();
    let text = format_appearances(&apps);
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("IP   5.1"));

    let states = service.sync_status(None).unwrap();
    let text = format_status(&states);
    assert!(text.starts_with("NYY 2024"));
    assert!(text.contains("complete"));
    assert!(text.contains("2024-03-01..2024-05-01"));

    assert_eq!(format_status(&[]), "No sync history.\n");
    assert_eq!(format_appearances(&[]), "No appearances found.\n");
}

#[test]
fn test_context_with_repository_shares_store() {
    let repo = Arc::new(Repository::open_in_memory().unwrap());
    let ctx = CommandContext::with_repository(test_config(), Arc::clone(&repo));
    assert!(Arc::ptr_eq(&ctx.repo, &repo));
    assert_eq!(
        ctx.engine().fip_constants().get(Season::new(2024)),
        Some(3.166)
    );
}

#[tokio::test]
async fn test_trend_texts() {
    let ctx = synced_context().await;
    let service = ctx.query_service();
    let pitcher = PitcherId::new(10);

    let trend = service
        .metric_trend(pitcher, &Metric::Era, None, Bucket::Game, 2)
        .unwrap();
    let text = format_trend(&trend);
    assert!(text.starts_with("Pitcher 10 era by game, rolling 2"));
    assert!(text.contains("2024-04-10      3.000  avg     3.000  stable"));
    assert!(text.lines().nth(2).unwrap().ends_with("decreasing"));

    let cmp = service
        .compare_periods(
            pitcher,
            &Metric::Era,
            "2024-04-01..2024-04-12".parse().unwrap(),
            "2024-04-13..2024-04-30".parse().unwrap(),
        )
        .unwrap();
    let text = format_periods(&cmp);
    assert!(text.contains("A 2024-04-01..2024-04-12"));
    assert!(text.contains("n=1"));
    assert!(text.lines().any(|l| l.starts_with("median")));
    assert_eq!(text.lines().count(), 7);

    let months = service.monthly_stats(pitcher, &Metric::Era, None).unwrap();
    assert!(format_monthly(&months).starts_with("2024-04  n=2"));
    assert_eq!(format_monthly(&[]), "No games found.\n");

    let changes = service
        .performance_changes(pitcher, &Metric::Era, None, 10, 1.5)
        .unwrap();
    let text = format_changes(&changes);
    assert!(text.contains("2 values, window 10"));
    assert!(text.contains("No significant changes."));

    let seasons = service.season_trend(pitcher, &Metric::Era, &[]).unwrap();
    let text = format_season_trend(&seasons);
    // 3 ER over 34 outs
    assert!(text.contains("2024      2.382"));
    assert!(text.contains("overall stable"));
    assert!(text.contains("high 2.382 (2024)"));
}
