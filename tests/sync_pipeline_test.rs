//! End-to-end tests: scripted provider -> sync -> store -> queries

use chrono::NaiveDate;
use mlb_pitchers::{
    provider::{RawPage, SourceError},
    storage::{PitcherFilter, SyncStatus, SyncUnit},
    sync::{SkipReason, UnitStatus},
    Bucket, CancelFlag, DateRange, FipConstants, Metric, MetricValue, MetricsEngine, PitcherId,
    ProviderClient, QueryService, Repository, RetryPolicy, Season, StatsSource, SyncOrchestrator,
    SyncRequest, SyncSettings, TeamCode,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider stand-in serving every game of a team from one page, filtered
/// to the requested range. Teams listed in `down` always fail.
#[derive(Default)]
struct LeagueSource {
    games: HashMap<String, Vec<Value>>,
    down: Vec<String>,
    calls: Mutex<u32>,
}

impl LeagueSource {
    fn with_game(mut self, team: &str, game: Value) -> Self {
        self.games.entry(team.to_string()).or_default().push(game);
        self
    }

    fn with_outage(mut self, team: &str) -> Self {
        self.down.push(team.to_string());
        self
    }
}

impl StatsSource for LeagueSource {
    async fn fetch_page(
        &self,
        team: &TeamCode,
        range: &DateRange,
        _page: u32,
    ) -> Result<RawPage, SourceError> {
        *self.calls.lock().unwrap() += 1;
        if self.down.iter().any(|t| t == team.as_str()) {
            return Err(SourceError::Transient("HTTP 503".to_string()));
        }
        let games: Vec<Value> = self
            .games
            .get(team.as_str())
            .into_iter()
            .flatten()
            .filter(|g| {
                let on = NaiveDate::parse_from_str(g["game_date"].as_str().unwrap(), "%Y-%m-%d")
                    .unwrap();
                range.contains(on)
            })
            .cloned()
            .collect();
        if games.is_empty() {
            return Err(SourceError::NoData);
        }
        Ok(RawPage {
            games,
            next_page: None,
        })
    }
}

fn pitches(types: &[(&str, f64, u8, &str)]) -> Vec<Value> {
    types
        .iter()
        .map(|(t, speed, zone, desc)| {
            json!({"pitch_type": t, "release_speed": speed, "zone": zone, "description": desc})
        })
        .collect()
}

fn game(pk: u64, on: &str, home: &str, away: &str, pitchers: Vec<Value>) -> Value {
    json!({
        "game_pk": pk,
        "game_date": on,
        "home_team": home,
        "away_team": away,
        "status": "Final",
        "pitchers": pitchers,
    })
}

fn line(id: u32, name: &str, team: &str, outs: u32, er: u32, k: u32, pitches: Vec<Value>) -> Value {
    json!({
        "pitcher": id,
        "player_name": name,
        "team": team,
        "outs": outs,
        "runs": er,
        "earned_runs": er,
        "hits": 4,
        "walks": 1,
        "strikeouts": k,
        "home_runs": 0,
        "batters_faced": outs + 5,
        "pitches": pitches,
    })
}

fn league() -> LeagueSource {
    let ace = |pk, on, er| {
        game(
            pk,
            on,
            "LAD",
            "SD",
            vec![
                line(
                    1,
                    "Dodger Ace",
                    "LAD",
                    18,
                    er,
                    7,
                    pitches(&[
                        ("FF", 97.0, 5, "called_strike"),
                        ("SL", 88.0, 14, "swinging_strike"),
                        ("FF", 96.0, 11, "ball"),
                        ("CU", 80.0, 6, "foul"),
                    ]),
                ),
                line(2, "Padre Starter", "SD", 15, 3, 4, vec![]),
            ],
        )
    };
    LeagueSource::default()
        .with_game("LAD", ace(1, "2024-04-02", 2))
        .with_game("LAD", ace(2, "2024-04-08", 0))
        .with_game("LAD", ace(3, "2024-05-14", 4))
        .with_game("SD", ace(1, "2024-04-02", 2))
        .with_outage("SF")
}

fn orchestrator(repo: &Arc<Repository>, source: LeagueSource) -> SyncOrchestrator<LeagueSource> {
    orchestrator_on(repo, source, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
}

fn orchestrator_on(
    repo: &Arc<Repository>,
    source: LeagueSource,
    today: NaiveDate,
) -> SyncOrchestrator<LeagueSource> {
    SyncOrchestrator::new(
        Arc::clone(repo),
        ProviderClient::new(
            source,
            RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(5),
                max_backoff: Duration::from_millis(5),
            },
            Duration::ZERO,
        ),
        SyncSettings::new(Season::new(2024), today),
    )
}

fn queries(repo: &Arc<Repository>) -> QueryService {
    QueryService::new(
        Arc::clone(repo),
        MetricsEngine::new(FipConstants::new().with(Season::new(2024), 3.166)),
    )
}

fn teams(codes: &[&str]) -> Vec<TeamCode> {
    codes.iter().map(|c| c.parse().unwrap()).collect()
}

#[tokio::test]
async fn test_partial_failure_keeps_other_units_queryable() {
    let repo = Arc::new(Repository::open_in_memory().unwrap());
    let sync = orchestrator(&repo, league());
    let request = SyncRequest::new(teams(&["LAD", "SF", "SD"]), 1, false);

    let report = sync.run(&request, &CancelFlag::new()).await.unwrap();

    let statuses: Vec<_> = report.units.iter().map(|u| u.status.clone()).collect();
    assert_eq!(
        statuses,
        vec![UnitStatus::Complete, UnitStatus::Failed, UnitStatus::Complete]
    );
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.units[0].games_written, 3);

    let q = queries(&repo);
    let found = q.search(&PitcherFilter::default()).unwrap();
    let names: Vec<_> = found.pitchers.iter().map(|s| s.pitcher.name.as_str()).collect();
    assert_eq!(names, vec!["Dodger Ace", "Padre Starter"]);

    let sf = found
        .sync_states
        .iter()
        .find(|s| s.unit == SyncUnit::new("SF".parse().unwrap(), Season::new(2024)))
        .unwrap();
    assert_eq!(sf.status, SyncStatus::Failed);
}

#[tokio::test]
async fn test_rerun_is_idempotent_and_skips_complete_units() {
    let repo = Arc::new(Repository::open_in_memory().unwrap());
    let request = SyncRequest::new(teams(&["LAD"]), 1, false);

    orchestrator(&repo, league())
        .run(&request, &CancelFlag::new())
        .await
        .unwrap();
    let counts = repo.counts().unwrap();

    // Same day again: only the sync day itself is asked for
    let report = orchestrator(&repo, league())
        .run(&request, &CancelFlag::new())
        .await
        .unwrap();
    let june_first = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    assert_eq!(report.units[0].status, UnitStatus::Complete);
    assert_eq!(
        report.units[0].fetched,
        vec![DateRange::new(june_first, june_first).unwrap()]
    );
    assert_eq!(report.units[0].games_written, 0);
    assert_eq!(repo.counts().unwrap(), counts);

    // After the season every game is final and nothing is fetched
    let after_season = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
    let closed = orchestrator_on(&repo, league(), after_season);
    let report = closed.run(&request, &CancelFlag::new()).await.unwrap();
    assert_eq!(report.units[0].status, UnitStatus::Complete);
    let report = closed.run(&request, &CancelFlag::new()).await.unwrap();
    assert_eq!(
        report.units[0].status,
        UnitStatus::Skipped(SkipReason::UpToDate)
    );

    let forced = SyncRequest::new(teams(&["LAD"]), 1, true);
    let report = orchestrator(&repo, league())
        .run(&forced, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(report.units[0].replaced, 3);
    assert_eq!(repo.counts().unwrap(), counts);
}

#[tokio::test]
async fn test_metrics_over_synced_data() {
    let repo = Arc::new(Repository::open_in_memory().unwrap());
    orchestrator(&repo, league())
        .run(&SyncRequest::new(teams(&["LAD"]), 1, false), &CancelFlag::new())
        .await
        .unwrap();
    let q = queries(&repo);
    let ace = PitcherId::new(1);

    // 54 outs (18 IP), 6 ER
    let report = q.pitcher_report(ace, None).unwrap();
    assert_eq!(report.innings_pitched, "18.0");
    assert_eq!(report.standard.era, MetricValue::Defined(3.0));
    let mix_total: f64 = report.pitch_mix.values().filter_map(|v| v.value()).sum();
    assert!((mix_total - 1.0).abs() < 1e-9);

    let april = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
    )
    .unwrap();
    let first = q
        .time_series(ace, &Metric::Era, Some(april), Bucket::Week)
        .unwrap();
    let second = q
        .time_series(ace, &Metric::Era, Some(april), Bucket::Week)
        .unwrap();
    assert_eq!(first.points, second.points);
    // Weeks starting Apr 1, 8, 15, 22, 29
    assert_eq!(first.points.len(), 5);
    assert_eq!(first.points[0].value, MetricValue::Defined(3.0));
    assert_eq!(first.points[1].value, MetricValue::Defined(0.0));
    assert_eq!(first.points[2].value, MetricValue::Undefined);
}

#[tokio::test(start_paused = true)]
async fn test_outage_is_retried_then_reported() {
    let repo = Arc::new(Repository::open_in_memory().unwrap());
    let sync = orchestrator(&repo, league());

    let report = sync
        .run(&SyncRequest::new(teams(&["SF"]), 1, false), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(report.units[0].status, UnitStatus::Failed);
    assert!(report.units[0]
        .error
        .as_deref()
        .unwrap()
        .contains("after 2 attempt(s)"));
    assert_eq!(*sync.client().source().calls.lock().unwrap(), 2);
}
