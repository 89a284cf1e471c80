//! Argument parsing tests

use super::*;
use crate::cli::types::{PitcherId, Season};
use crate::metrics::Metric;
use crate::query::Bucket;
use chrono::NaiveDate;
use clap::Parser;

fn parse(args: &[&str]) -> Commands {
    MlbPitchers::try_parse_from(std::iter::once("mlb-pitchers").chain(args.iter().copied()))
        .unwrap()
        .command
}

#[test]
fn test_update_args() {
    match parse(&["update", "--team", "nyy", "-t", "LAD", "--years", "3", "--force-update"]) {
        Commands::Update {
            teams,
            years,
            force_update,
            clear_db,
            json,
        } => {
            let codes: Vec<_> = teams.iter().map(|t| t.as_str().to_string()).collect();
            assert_eq!(codes, vec!["NYY", "LAD"]);
            assert_eq!(years, 3);
            assert!(force_update);
            assert!(!clear_db);
            assert!(!json);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_update_defaults_to_all_teams() {
    match parse(&["update"]) {
        Commands::Update { teams, years, .. } => {
            assert!(teams.is_empty());
            assert_eq!(years, 1);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_invalid_team_is_rejected() {
    assert!(MlbPitchers::try_parse_from(["mlb-pitchers", "update", "--team", "XXX"]).is_err());
}

#[test]
fn test_series_args() {
    match parse(&[
        "series",
        "--pitcher-id",
        "543037",
        "--metric",
        "mix:sl",
        "--bucket",
        "month",
        "--from",
        "2024-04-01",
    ]) {
        Commands::Series {
            pitcher_id,
            metric,
            bucket,
            range,
            json,
        } => {
            assert_eq!(pitcher_id, PitcherId::new(543037));
            assert_eq!(metric, Metric::PitchMix("SL".to_string()));
            assert_eq!(bucket, Bucket::Month);
            assert_eq!(range.from, NaiveDate::from_ymd_opt(2024, 4, 1));
            assert_eq!(range.to, None);
            assert!(!json);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_unknown_metric_is_rejected() {
    assert!(MlbPitchers::try_parse_from([
        "mlb-pitchers",
        "series",
        "--pitcher-id",
        "1",
        "--metric",
        "war"
    ])
    .is_err());
}

#[test]
fn test_compare_args() {
    match parse(&[
        "compare",
        "-p",
        "1",
        "--season-a",
        "2023",
        "--season-b",
        "2024",
        "--json",
    ]) {
        Commands::Compare {
            season_a,
            season_b,
            json,
            ..
        } => {
            assert_eq!(season_a, Season::new(2023));
            assert_eq!(season_b, Season::new(2024));
            assert!(json);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_range_args_to_range() {
    let none = RangeArgs::default();
    assert_eq!(none.to_range().unwrap(), None);

    let both = RangeArgs {
        from: NaiveDate::from_ymd_opt(2024, 4, 1),
        to: NaiveDate::from_ymd_opt(2024, 4, 30),
    };
    let range = both.to_range().unwrap().unwrap();
    assert_eq!(range.to_string(), "2024-04-01..2024-04-30");

    let reversed = RangeArgs {
        from: NaiveDate::from_ymd_opt(2024, 5, 1),
        to: NaiveDate::from_ymd_opt(2024, 4, 1),
    };
    assert!(reversed.to_range().is_err());
}

#[test]
fn test_trend_args_default_window() {
    match parse(&["trend", "-p", "1", "-m", "era"]) {
        Commands::Trend {
            metric,
            bucket,
            window,
            range,
            ..
        } => {
            assert_eq!(metric, Metric::Era);
            assert_eq!(bucket, Bucket::Game);
            assert_eq!(window, 10);
            assert_eq!(range.to_range().unwrap(), None);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_periods_args() {
    match parse(&[
        "periods",
        "-p",
        "1",
        "-m",
        "whip",
        "--period-a",
        "2024-04-01..2024-05-31",
        "--period-b",
        "2024-06-01..2024-07-31",
    ]) {
        Commands::Periods {
            period_a, period_b, ..
        } => {
            assert_eq!(period_a.to_string(), "2024-04-01..2024-05-31");
            assert_eq!(period_b.start(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_inverted_period_is_rejected() {
    let args = [
        "mlb-pitchers",
        "periods",
        "-p",
        "1",
        "-m",
        "era",
        "--period-a",
        "2024-05-31..2024-04-01",
        "--period-b",
        "2024-06-01..2024-07-31",
    ];
    assert!(MlbPitchers::try_parse_from(args).is_err());
}

#[test]
fn test_changes_and_seasons_args() {
    match parse(&["changes", "-p", "1", "-m", "csw", "-w", "5", "--threshold", "2"]) {
        Commands::Changes {
            window, threshold, ..
        } => {
            assert_eq!(window, 5);
            assert_eq!(threshold, 2.0);
        }
        other => panic!("unexpected command {other:?}"),
    }

    match parse(&["seasons", "-p", "1", "-m", "fip", "-s", "2023", "--season", "2024"]) {
        Commands::Seasons { seasons, .. } => {
            assert_eq!(seasons, vec![Season::new(2023), Season::new(2024)]);
        }
        other => panic!("unexpected command {other:?}"),
    }
}
