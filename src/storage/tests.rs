//! Unit tests for storage functionality

use super::*;
use crate::cli::types::{DateRange, GameId, PitcherId, Season};
use crate::testing::{date, game, line, pitch, record, team};

fn create_test_db() -> Repository {
    Repository::open_in_memory().unwrap()
}

fn create_test_db_with_pitcher() -> Repository {
    let db = create_test_db();
    let rec = record(543037, "Gerrit Cole", "NYY", line(18, 2, 1, 8, 1), vec![]);
    db.upsert_pitcher(&rec.pitcher, &rec.team, Season::new(2024))
        .unwrap();
    db
}

fn three_pitches() -> Vec<Pitch> {
    vec![
        pitch("FF", 97.0, 5, PitchOutcome::CalledStrike),
        pitch("SL", 88.0, 13, PitchOutcome::SwingingStrike),
        pitch("CH", 86.0, 8, PitchOutcome::InPlay),
    ]
}

#[test]
fn test_database_creation() {
    let db = create_test_db();
    assert_eq!(db.counts().unwrap(), StoreCounts::default());
}

#[test]
fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let location = DatabaseLocation::File(dir.path().join("nested").join("pitchers.db"));

    {
        let db = Repository::open(&location).unwrap();
        let rec = record(1, "Test Pitcher", "SEA", line(3, 0, 0, 1, 0), vec![]);
        db.upsert_pitcher(&rec.pitcher, &rec.team, Season::new(2024))
            .unwrap();
    }

    let reopened = Repository::open(&location).unwrap();
    assert!(reopened.pitcher(PitcherId::new(1)).unwrap().is_some());
}

#[test]
fn test_upsert_pitcher_records_teams() {
    let db = create_test_db_with_pitcher();

    // Same pitcher traded mid-career; identity stays, teams accumulate
    let rec = record(543037, "Gerrit Cole", "LAD", line(0, 0, 0, 0, 0), vec![]);
    db.upsert_pitcher(&rec.pitcher, &rec.team, Season::new(2025))
        .unwrap();
    db.upsert_pitcher(&rec.pitcher, &rec.team, Season::new(2025))
        .unwrap();

    let pitcher = db.pitcher(PitcherId::new(543037)).unwrap().unwrap();
    assert_eq!(pitcher.name, "Gerrit Cole");
    assert_eq!(pitcher.throws, Some(Hand::Right));
    assert_eq!(
        pitcher.teams,
        vec![
            TeamSeason {
                season: Season::new(2024),
                team: team("NYY")
            },
            TeamSeason {
                season: Season::new(2025),
                team: team("LAD")
            },
        ]
    );
}

#[test]
fn test_pitcher_not_found() {
    let db = create_test_db();
    assert!(db.pitcher(PitcherId::new(42)).unwrap().is_none());
    assert!(db.pitcher_data_version(PitcherId::new(42)).unwrap().is_none());
}

#[test]
fn test_replace_appearance_insert() {
    let db = create_test_db_with_pitcher();
    let g = game(745001, date(2024, 4, 10), "NYY", "BOS", true);
    let rec = record(543037, "Gerrit Cole", "NYY", line(18, 2, 1, 8, 1), three_pitches());

    let outcome = db.replace_appearance(&g, &rec, false).unwrap();
    assert_eq!(outcome.action, ReplaceAction::Inserted);

    let apps = db.appearances(PitcherId::new(543037), None).unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].line, rec.line);
    assert_eq!(apps[0].game_id, GameId::new(745001));
    assert!(apps[0].is_final);

    let events = db.pitch_events(PitcherId::new(543037), None).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events.iter().map(|e| e.seq).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(events[1].pitch.outcome, PitchOutcome::SwingingStrike);
    assert_eq!(db.game(GameId::new(745001)).unwrap(), Some(g));
}

#[test]
fn test_final_appearance_unchanged_without_force() {
    let db = create_test_db_with_pitcher();
    let g = game(745001, date(2024, 4, 10), "NYY", "BOS", true);
    let original = record(543037, "Gerrit Cole", "NYY", line(18, 2, 1, 8, 1), three_pitches());
    db.replace_appearance(&g, &original, false).unwrap();

    let corrected = record(543037, "Gerrit Cole", "NYY", line(18, 3, 1, 8, 1), vec![]);
    let outcome = db.replace_appearance(&g, &corrected, false).unwrap();
    assert_eq!(outcome.action, ReplaceAction::Unchanged);

    let apps = db.appearances(PitcherId::new(543037), None).unwrap();
    assert_eq!(apps[0].line.earned_runs, 2);
    assert_eq!(db.pitch_events(PitcherId::new(543037), None).unwrap().len(), 3);
}

#[test]
fn test_force_replace_has_no_duplicates_or_orphans() {
    let db = create_test_db_with_pitcher();
    let g = game(745001, date(2024, 4, 10), "NYY", "BOS", true);
    db.replace_appearance(
        &g,
        &record(543037, "Gerrit Cole", "NYY", line(18, 2, 1, 8, 1), three_pitches()),
        false,
    )
    .unwrap();

    let corrected = record(
        543037,
        "Gerrit Cole",
        "NYY",
        line(18, 3, 1, 8, 1),
        vec![pitch("FF", 97.5, 5, PitchOutcome::Ball)],
    );
    let outcome = db.replace_appearance(&g, &corrected, true).unwrap();
    assert_eq!(outcome.action, ReplaceAction::Replaced);

    let counts = db.counts().unwrap();
    assert_eq!(counts.appearances, 1);
    assert_eq!(counts.pitch_events, 1);
    assert_eq!(counts.games, 1);

    let apps = db.appearances(PitcherId::new(543037), None).unwrap();
    assert_eq!(apps[0].line.earned_runs, 3);

    // No pitch event may point at a deleted appearance
    let conn = db.conn().unwrap();
    let orphans: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pitch_events e
             LEFT JOIN appearances a ON a.appearance_id = e.appearance_id
             WHERE a.appearance_id IS NULL",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn test_non_final_appearance_is_replaced() {
    let db = create_test_db_with_pitcher();
    let live = game(745001, date(2024, 4, 10), "NYY", "BOS", false);
    db.replace_appearance(
        &live,
        &record(543037, "Gerrit Cole", "NYY", line(9, 1, 0, 4, 0), vec![]),
        false,
    )
    .unwrap();

    let finished = game(745001, date(2024, 4, 10), "NYY", "BOS", true);
    let outcome = db
        .replace_appearance(
            &finished,
            &record(543037, "Gerrit Cole", "NYY", line(18, 2, 1, 8, 1), vec![]),
            false,
        )
        .unwrap();
    assert_eq!(outcome.action, ReplaceAction::Replaced);

    let apps = db.appearances(PitcherId::new(543037), None).unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].line.outs, 18);
    assert!(apps[0].is_final);
}

#[test]
fn test_earliest_open_appearance() {
    let db = create_test_db_with_pitcher();
    let april = DateRange::new(date(2024, 4, 1), date(2024, 4, 30)).unwrap();
    let cole = |outs| record(543037, "Gerrit Cole", "NYY", line(outs, 1, 0, 4, 0), vec![]);
    db.replace_appearance(&game(1, date(2024, 4, 5), "NYY", "BOS", true), &cole(18), false)
        .unwrap();
    assert_eq!(db.earliest_open_appearance(&team("NYY"), &april).unwrap(), None);

    db.replace_appearance(&game(2, date(2024, 4, 12), "NYY", "BOS", false), &cole(9), false)
        .unwrap();
    db.replace_appearance(&game(3, date(2024, 4, 20), "NYY", "BOS", false), &cole(6), false)
        .unwrap();
    assert_eq!(
        db.earliest_open_appearance(&team("NYY"), &april).unwrap(),
        Some(date(2024, 4, 12))
    );
    assert_eq!(db.earliest_open_appearance(&team("BOS"), &april).unwrap(), None);
    let late_april = DateRange::new(date(2024, 4, 15), date(2024, 4, 30)).unwrap();
    assert_eq!(
        db.earliest_open_appearance(&team("NYY"), &late_april).unwrap(),
        Some(date(2024, 4, 20))
    );
}

#[test]
fn test_pitching_snapshot_pairs_lines_with_their_pitches() {
    let db = create_test_db_with_pitcher();
    let g = game(745001, date(2024, 4, 10), "NYY", "BOS", false);
    let cole = |outs, pitches: Vec<Pitch>| {
        record(543037, "Gerrit Cole", "NYY", line(outs, 1, 0, 4, 0), pitches)
    };
    db.replace_appearance(&g, &cole(9, three_pitches()), false)
        .unwrap();

    let before = db.pitching_snapshot(PitcherId::new(543037), None).unwrap();
    let pid = PitcherId::new(543037);
    assert_eq!(before.appearances, db.appearances(pid, None).unwrap());
    assert_eq!(before.events, db.pitch_events(pid, None).unwrap());
    assert_eq!(before.events.len(), 3);

    let one_pitch = vec![pitch("FF", 97.0, 5, PitchOutcome::Ball)];
    db.replace_appearance(&g, &cole(18, one_pitch), false)
        .unwrap();
    let after = db.pitching_snapshot(PitcherId::new(543037), None).unwrap();
    assert_eq!(after.appearances[0].line.outs, 18);
    assert_eq!(after.events.len(), 1);
    assert!(after
        .events
        .iter()
        .all(|e| e.game_id == after.appearances[0].game_id));

    let may = DateRange::new(date(2024, 5, 1), date(2024, 5, 31)).unwrap();
    assert_eq!(
        db.pitching_snapshot(PitcherId::new(543037), Some(&may)).unwrap(),
        PitchingSnapshot::default()
    );
}

#[test]
fn test_replace_requires_pitcher() {
    let db = create_test_db();
    let g = game(745001, date(2024, 4, 10), "NYY", "BOS", true);
    let rec = record(999, "Nobody", "NYY", line(3, 0, 0, 0, 0), vec![]);

    let err = db.replace_appearance(&g, &rec, false).unwrap_err();
    assert!(matches!(err, crate::error::PitchError::Repository(_)));
    assert_eq!(db.counts().unwrap().appearances, 0);
}

#[test]
fn test_failed_replace_keeps_old_appearance() {
    let db = create_test_db_with_pitcher();
    let g = game(745001, date(2024, 4, 10), "NYY", "BOS", true);
    db.replace_appearance(
        &g,
        &record(543037, "Gerrit Cole", "NYY", line(18, 2, 1, 8, 1), three_pitches()),
        false,
    )
    .unwrap();

    // Abort the transaction partway through inserting the new pitch events
    db.conn()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER fail_mid_write BEFORE INSERT ON pitch_events
             WHEN NEW.seq = 2
             BEGIN SELECT RAISE(ABORT, 'simulated crash'); END;",
        )
        .unwrap();

    let corrected = record(543037, "Gerrit Cole", "NYY", line(18, 5, 1, 8, 1), three_pitches());
    assert!(db.replace_appearance(&g, &corrected, true).is_err());

    let apps = db.appearances(PitcherId::new(543037), None).unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].line.earned_runs, 2);
    let events = db.pitch_events(PitcherId::new(543037), None).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].pitch.outcome, PitchOutcome::CalledStrike);
}

#[test]
fn test_replace_bumps_version_and_invalidates_overlapping_cache() {
    let db = create_test_db_with_pitcher();
    let pid = PitcherId::new(543037);
    let april = DateRange::new(date(2024, 4, 1), date(2024, 4, 30)).unwrap();
    let may = DateRange::new(date(2024, 5, 1), date(2024, 5, 31)).unwrap();
    db.put_derived_metrics(pid, &april, "v0", "{}").unwrap();
    db.put_derived_metrics(pid, &may, "v0", "{}").unwrap();

    let before = db.pitcher_data_version(pid).unwrap().unwrap();
    let outcome = db
        .replace_appearance(
            &game(745001, date(2024, 4, 10), "NYY", "BOS", true),
            &record(543037, "Gerrit Cole", "NYY", line(18, 2, 1, 8, 1), vec![]),
            false,
        )
        .unwrap();

    assert_eq!(outcome.invalidated_metrics, 1);
    assert!(db.pitcher_data_version(pid).unwrap().unwrap() > before);
    assert!(db.derived_metrics(pid, &april).unwrap().is_none());
    assert_eq!(db.derived_metrics(pid, &may).unwrap().unwrap().fingerprint, "v0");
}

#[test]
fn test_invalidate_derived_metrics() {
    let db = create_test_db_with_pitcher();
    let pid = PitcherId::new(543037);
    let season = Season::new(2024).window();
    db.put_derived_metrics(pid, &season, "v1", "{\"a\":1}").unwrap();

    assert_eq!(db.invalidate_derived_metrics(pid, date(2023, 7, 1)).unwrap(), 0);
    assert_eq!(db.invalidate_derived_metrics(pid, date(2024, 7, 1)).unwrap(), 1);
    assert!(db.derived_metrics(pid, &season).unwrap().is_none());
}

#[test]
fn test_appearance_range_filter_and_order() {
    let db = create_test_db_with_pitcher();
    for (id, day) in [(3u64, 20u32), (1, 5), (2, 12)] {
        db.replace_appearance(
            &game(id, date(2024, 4, day), "NYY", "TB", true),
            &record(543037, "Gerrit Cole", "NYY", line(15, 1, 1, 5, 0), vec![]),
            false,
        )
        .unwrap();
    }

    let all = db.appearances(PitcherId::new(543037), None).unwrap();
    assert_eq!(
        all.iter().map(|a| a.game_id.as_u64()).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let range = DateRange::new(date(2024, 4, 10), date(2024, 4, 20)).unwrap();
    let some = db
        .appearances(PitcherId::new(543037), Some(&range))
        .unwrap();
    assert_eq!(some.len(), 2);

    let team_apps = db.team_appearances(&team("NYY"), Some(&range)).unwrap();
    assert_eq!(team_apps.len(), 2);
    assert!(db.team_appearances(&team("TB"), None).unwrap().is_empty());
}

#[test]
fn test_search_pitchers() {
    let db = create_test_db();
    let cole = record(543037, "Gerrit Cole", "NYY", line(18, 2, 1, 8, 1), vec![]);
    let glasnow = record(607192, "Tyler Glasnow", "LAD", line(18, 1, 2, 10, 0), vec![]);
    let colin = record(111111, "Colin Rea", "MIL", line(15, 3, 2, 4, 1), vec![]);
    for rec in [&cole, &glasnow, &colin] {
        db.upsert_pitcher(&rec.pitcher, &rec.team, Season::new(2024))
            .unwrap();
    }
    db.replace_appearance(&game(1, date(2024, 4, 1), "NYY", "HOU", true), &cole, false)
        .unwrap();
    db.replace_appearance(&game(2, date(2024, 6, 1), "NYY", "HOU", true), &cole, false)
        .unwrap();
    db.replace_appearance(&game(3, date(2024, 5, 1), "LAD", "SD", true), &glasnow, false)
        .unwrap();

    let by_name = db
        .search_pitchers(&PitcherFilter {
            name: Some("COL".to_string()),
            ..Default::default()
        })
        .unwrap();
    let names: Vec<_> = by_name.iter().map(|s| s.pitcher.name.as_str()).collect();
    assert_eq!(names, vec!["Colin Rea", "Gerrit Cole"]);
    assert_eq!(by_name[1].appearances, 2);
    assert_eq!(by_name[1].first_appearance, Some(date(2024, 4, 1)));
    assert_eq!(by_name[1].last_appearance, Some(date(2024, 6, 1)));
    assert_eq!(by_name[0].appearances, 0);

    let by_team = db
        .search_pitchers(&PitcherFilter {
            team: Some(team("LAD")),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_team.len(), 1);
    assert_eq!(by_team[0].pitcher.id, PitcherId::new(607192));

    let in_may = db
        .search_pitchers(&PitcherFilter {
            range: Some(DateRange::new(date(2024, 5, 1), date(2024, 5, 31)).unwrap()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(in_may.len(), 1);
    assert_eq!(in_may[0].pitcher.name, "Tyler Glasnow");

    // Deterministic ordering across calls
    assert_eq!(
        by_name,
        db.search_pitchers(&PitcherFilter {
            name: Some("col".to_string()),
            ..Default::default()
        })
        .unwrap()
    );
}

#[test]
fn test_teams() {
    let db = create_test_db();
    for (id, code) in [(1, "SEA"), (2, "ARI"), (3, "SEA")] {
        let rec = record(id, "P", code, line(0, 0, 0, 0, 0), vec![]);
        db.upsert_pitcher(&rec.pitcher, &rec.team, Season::new(2024))
            .unwrap();
    }
    assert_eq!(db.teams().unwrap(), vec![team("ARI"), team("SEA")]);
}

#[test]
fn test_sync_state_roundtrip_and_default() {
    let db = create_test_db();
    let unit = SyncUnit::new(team("NYY"), Season::new(2024));

    let fresh = db.sync_state(&unit).unwrap();
    assert_eq!(fresh.status, SyncStatus::NeverSynced);
    assert!(fresh.fetched.is_none());

    let mut state = fresh;
    state.begin();
    db.put_sync_state(&state).unwrap();
    assert_eq!(db.sync_state(&unit).unwrap().status, SyncStatus::Partial);

    let fetched = DateRange::new(date(2024, 3, 1), date(2024, 6, 30)).unwrap();
    state.complete(fetched, 1_720_000_000);
    db.put_sync_state(&state).unwrap();

    let stored = db.sync_state(&unit).unwrap();
    assert_eq!(stored, state);

    let other = SyncUnit::new(team("BOS"), Season::new(2024));
    let mut failed = SyncState::never_synced(other);
    failed.begin();
    failed.fail("provider unavailable");
    db.put_sync_state(&failed).unwrap();

    let all = db.sync_states(None).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].unit.team, team("BOS"));
    let nyy_only = db.sync_states(Some(&[team("NYY")][..])).unwrap();
    assert_eq!(nyy_only, vec![state]);
}

#[test]
fn test_clear_all_data() {
    let db = create_test_db_with_pitcher();
    db.replace_appearance(
        &game(1, date(2024, 4, 1), "NYY", "HOU", true),
        &record(543037, "Gerrit Cole", "NYY", line(18, 2, 1, 8, 1), three_pitches()),
        false,
    )
    .unwrap();
    db.put_sync_state(&SyncState::never_synced(SyncUnit::new(team("NYY"), Season::new(2024))))
        .unwrap();

    db.clear_all_data().unwrap();
    assert_eq!(db.counts().unwrap(), StoreCounts::default());
    assert!(db.sync_states(None).unwrap().is_empty());
}

#[test]
fn test_innings_notation() {
    assert_eq!(outs_from_innings_notation("6.2"), Some(20));
    assert_eq!(outs_from_innings_notation("0.1"), Some(1));
    assert_eq!(outs_from_innings_notation("7"), Some(21));
    assert_eq!(outs_from_innings_notation("6.3"), None);
    assert_eq!(outs_from_innings_notation("-1.0"), None);
    assert_eq!(innings_notation(20), "6.2");
    assert_eq!(innings_notation(0), "0.0");
}

#[test]
fn test_pitch_outcome_flags() {
    let whiff = PitchOutcome::from_description("swinging_strike_blocked");
    assert!(whiff.is_swing() && whiff.is_whiff() && !whiff.is_contact());

    let foul_tip = PitchOutcome::from_description("foul_tip");
    assert!(foul_tip.is_swing() && foul_tip.is_contact());

    let called = PitchOutcome::from_description("called_strike");
    assert!(called.is_called_strike() && !called.is_swing());

    assert_eq!(PitchOutcome::from_description("hit_into_play"), PitchOutcome::InPlay);
    assert_eq!(PitchOutcome::from_description("unknown_thing"), PitchOutcome::Other);
    assert_eq!("in_play".parse::<PitchOutcome>().unwrap(), PitchOutcome::InPlay);
}
