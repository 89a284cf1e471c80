//! Planning which (team, season) units to sync and which dates each needs.

use crate::cli::types::{DateRange, Season, TeamCode};
use crate::storage::{SyncState, SyncStatus, SyncUnit};
use chrono::NaiveDate;

/// Parameters of one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Teams to sync; empty means every MLB team.
    pub teams: Vec<TeamCode>,
    /// Number of seasons to look back, including the current one.
    pub years: u16,
    /// Refetch and overwrite units regardless of their stored state.
    pub force: bool,
}

impl SyncRequest {
    pub fn new(teams: Vec<TeamCode>, years: u16, force: bool) -> Self {
        Self {
            teams,
            years,
            force,
        }
    }

    /// Seasons covered by the request, newest first.
    pub fn seasons(&self, current: Season) -> Vec<Season> {
        let current = current.as_u16();
        (0..self.years.max(1))
            .map_while(|back| current.checked_sub(back).map(Season::new))
            .collect()
    }

    /// Units in processing order: teams in the order given, each team's
    /// seasons newest first.
    pub fn units(&self, current: Season) -> Vec<SyncUnit> {
        let mut teams = if self.teams.is_empty() {
            TeamCode::all()
        } else {
            self.teams.clone()
        };
        let mut seen = std::collections::HashSet::new();
        teams.retain(|t| seen.insert(t.clone()));

        let seasons = self.seasons(current);
        teams
            .into_iter()
            .flat_map(|team| {
                seasons
                    .iter()
                    .map(move |season| SyncUnit::new(team.clone(), *season))
            })
            .collect()
    }
}

/// Dates a unit should cover as of `today`; `None` before the season opens.
pub fn requested_range(season: Season, today: NaiveDate) -> Option<DateRange> {
    season.window().clip_to(today)
}

/// First date inside a unit's fetched range that has to be fetched again.
///
/// The last fetched day is reopened while it sits inside the season window,
/// because that range was clipped to the day of the sync and games dated that
/// day may have been played afterwards. `earliest_open` is the earliest stored
/// appearance whose game was not final yet.
pub fn reopen_from(
    season: Season,
    fetched: &DateRange,
    earliest_open: Option<NaiveDate>,
) -> Option<NaiveDate> {
    let boundary = (fetched.end() < season.window().end()).then(|| fetched.end());
    boundary.into_iter().chain(earliest_open).min()
}

/// Sub-ranges of `requested` that still need fetching.
///
/// Forced, never-synced, and never-completed units fetch everything.
/// Otherwise only the dates outside the previously fetched range are
/// returned, after giving back everything from `reopen` onwards. The result
/// is empty for a complete unit that already covers `requested` with
/// nothing reopened.
pub fn missing_ranges(
    requested: &DateRange,
    state: &SyncState,
    force: bool,
    reopen: Option<NaiveDate>,
) -> Vec<DateRange> {
    if force || state.status == SyncStatus::NeverSynced {
        return vec![*requested];
    }
    let settled = match (state.fetched, reopen) {
        (Some(fetched), Some(date)) => fetched.ending_before(date),
        (fetched, None) => fetched,
        (None, Some(_)) => None,
    };
    match settled {
        Some(fetched) => requested.subtract(&fetched),
        None => vec![*requested],
    }
}
