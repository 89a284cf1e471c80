//! MLB team abbreviations.

use crate::error::{PitchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider abbreviations for the thirty MLB clubs.
pub const MLB_TEAMS: [&str; 30] = [
    "ARI", "ATL", "BAL", "BOS", "CHC", "CHW", "CIN", "CLE", "COL", "DET", "HOU", "KC", "LAA",
    "LAD", "MIA", "MIL", "MIN", "NYM", "NYY", "OAK", "PHI", "PIT", "SD", "SEA", "SF", "STL",
    "TB", "TEX", "TOR", "WSH",
];

/// A validated, upper-cased MLB team abbreviation.
///
/// # Examples
///
/// ```rust
/// use mlb_pitchers::TeamCode;
///
/// let team: TeamCode = "nyy".parse().unwrap();
/// assert_eq!(team.as_str(), "NYY");
/// assert!("XYZ".parse::<TeamCode>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamCode(String);

impl TeamCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Every MLB team, in abbreviation order.
    pub fn all() -> Vec<TeamCode> {
        MLB_TEAMS.iter().map(|t| TeamCode(t.to_string())).collect()
    }
}

impl fmt::Display for TeamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TeamCode {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_uppercase();
        if MLB_TEAMS.contains(&code.as_str()) {
            Ok(TeamCode(code))
        } else {
            Err(PitchError::InvalidTeam {
                code: s.to_string(),
            })
        }
    }
}

impl TryFrom<String> for TeamCode {
    type Error = PitchError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TeamCode> for String {
    fn from(team: TeamCode) -> Self {
        team.0
    }
}
