use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillratings::Outcomes;
use tracing::debug;

use crate::player::PlayerId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read match feed `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid match feed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("winning team must be `1` or `2`, got `{0}`")]
    InvalidWinner(u8),
}

/// One side of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSheet {
    pub leader: PlayerId,
    /// Support slots in lobby order. Empty names are unfilled slots.
    #[serde(default)]
    pub supports: Vec<PlayerId>,
    /// Faction the team played.
    pub category: String,
}

impl TeamSheet {
    /// Supports that actually played.
    pub fn present_supports(&self) -> impl Iterator<Item = &PlayerId> {
        self.supports.iter().filter(|s| !s.is_absent())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Winner {
    TeamOne,
    TeamTwo,
}

impl TryFrom<u8> for Winner {
    type Error = Error;

    fn try_from(team: u8) -> Result<Self, Self::Error> {
        match team {
            1 => Ok(Self::TeamOne),
            2 => Ok(Self::TeamTwo),
            other => Err(Error::InvalidWinner(other)),
        }
    }
}

impl From<Winner> for u8 {
    fn from(winner: Winner) -> Self {
        match winner {
            Winner::TeamOne => 1,
            Winner::TeamTwo => 2,
        }
    }
}

/// A recorded match. Consumed once, in feed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub team_one: TeamSheet,
    pub team_two: TeamSheet,
    pub winner: Winner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played_at: Option<DateTime<Utc>>,
}

impl MatchOutcome {
    /// The match from team one's perspective.
    pub const fn team_one_outcome(&self) -> Outcomes {
        match self.winner {
            Winner::TeamOne => Outcomes::WIN,
            Winner::TeamTwo => Outcomes::LOSS,
        }
    }
}

/// Flat layout the match log exports use.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatMatch {
    #[serde(rename = "team1command")]
    team_one_leader: PlayerId,
    #[serde(rename = "team2command")]
    team_two_leader: PlayerId,
    #[serde(rename = "team1faction")]
    team_one_category: String,
    #[serde(rename = "team2faction")]
    team_two_category: String,
    #[serde(default)]
    team_one_thugs: Vec<PlayerId>,
    #[serde(default)]
    team_two_thugs: Vec<PlayerId>,
    winning_team_id: Winner,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

impl From<FlatMatch> for MatchOutcome {
    fn from(flat: FlatMatch) -> Self {
        Self {
            team_one: TeamSheet {
                leader: flat.team_one_leader,
                supports: flat.team_one_thugs,
                category: flat.team_one_category,
            },
            team_two: TeamSheet {
                leader: flat.team_two_leader,
                supports: flat.team_two_thugs,
                category: flat.team_two_category,
            },
            winner: flat.winning_team_id,
            played_at: flat.timestamp,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedRecord {
    Match(MatchOutcome),
    Flat(FlatMatch),
}

impl From<FeedRecord> for MatchOutcome {
    fn from(record: FeedRecord) -> Self {
        match record {
            FeedRecord::Match(outcome) => outcome,
            FeedRecord::Flat(flat) => flat.into(),
        }
    }
}

/// Parses a JSON array of matches, oldest first.
///
/// Records may use either the [`MatchOutcome`] layout or the flat export layout
/// (`team1command`, `teamOneThugs`, `winningTeamId`, ...).
/// A script wrapper around the array, as in `export const games = [...];`, is skipped.
pub fn parse_feed(text: &str) -> Result<Vec<MatchOutcome>, Error> {
    let records: Vec<FeedRecord> = serde_json::from_str(strip_wrapper(text))?;
    Ok(records.into_iter().map(MatchOutcome::from).collect())
}

pub fn read_feed(path: &Path) -> Result<Vec<MatchOutcome>, Error> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    let feed = parse_feed(&text)?;
    debug!("loaded {} matches from `{}`", feed.len(), path.display());
    Ok(feed)
}

fn strip_wrapper(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        return trimmed;
    }
    match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}
