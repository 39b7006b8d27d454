#![deny(
    missing_docs,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    // This is turned off because of the rating values in the structs
    clippy::module_name_repetitions,
    // "Glicko-2" and faction names show up as false positives otherwise
    clippy::doc_markdown,
    // Need to cast usizes to f64s where precision is not that important, also there seems to be no good alternative.
    clippy::cast_precision_loss,
)]
#![doc = include_str!("../README.md")]

#[cfg(feature = "serde")]
use serde::de::DeserializeOwned;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod glicko2;
pub mod probability;
pub mod team;

/// The possible outcomes for a match: WIN, LOSS.
///
/// Note that this is always from the perspective of player one.
/// That means a win is a win for player one and a loss is a win for player two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Outcomes {
    /// A win, from player one's perspective.
    WIN,
    /// A loss, from player one's perspective.
    LOSS,
}

impl Outcomes {
    #[must_use]
    /// Converts the outcome of the match into the score used by Glicko-2 (1 = Win, 0 = Loss).
    pub const fn to_score(self) -> f64 {
        match self {
            Self::WIN => 1.0,
            Self::LOSS => 0.0,
        }
    }

    #[must_use]
    /// The same match seen from the other side.
    pub const fn reversed(self) -> Self {
        match self {
            Self::WIN => Self::LOSS,
            Self::LOSS => Self::WIN,
        }
    }
}

/// Errors raised when a rating configuration is constructed with values
/// the rating math cannot work with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Leader influence must lie in `[0, 1]`.
    #[error("leader influence `{0}` is outside of [0, 1]")]
    LeaderInfluence(f64),
    /// The Glicko-2 system constant must be a positive, finite number.
    #[error("tau `{0}` must be positive and finite")]
    Tau(f64),
    /// Default deviation and volatility must be positive and finite.
    #[error("default {field} `{value}` must be positive and finite")]
    DefaultRating {
        /// Which default failed validation.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A stored category matchup must be a probability strictly inside `(0, 1)`.
    #[error("matchup `{first}` vs `{second}` has win probability `{probability}`, expected (0, 1)")]
    MatchupProbability {
        /// Category whose win probability is stored.
        first: String,
        /// The opposing category.
        second: String,
        /// The rejected value.
        probability: f64,
    },
    /// A pair of categories may only be stored in one direction.
    #[error("matchup `{first}` vs `{second}` is stored in both directions")]
    DuplicateMatchup {
        /// Category of the outer key.
        first: String,
        /// Category of the inner key, also stored as an outer key against `first`.
        second: String,
    },
}

/// Measure of player's skill.
///
/// Some rating systems might consider other values too (volatility, matches played etc.).
/// If that is the case, we will use the default values for those.
pub trait Rating {
    /// A single value for player's skill
    fn rating(&self) -> f64;
    /// A value for the uncertainty of a players rating.
    /// If the algorithm does not include an uncertainty value, this will return `None`.
    fn uncertainty(&self) -> Option<f64>;
    /// Initialise a `Rating` with provided score and uncertainty, if `None` use default.
    /// If the algorithm does not include an uncertainty value it will get dismissed.
    fn new(rating: Option<f64>, uncertainty: Option<f64>) -> Self;
}

/// Rating system for 1v1 matches.
///
/// 📌 _**Important note:**_ The RatingSystem Trait only implements the `rate` and `expected_score` functions.
/// Some rating systems might also implement additional functions which you can only access by using those directly.
pub trait RatingSystem {
    #[cfg(feature = "serde")]
    /// Rating type rating system.
    type RATING: Rating + Copy + std::fmt::Debug + DeserializeOwned + Serialize;
    #[cfg(not(feature = "serde"))]
    /// Rating type rating system.
    type RATING: Rating + Copy + std::fmt::Debug;
    /// Config type for rating system.
    type CONFIG;
    /// Initialise rating system with provided config. If the rating system does not require a config, leave empty brackets.
    fn new(config: Self::CONFIG) -> Self;
    /// Calculate ratings for two players based on provided ratings and outcome.
    fn rate(
        &self,
        player_one: &Self::RATING,
        player_two: &Self::RATING,
        outcome: &Outcomes,
    ) -> (Self::RATING, Self::RATING);
    /// Calculate expected outcome of two players. Returns probability of player winning from 0.0 to 1.0.
    fn expected_score(&self, player_one: &Self::RATING, player_two: &Self::RATING) -> (f64, f64);
}

/// Rating system for rating periods.
///
/// 📌 _**Important note:**_ The RatingPeriodSystem Trait only implements the `rate` and `expected_score` functions.
/// Some rating systems might also implement additional functions which you can only access by using those directly.
pub trait RatingPeriodSystem {
    #[cfg(feature = "serde")]
    /// Rating type rating system.
    type RATING: Rating + Copy + std::fmt::Debug + DeserializeOwned + Serialize;
    #[cfg(not(feature = "serde"))]
    /// Rating type rating system.
    type RATING: Rating + Copy + std::fmt::Debug;
    /// Config type for rating system.
    type CONFIG;
    /// Initialise rating system with provided config. If the rating system does not require a config, leave empty brackets.
    fn new(config: Self::CONFIG) -> Self;
    /// Calculate ratings for a player based on provided list of opponents and outcomes.
    fn rate(&self, player: &Self::RATING, results: &[(Self::RATING, Outcomes)]) -> Self::RATING;
    /// Calculate expected scores for a player and a list of opponents. Returns probabilities of the player winning from 0.0 to 1.0.
    fn expected_score(&self, player: &Self::RATING, opponents: &[Self::RATING]) -> Vec<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_to_score() {
        assert!((Outcomes::WIN.to_score() - 1.0).abs() < f64::EPSILON);
        assert!((Outcomes::LOSS.to_score() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_outcomes_reversed() {
        assert_eq!(Outcomes::WIN.reversed(), Outcomes::LOSS);
        assert_eq!(Outcomes::LOSS.reversed(), Outcomes::WIN);
    }

    #[test]
    fn test_derives() {
        let outcome = Outcomes::WIN;

        assert_eq!(outcome, outcome.clone());
        assert!(!format!("{outcome:?}").is_empty());

        let err = ConfigError::Tau(-1.0);
        assert_eq!(err.to_string(), "tau `-1` must be positive and finite");
    }
}
