#![allow(clippy::float_cmp)]
//! Team strength for games where one leader and a group of supports play together.
//!
//! The leader's rating anchors the team, the supports contribute their average.
//! How much the leader weighs is the [`LeaderInfluence`], a tuning constant.
//!
//! ```rust
//! # use assert_eq_float::assert_eq_float;
//! use skillratings::{
//!     glicko2::Glicko2Rating,
//!     team::{LeaderInfluence, team_strength},
//! };
//!
//! let leader = Glicko2Rating::from((1700.0, 80.0, 0.06));
//! let supports = vec![
//!     Glicko2Rating::from((1400.0, 120.0, 0.06)),
//!     Glicko2Rating::from((1500.0, 90.0, 0.06)),
//! ];
//!
//! let team = team_strength(&leader, &supports, LeaderInfluence::default());
//!
//! // 0.5 * 1700 + 0.5 * (1400 + 1500) / 2
//! assert_eq_float!(team.rating, 1575.0);
//! assert!(team.deviation < leader.deviation);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError,
    glicko2::{self, DEFAULT_VOLATILITY, Glicko2Rating},
};

/// Default weight of the leader in the team rating.
pub const DEFAULT_LEADER_INFLUENCE: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "f64", into = "f64")
)]
/// Weight of the leader's rating in the team rating, within `[0, 1]`.
///
/// `1.0` ignores the supports, `0.0` ignores the leader whenever supports are present.
pub struct LeaderInfluence(f64);

impl LeaderInfluence {
    /// Validates and wraps a leader influence.
    ///
    /// # Errors
    /// Rejects values outside of `[0, 1]`, including NaN.
    pub fn new(influence: f64) -> Result<Self, ConfigError> {
        if (0.0..=1.0).contains(&influence) {
            Ok(Self(influence))
        } else {
            Err(ConfigError::LeaderInfluence(influence))
        }
    }

    #[must_use]
    #[inline]
    /// The wrapped weight.
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for LeaderInfluence {
    fn default() -> Self {
        Self(DEFAULT_LEADER_INFLUENCE)
    }
}

impl TryFrom<f64> for LeaderInfluence {
    type Error = ConfigError;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl From<LeaderInfluence> for f64 {
    #[inline]
    fn from(v: LeaderInfluence) -> Self {
        v.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// Strength of a whole team for a single match, on the public rating scale.
///
/// Derived from the members' current ratings, never stored.
pub struct TeamStrength {
    /// Blended rating of leader and supports.
    pub rating: f64,
    /// Blended deviation of leader and supports.
    pub deviation: f64,
}

impl TeamStrength {
    #[must_use]
    /// The team as an opponent in a Glicko-2 rating period, shifted by `bonus` rating points.
    ///
    /// Teams have no volatility of their own, the default volatility is used.
    pub fn as_opponent(&self, bonus: f64) -> Glicko2Rating {
        Glicko2Rating {
            rating: self.rating + bonus,
            deviation: self.deviation,
            volatility: DEFAULT_VOLATILITY,
        }
    }
}

impl From<Glicko2Rating> for TeamStrength {
    fn from(rating: Glicko2Rating) -> Self {
        Self {
            rating: rating.rating,
            deviation: rating.deviation,
        }
    }
}

#[must_use]
/// Calculates the [`TeamStrength`] of a leader and their supports.
///
/// Without supports the leader is the team. Otherwise:
/// - the support rating is the mean of the support ratings,
/// - the support deviation is `sqrt(sum(deviation²)) / count`,
/// - rating and deviation blend leader and supports by the `influence`,
///   deviations combined as independent errors.
pub fn team_strength(
    leader: &Glicko2Rating,
    supports: &[Glicko2Rating],
    influence: LeaderInfluence,
) -> TeamStrength {
    if supports.is_empty() {
        return TeamStrength::from(*leader);
    }

    let count = supports.len() as f64;
    let support_rating = supports.iter().map(|s| s.rating).sum::<f64>() / count;
    let support_deviation = supports
        .iter()
        .map(|s| s.deviation.powi(2))
        .sum::<f64>()
        .sqrt()
        / count;

    let w = influence.value();
    TeamStrength {
        rating: w.mul_add(leader.rating, (1.0 - w) * support_rating),
        deviation: (w * leader.deviation).hypot((1.0 - w) * support_deviation),
    }
}

#[must_use]
/// Calculates the skill based expected outcome of two teams.
///
/// The teams are treated as two players, see [`glicko2::expected_score`].
/// Returns the probability of victory for each team as an [`f64`] between 1.0 and 0.0.
pub fn expected_team_score(team_one: &TeamStrength, team_two: &TeamStrength) -> (f64, f64) {
    glicko2::expected_score(&team_one.as_opponent(0.0), &team_two.as_opponent(0.0))
}
