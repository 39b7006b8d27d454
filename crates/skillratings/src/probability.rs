#![allow(clippy::float_cmp)]
//! Win probabilities: the Glicko-2 expectation between two rating points,
//! faction ("category") matchup lookups, and the composition of both signals.
//!
//! Categories are coarse team types, for example the faction a team plays.
//! Some categories beat others more often than skill alone would predict,
//! so the historical matchup win rate is kept in a sparse [`CategoryTable`]
//! and combined with the skill probability by adding their log-odds.
//!
//! ```rust
//! # use assert_eq_float::assert_eq_float;
//! use skillratings::probability::{CategoryTable, combine};
//!
//! let mut table = CategoryTable::new();
//! table.insert("ISDF", "Scion", 0.5215).unwrap();
//!
//! assert_eq_float!(table.win_probability("Scion", "ISDF"), 1.0 - 0.5215);
//! assert_eq_float!(table.win_probability("Hadean", "Hadean"), 0.5);
//!
//! // Even skill, the faction matchup decides.
//! assert!((combine(0.5, table.win_probability("ISDF", "Scion")) - 0.5215).abs() < 1e-12);
//! ```

use std::{collections::BTreeMap, f64::consts::PI};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Probabilities are kept inside `[PROBABILITY_EPSILON, 1 - PROBABILITY_EPSILON]`
/// before they are composed or turned into odds.
pub const PROBABILITY_EPSILON: f64 = 0.000_1;

/// Neutral probability, used for mirror matchups and missing matchup data.
pub const NEUTRAL: f64 = 0.5;

#[must_use]
/// The Glicko-2 `g` function, which dampens a rating difference by the opponent's uncertainty.
///
/// Monotonically decreasing in `phi`, `g(0) = 1`.
pub fn g(phi: f64) -> f64 {
    1.0 / (3.0 * phi.powi(2) / PI.powi(2) + 1.0).sqrt()
}

#[must_use]
/// Expected score of a player at `mu` against an opponent at `mu_opponent` with uncertainty `phi_opponent`,
/// all on the internal Glicko-2 scale.
///
/// Returns a probability in `(0, 1)`. `phi_opponent` must not be negative.
///
/// # Examples
/// ```rust
/// # use assert_eq_float::assert_eq_float;
/// use skillratings::probability::expected_score;
///
/// assert_eq_float!(expected_score(0.3, 0.3, 1.2), 0.5);
/// assert!(expected_score(0.6, 0.5, 0.5) > 0.5);
/// ```
pub fn expected_score(mu: f64, mu_opponent: f64, phi_opponent: f64) -> f64 {
    1.0 / (1.0 + (-g(phi_opponent) * (mu - mu_opponent)).exp())
}

#[must_use]
/// Clamps a probability into `[PROBABILITY_EPSILON, 1 - PROBABILITY_EPSILON]`.
pub fn clamp_probability(probability: f64) -> f64 {
    probability.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON)
}

#[must_use]
/// Combines a skill based win probability with a category matchup probability.
///
/// This is a multiplication of odds, i.e. the sum of both logits.
/// Both inputs are clamped first, so the result is never NaN even when both signals sit at opposing extremes.
///
/// # Examples
/// ```rust
/// use skillratings::probability::combine;
///
/// assert!((combine(0.7, 0.5) - 0.7).abs() < 1e-12);
/// assert!(combine(1.0, 0.0).is_finite());
/// ```
pub fn combine(skill_probability: f64, category_probability: f64) -> f64 {
    let skill = clamp_probability(skill_probability);
    let category = clamp_probability(category_probability);

    let numerator = skill * category;
    numerator / (1.0 - skill).mul_add(1.0 - category, numerator)
}

#[must_use]
/// Expresses a category win probability as a bonus on the public rating scale.
///
/// `-400 * log10(1 / p - 1)`, so a neutral matchup is worth exactly `0.0` points
/// and a favoured one is worth a positive amount.
pub fn category_bonus(probability: f64) -> f64 {
    if probability == NEUTRAL {
        return 0.0;
    }
    let probability = clamp_probability(probability);
    -400.0 * (1.0 / probability - 1.0).log10()
}

#[must_use]
/// Looks up the win probability of `first` against `second` in the `table`.
///
/// See [`CategoryTable::win_probability`].
pub fn category_win_probability(first: &str, second: &str, table: &CategoryTable) -> f64 {
    table.win_probability(first, second)
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
/// Sparse table of historical matchup win rates between categories.
///
/// Each unordered pair is stored once, as the probability that the outer key beats the inner key.
/// The reverse matchup is derived as `1 - p`, mirror matchups are always `0.5`.
///
/// When deserialized, the table is not validated. Call [`CategoryTable::validate`] before use.
pub struct CategoryTable {
    matchups: BTreeMap<String, BTreeMap<String, f64>>,
}

impl CategoryTable {
    #[must_use]
    /// An empty table: every matchup is neutral.
    pub const fn new() -> Self {
        Self {
            matchups: BTreeMap::new(),
        }
    }

    /// Stores the probability that `first` beats `second`.
    ///
    /// If the reversed pair was stored before, it is replaced.
    ///
    /// # Errors
    /// Fails for mirror matchups and for probabilities outside of `(0, 1)`.
    pub fn insert(
        &mut self,
        first: impl Into<String>,
        second: impl Into<String>,
        probability: f64,
    ) -> Result<(), ConfigError> {
        let (first, second) = (first.into(), second.into());
        validate_matchup(&first, &second, probability)?;

        if let Some(reversed) = self.matchups.get_mut(&second) {
            reversed.remove(&first);
            if reversed.is_empty() {
                self.matchups.remove(&second);
            }
        }
        self.matchups
            .entry(first)
            .or_default()
            .insert(second, probability);
        Ok(())
    }

    /// Checks every stored matchup, as [`CategoryTable::insert`] would.
    ///
    /// A deserialized table may hold a pair in both directions, which `insert` never produces.
    ///
    /// # Errors
    /// Returns the first invalid matchup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matchups
            .iter()
            .flat_map(|(first, row)| row.iter().map(move |(second, p)| (first, second, *p)))
            .try_for_each(|(first, second, probability)| {
                validate_matchup(first, second, probability)?;
                if first < second && self.lookup(second, first).is_some() {
                    return Err(ConfigError::DuplicateMatchup {
                        first: first.clone(),
                        second: second.clone(),
                    });
                }
                Ok(())
            })
    }

    #[must_use]
    /// Probability that `first` beats `second` based on category alone.
    ///
    /// Consults the table in both directions, falls back to `0.5` without data.
    pub fn win_probability(&self, first: &str, second: &str) -> f64 {
        if first == second {
            return NEUTRAL;
        }
        if let Some(p) = self.lookup(first, second) {
            return p;
        }
        self.lookup(second, first).map_or(NEUTRAL, |p| 1.0 - p)
    }

    #[must_use]
    /// `true` if `category` appears in any stored matchup.
    pub fn contains_category(&self, category: &str) -> bool {
        self.matchups.contains_key(category)
            || self.matchups.values().any(|row| row.contains_key(category))
    }

    #[must_use]
    /// Number of stored matchups.
    pub fn len(&self) -> usize {
        self.matchups.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    /// `true` if no matchup is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, first: &str, second: &str) -> Option<f64> {
        self.matchups.get(first)?.get(second).copied()
    }
}

fn validate_matchup(first: &str, second: &str, probability: f64) -> Result<(), ConfigError> {
    if first == second || !(probability > 0.0 && probability < 1.0) {
        return Err(ConfigError::MatchupProbability {
            first: first.to_owned(),
            second: second.to_owned(),
            probability,
        });
    }
    Ok(())
}
