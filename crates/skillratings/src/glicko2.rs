//! The Glicko-2 algorithm, an improvement on Glicko and a widely used rating system.
//!
//! Every player carries a rating, a rating deviation (the uncertainty of the rating)
//! and a volatility, which measures how consistent the player's results are.
//! Ratings live on the familiar public scale centred at 1500. The update itself runs on the
//! internal Glicko-2 scale, see [`ScaleRating`].
//!
//! # Quickstart
//!
//! ```rust
//! use skillratings::{
//!     Outcomes,
//!     glicko2::{Glicko2Config, Glicko2Rating, glicko2},
//! };
//!
//! // Initialise a new player rating with a rating of 1500, a deviation of 350 and a volatility of 0.06.
//! let player_one = Glicko2Rating::new();
//!
//! // Or you can initialise it with your own values of course.
//! // Imagine these numbers being pulled from a database.
//! let (some_rating, some_deviation, some_volatility) = (1325.0, 230.0, 0.05932);
//! let player_two = Glicko2Rating {
//!     rating: some_rating,
//!     deviation: some_deviation,
//!     volatility: some_volatility,
//! };
//!
//! // The outcome of the match is from the perspective of player one.
//! let outcome = Outcomes::WIN;
//!
//! // The config allows you to change the system constant tau.
//! // Reasonable choices are between 0.3 and 1.2, lower values prevent
//! // volatility from changing by large amounts.
//! let config = Glicko2Config {
//!     tau: 0.6,
//!     ..Default::default()
//! };
//!
//! let (new_one, new_two) = glicko2(&player_one, &player_two, &outcome, &config);
//!
//! assert!(new_one.rating > player_one.rating);
//! assert!(new_two.rating < player_two.rating);
//! ```
//!
//! # More Information
//! - [Original Paper (PDF)](http://www.glicko.net/glicko/glicko2.pdf)
//! - [Glicko-2 Wikipedia](https://en.wikipedia.org/wiki/Glicko_rating_system)

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, Outcomes, Rating, RatingPeriodSystem, RatingSystem,
    probability::{self, g},
};

/// Ratio between the public rating scale and the internal Glicko-2 scale.
pub const SCALING_FACTOR: f64 = 173.7178;
/// Public rating that maps onto `mu = 0`, also the rating of a new player.
pub const DEFAULT_RATING: f64 = 1500.0;
/// Deviation of a new player.
pub const DEFAULT_DEVIATION: f64 = 350.0;
/// Volatility of a new player.
pub const DEFAULT_VOLATILITY: f64 = 0.06;

// Bracketing and refining the volatility converge in a handful of steps for finite inputs.
const MAX_ITERATIONS: usize = 1_000;

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// The Glicko-2 rating of a player, on the public scale.
///
/// The default rating is 1500.0.
/// The default deviation is 350.0.
/// The default volatility is 0.06.
pub struct Glicko2Rating {
    /// The player's Glicko-2 rating number, by default 1500.0.
    pub rating: f64,
    /// The player's Glicko-2 deviation number, by default 350.0.
    pub deviation: f64,
    /// The player's Glicko-2 volatility number, by default 0.06.
    pub volatility: f64,
}

impl Glicko2Rating {
    #[must_use]
    /// Initialise a new `Glicko2Rating` with a rating of 1500.0, a deviation of 350.0 and a volatility of 0.06.
    pub const fn new() -> Self {
        Self {
            rating: DEFAULT_RATING,
            deviation: DEFAULT_DEVIATION,
            volatility: DEFAULT_VOLATILITY,
        }
    }

    /// Checks that deviation and volatility are positive and finite, and the rating is finite.
    ///
    /// # Errors
    /// Names the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value, positive) in [
            ("rating", self.rating, false),
            ("deviation", self.deviation, true),
            ("volatility", self.volatility, true),
        ] {
            if !value.is_finite() || (positive && value <= 0.0) {
                return Err(ConfigError::DefaultRating { field, value });
            }
        }
        Ok(())
    }
}

impl Default for Glicko2Rating {
    fn default() -> Self {
        Self::new()
    }
}

impl Rating for Glicko2Rating {
    fn rating(&self) -> f64 {
        self.rating
    }
    fn uncertainty(&self) -> Option<f64> {
        Some(self.deviation)
    }
    fn new(rating: Option<f64>, uncertainty: Option<f64>) -> Self {
        Self {
            rating: rating.unwrap_or(DEFAULT_RATING),
            deviation: uncertainty.unwrap_or(DEFAULT_DEVIATION),
            volatility: DEFAULT_VOLATILITY,
        }
    }
}

impl From<(f64, f64, f64)> for Glicko2Rating {
    fn from((r, d, v): (f64, f64, f64)) -> Self {
        Self {
            rating: r,
            deviation: d,
            volatility: v,
        }
    }
}

impl From<ScaleRating> for Glicko2Rating {
    fn from(scale: ScaleRating) -> Self {
        to_public(&scale)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
/// A [`Glicko2Rating`] on the internal Glicko-2 scale.
///
/// `mu = 0` is the public default rating, `phi` and `sigma` are deviation and volatility.
pub struct ScaleRating {
    /// Rating, `(rating - 1500) / 173.7178`.
    pub mu: f64,
    /// Deviation, `deviation / 173.7178`.
    pub phi: f64,
    /// Volatility, unscaled.
    pub sigma: f64,
}

impl From<Glicko2Rating> for ScaleRating {
    fn from(rating: Glicko2Rating) -> Self {
        to_internal(&rating)
    }
}

#[must_use]
/// Converts a public rating onto the internal Glicko-2 scale.
pub fn to_internal(rating: &Glicko2Rating) -> ScaleRating {
    ScaleRating {
        mu: (rating.rating - DEFAULT_RATING) / SCALING_FACTOR,
        phi: rating.deviation / SCALING_FACTOR,
        sigma: rating.volatility,
    }
}

#[must_use]
/// Converts an internal Glicko-2 rating back onto the public scale.
pub fn to_public(scale: &ScaleRating) -> Glicko2Rating {
    Glicko2Rating {
        rating: scale.mu.mul_add(SCALING_FACTOR, DEFAULT_RATING),
        deviation: scale.phi * SCALING_FACTOR,
        volatility: scale.sigma,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// Constants used in the Glicko-2 calculations.
pub struct Glicko2Config {
    /// The tau constant constrains the change in volatility over time.
    /// To cite Glickman himself: "Reasonable choices are between 0.3 and 1.2".
    /// Smaller values mean less change in volatility and vice versa.
    /// The default value here is `0.5`.
    pub tau: f64,
    /// The convergence tolerance value, the smaller the value the more accurate the volatility calculations.
    /// The default value is `0.000_001`, as suggested in [the paper (page 3)](http://www.glicko.net/glicko/glicko2.pdf).
    /// Do not set this to a negative value.
    pub convergence_tolerance: f64,
    /// Lower bound of the internal deviation (`phi`) after an update.
    /// By default set to `0.000_001`.
    pub deviation_tolerance: f64,
    /// Lower bound of the volatility after an update.
    /// By default set to `0.000_001`.
    pub volatility_tolerance: f64,
}

impl Glicko2Config {
    #[must_use]
    /// Initialise a new `Glicko2Config` with a tau value of `0.5`, a convergence tolerance of `0.000_001`
    /// and deviation and volatility floors of `0.000_001`.
    pub const fn new() -> Self {
        Self {
            tau: 0.5,
            convergence_tolerance: 0.000_001,
            deviation_tolerance: 0.000_001,
            volatility_tolerance: 0.000_001,
        }
    }

    /// A default config with a custom `tau`.
    ///
    /// # Errors
    /// Rejects a `tau` which is not positive and finite.
    pub fn with_tau(tau: f64) -> Result<Self, ConfigError> {
        let config = Self {
            tau,
            ..Self::new()
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that `tau` is positive and finite.
    ///
    /// # Errors
    /// Returns [`ConfigError::Tau`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tau.is_finite() && self.tau > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::Tau(self.tau))
        }
    }
}

impl Default for Glicko2Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Struct to calculate ratings and expected score for [`Glicko2Rating`]
pub struct Glicko2 {
    config: Glicko2Config,
}

impl RatingSystem for Glicko2 {
    type RATING = Glicko2Rating;
    type CONFIG = Glicko2Config;

    fn new(config: Self::CONFIG) -> Self {
        Self { config }
    }

    fn rate(
        &self,
        player_one: &Glicko2Rating,
        player_two: &Glicko2Rating,
        outcome: &Outcomes,
    ) -> (Glicko2Rating, Glicko2Rating) {
        glicko2(player_one, player_two, outcome, &self.config)
    }

    fn expected_score(&self, player_one: &Glicko2Rating, player_two: &Glicko2Rating) -> (f64, f64) {
        expected_score(player_one, player_two)
    }
}

impl RatingPeriodSystem for Glicko2 {
    type RATING = Glicko2Rating;
    type CONFIG = Glicko2Config;

    fn new(config: Self::CONFIG) -> Self {
        Self { config }
    }

    fn rate(&self, player: &Glicko2Rating, results: &[(Glicko2Rating, Outcomes)]) -> Glicko2Rating {
        glicko2_rating_period(player, results, &self.config)
    }

    fn expected_score(&self, player: &Glicko2Rating, opponents: &[Glicko2Rating]) -> Vec<f64> {
        expected_score_rating_period(player, opponents)
    }
}

#[must_use]
/// Calculates the [`Glicko2Rating`]s of two players based on their old ratings, deviations, volatilities, and the outcome of the game.
///
/// Takes in two players as [`Glicko2Rating`]s, an [`Outcome`](Outcomes) and a [`Glicko2Config`].
///
/// The outcome of the match is in the perspective of `player_one`.
/// This means [`Outcomes::WIN`] is a win for `player_one` and [`Outcomes::LOSS`] is a win for `player_two`.
///
/// Both players are rated against the other's rating from before the match,
/// as a rating period holding a single game.
pub fn glicko2(
    player_one: &Glicko2Rating,
    player_two: &Glicko2Rating,
    outcome: &Outcomes,
    config: &Glicko2Config,
) -> (Glicko2Rating, Glicko2Rating) {
    (
        glicko2_rating_period(player_one, &[(*player_two, *outcome)], config),
        glicko2_rating_period(player_two, &[(*player_one, outcome.reversed())], config),
    )
}

#[must_use]
/// The Glicko-2 algorithm with a rating period, the way Glickman describes it.
///
/// Takes in a player as a [`Glicko2Rating`] and their results as a Slice of tuples containing the opponent as a [`Glicko2Rating`]
/// and the outcome of the game as an [`Outcome`](Outcomes), and a [`Glicko2Config`].
///
/// The outcome of the match is in the perspective of the player.
/// This means [`Outcomes::WIN`] is a win for the player and [`Outcomes::LOSS`] is a win for the opponent.
///
/// # Panics
/// - if `results` is empty: a rating period without games is not an update.
/// - if the volatility iteration does not converge, which only happens on non-finite inputs.
///
/// # Examples
/// ```rust
/// use skillratings::{
///     Outcomes,
///     glicko2::{Glicko2Config, Glicko2Rating, glicko2_rating_period},
/// };
///
/// // The example from Glickman's paper.
/// let player = Glicko2Rating {
///     rating: 1500.0,
///     deviation: 200.0,
///     volatility: 0.06,
/// };
///
/// let results = vec![
///     (Glicko2Rating::from((1400.0, 30.0, 0.06)), Outcomes::WIN),
///     (Glicko2Rating::from((1550.0, 100.0, 0.06)), Outcomes::LOSS),
///     (Glicko2Rating::from((1700.0, 300.0, 0.06)), Outcomes::LOSS),
/// ];
///
/// let new_player = glicko2_rating_period(&player, &results, &Glicko2Config::new());
///
/// assert_eq!((new_player.rating * 100.0).round(), 146_405.0);
/// assert_eq!((new_player.deviation * 100.0).round(), 15_152.0);
/// assert_eq!((new_player.volatility * 100_000.0).round(), 6_000.0);
/// ```
pub fn glicko2_rating_period(
    player: &Glicko2Rating,
    results: &[(Glicko2Rating, Outcomes)],
    config: &Glicko2Config,
) -> Glicko2Rating {
    assert!(
        !results.is_empty(),
        "a Glicko-2 rating period needs at least one result"
    );

    let player = to_internal(player);

    let (information, score_sum) =
        results
            .iter()
            .fold((0.0, 0.0), |(information, score_sum), (opponent, outcome)| {
                let opponent = to_internal(opponent);
                let g = g(opponent.phi);
                let e = probability::expected_score(player.mu, opponent.mu, opponent.phi);
                (
                    (g * g).mul_add(e * (1.0 - e), information),
                    g.mul_add(outcome.to_score() - e, score_sum),
                )
            });

    let v = information.recip();
    let delta = v * score_sum;

    let new_volatility = new_volatility(&player, delta, v, config);

    let phi_star = player.phi.hypot(new_volatility);
    let new_phi = (phi_star.powi(2).recip() + information)
        .sqrt()
        .recip()
        .max(config.deviation_tolerance);
    let new_mu = new_phi.powi(2).mul_add(score_sum, player.mu);

    to_public(&ScaleRating {
        mu: new_mu,
        phi: new_phi,
        sigma: new_volatility.max(config.volatility_tolerance),
    })
}

#[must_use]
/// Calculates the expected outcome of two players.
///
/// Takes in two players as [`Glicko2Rating`]s and returns the probability of victory for each player as an [`f64`] between 1.0 and 0.0.
/// The uncertainty of both players is pooled, `sqrt(phi_one² + phi_two²)`.
///
/// 1.0 means a certain victory for the player, 0.0 means certain loss.
/// Values near 0.5 mean the players are evenly matched.
///
/// # Examples
/// ```rust
/// # use assert_eq_float::assert_eq_float;
/// use skillratings::glicko2::{Glicko2Rating, expected_score};
///
/// let player_one = Glicko2Rating {
///     rating: 2500.0,
///     deviation: 41.0,
///     volatility: 0.06,
/// };
/// let player_two = Glicko2Rating {
///     rating: 1950.0,
///     deviation: 320.0,
///     volatility: 0.06,
/// };
///
/// let (exp_one, exp_two) = expected_score(&player_one, &player_two);
///
/// assert!((exp_one + exp_two - 1.0).abs() < 1e-12);
/// assert_eq_float!((exp_one * 100.0).round(), 90.0);
/// ```
pub fn expected_score(player_one: &Glicko2Rating, player_two: &Glicko2Rating) -> (f64, f64) {
    let one = to_internal(player_one);
    let two = to_internal(player_two);

    let exp_one = probability::expected_score(one.mu, two.mu, one.phi.hypot(two.phi));

    (exp_one, 1.0 - exp_one)
}

#[must_use]
/// Calculates the expected outcome of a player in a rating period.
///
/// Unlike [`expected_score`], only each opponent's deviation is taken into account,
/// exactly the expectation [`glicko2_rating_period`] works with.
pub fn expected_score_rating_period(player: &Glicko2Rating, opponents: &[Glicko2Rating]) -> Vec<f64> {
    let player = to_internal(player);
    opponents
        .iter()
        .map(|o| {
            let o = to_internal(o);
            probability::expected_score(player.mu, o.mu, o.phi)
        })
        .collect()
}

// Step 5 of the paper: the Illinois variant of regula falsi on f(x), with x = ln(sigma'^2).
fn new_volatility(player: &ScaleRating, delta: f64, v: f64, config: &Glicko2Config) -> f64 {
    assert!(
        delta.is_finite() && v.is_finite(),
        "non-finite Glicko-2 step: delta = {delta}, v = {v}"
    );

    let tau = config.tau;
    let phi_sq = player.phi.powi(2);
    let a = player.sigma.powi(2).ln();

    let f = |x: f64| {
        let ex = x.exp();
        let denominator = 2.0 * (phi_sq + v + ex).powi(2);
        ex * (delta.powi(2) - phi_sq - v - ex) / denominator - (x - a) / tau.powi(2)
    };

    let mut big_a = a;
    let mut big_b = if delta.powi(2) > phi_sq + v {
        (delta.powi(2) - phi_sq - v).ln()
    } else {
        let mut k: f64 = 1.0;
        while f(k.mul_add(-tau, a)) < 0.0 {
            k += 1.0;
            assert!(
                k < MAX_ITERATIONS as f64,
                "no Glicko-2 volatility bracket after {MAX_ITERATIONS} steps: delta = {delta}, v = {v}"
            );
        }
        k.mul_add(-tau, a)
    };

    let mut fa = f(big_a);
    let mut fb = f(big_b);

    let mut iterations = 0;
    while (big_b - big_a).abs() > config.convergence_tolerance {
        iterations += 1;
        assert!(
            iterations <= MAX_ITERATIONS,
            "Glicko-2 volatility did not converge after {MAX_ITERATIONS} iterations: delta = {delta}, v = {v}"
        );

        let big_c = (big_a - big_b).mul_add(fa / (fb - fa), big_a);
        let fc = f(big_c);

        if fc * fb <= 0.0 {
            big_a = big_b;
            fa = fb;
        } else {
            fa /= 2.0;
        }

        big_b = big_c;
        fb = fc;
    }

    (big_a / 2.0).exp()
}
