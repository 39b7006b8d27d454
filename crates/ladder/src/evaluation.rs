use skillratings::probability::clamp_probability;
use tracing::info;

use crate::driver::Prediction;

const BUCKETS: usize = 10;

/// Predictions whose team-one probability fell into `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationBucket {
    pub low: f64,
    pub high: f64,
    pub matches: usize,
    pub team_one_wins: usize,
}

impl CalibrationBucket {
    /// How often team one actually won, `None` for an empty bucket.
    pub fn win_rate(&self) -> Option<f64> {
        (self.matches > 0).then(|| self.team_one_wins as f64 / self.matches as f64)
    }
}

/// How well a run predicted its matches, each scored before it was rated.
///
/// An empty run scores `0.0` everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub matches: usize,
    pub correct: usize,
    /// Mean negative log likelihood of the actual winner.
    pub log_loss: f64,
    /// Mean squared error of the team-one probability.
    pub brier_score: f64,
    /// Ten buckets of width `0.1`. A certain prediction lands in the last one.
    pub buckets: Vec<CalibrationBucket>,
}

impl Evaluation {
    pub fn from_predictions(predictions: &[Prediction]) -> Self {
        let mut buckets: Vec<CalibrationBucket> = (0..BUCKETS)
            .map(|i| CalibrationBucket {
                low: i as f64 / BUCKETS as f64,
                high: (i + 1) as f64 / BUCKETS as f64,
                matches: 0,
                team_one_wins: 0,
            })
            .collect();

        let (mut correct, mut log_loss, mut brier_score) = (0, 0.0, 0.0);
        for prediction in predictions {
            let p = prediction.team_one_probability;
            let actual = if prediction.team_one_won { 1.0 } else { 0.0 };

            if prediction.is_correct() {
                correct += 1;
            }
            let safe = clamp_probability(p);
            log_loss -= actual * safe.ln() + (1.0 - actual) * (1.0 - safe).ln();
            brier_score += (p - actual).powi(2);

            let bucket = &mut buckets[bucket_index(p)];
            bucket.matches += 1;
            if prediction.team_one_won {
                bucket.team_one_wins += 1;
            }
        }

        let matches = predictions.len();
        let mean = |sum: f64| if matches == 0 { 0.0 } else { sum / matches as f64 };
        Self {
            matches,
            correct,
            log_loss: mean(log_loss),
            brier_score: mean(brier_score),
            buckets,
        }
    }

    /// Share of correctly called winners.
    pub fn accuracy(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            self.correct as f64 / self.matches as f64
        }
    }

    pub fn log_summary(&self) {
        info!(
            "{} matches, accuracy {:.2}%, log loss {:.5}, brier score {:.4}",
            self.matches,
            self.accuracy() * 100.0,
            self.log_loss,
            self.brier_score
        );
        for bucket in &self.buckets {
            if let Some(win_rate) = bucket.win_rate() {
                info!(
                    "[{:.1} - {:.1}]: {} matches, predicted {:.2}, actual {win_rate:.2}",
                    bucket.low,
                    bucket.high,
                    bucket.matches,
                    (bucket.low + bucket.high) / 2.0
                );
            }
        }
    }
}

fn bucket_index(probability: f64) -> usize {
    ((probability * BUCKETS as f64) as usize).min(BUCKETS - 1)
}
