//! Quantile scorer: distribution-relative 1..5 scores.
//!
//! A scale is built from the whole window's population for one dimension
//! and then scores individual values against it.
//!
//!   percentile = (# population values strictly worse than v + 1) / n
//!   score      = ceil(5 × percentile), clamped to 1..=5
//!
//! giving equal-width bands at 20/40/60/80/100 %. "Worse" is `< v` when
//! higher is better and `> v` when lower is better (recency).
//!
//! Ties share the lowest rank of their group, so equal raw values always get
//! equal scores regardless of input order, and a large group tied at the
//! floor (one-off buyers at frequency 1) lands in the bottom band. A
//! one-element population is its own 100th percentile and scores 5. An
//! empty scale scores any value as `Score::MID`.

use crate::types::Score;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

const BANDS: usize = 5;

#[derive(Debug, Clone)]
pub struct QuantileScale {
    sorted: Vec<f64>,
    direction: Direction,
}

impl QuantileScale {
    /// Non-finite values are dropped from the population.
    pub fn new<I>(values: I, direction: Direction) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);
        Self { sorted, direction }
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// 1 + number of population values strictly worse than `value`.
    fn rank(&self, value: f64) -> usize {
        let worse = match self.direction {
            Direction::HigherIsBetter => self.sorted.partition_point(|x| *x < value),
            Direction::LowerIsBetter => {
                self.sorted.len() - self.sorted.partition_point(|x| *x <= value)
            }
        };
        worse + 1
    }

    pub fn score(&self, value: f64) -> Score {
        let n = self.sorted.len();
        if n == 0 {
            return Score::MID;
        }
        let rank = self.rank(value);
        // ceil(BANDS * rank / n) without floating point.
        Score::clamped((BANDS * rank).div_ceil(n))
    }
}

/// Score every value of a population against itself.
pub fn score_population(values: &[f64], direction: Direction) -> Vec<Score> {
    let scale = QuantileScale::new(values.iter().copied(), direction);
    values.iter().map(|v| scale.score(*v)).collect()
}
