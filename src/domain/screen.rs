//! Multi-factor screen: ranks instruments on weighted metrics as of a date.
//!
//! Each criterion contributes either its 0-based rank position (`Rank`) or
//! its raw value (`Score`). The aggregation policy fixes the default mode and
//! the sort sense:
//! - `RankWeighted`: sum(w * rank), ascending, lower is better
//! - `ScoreWeighted`: sum(w * value), descending, higher is better; the sign
//!   of the weight carries the direction
//!
//! Ties keep the order of the input instrument list. An instrument missing
//! any metric value on the as-of date is dropped.

use crate::domain::analytics::MetricKey;
use crate::domain::error::RotatorError;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const WEIGHT_TOLERANCE: f64 = 1e-3;

/// Resolves a metric to per-symbol values valid on a date.
pub trait MetricSource {
    fn metric_values(
        &self,
        key: &MetricKey,
        as_of: NaiveDate,
    ) -> Result<HashMap<String, f64>, RotatorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "higher" | "desc" => Ok(Direction::HigherIsBetter),
            "lower" | "asc" => Ok(Direction::LowerIsBetter),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricMode {
    Rank,
    Score,
}

impl FromStr for MetricMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rank" => Ok(MetricMode::Rank),
            "score" => Ok(MetricMode::Score),
            other => Err(format!("unknown metric mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    ScoreWeighted,
    RankWeighted,
}

impl Aggregation {
    pub fn default_mode(&self) -> MetricMode {
        match self {
            Aggregation::ScoreWeighted => MetricMode::Score,
            Aggregation::RankWeighted => MetricMode::Rank,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::ScoreWeighted => write!(f, "score"),
            Aggregation::RankWeighted => write!(f, "rank"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "score" | "score_weighted" => Ok(Aggregation::ScoreWeighted),
            "rank" | "rank_weighted" => Ok(Aggregation::RankWeighted),
            other => Err(format!("unknown aggregation '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub metric: MetricKey,
    pub weight: f64,
    pub direction: Direction,
    /// Overrides the aggregation's default mode for this metric.
    pub mode: Option<MetricMode>,
}

impl Criterion {
    pub fn new(metric: MetricKey, weight: f64, direction: Direction) -> Self {
        Criterion {
            metric,
            weight,
            direction,
            mode: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenSpec {
    pub aggregation: Aggregation,
    pub criteria: Vec<Criterion>,
}

impl ScreenSpec {
    pub fn validate(&self) -> Result<(), RotatorError> {
        if self.criteria.is_empty() {
            return Err(RotatorError::InvalidWeights {
                reason: "at least one metric is required".into(),
            });
        }
        if let Some(c) = self.criteria.iter().find(|c| !c.weight.is_finite()) {
            return Err(RotatorError::InvalidWeights {
                reason: format!("weight for {} is not finite", c.metric),
            });
        }
        if let Some(c) = self.criteria.iter().find(|c| !self.sign_agrees(c)) {
            let expected = if self.expected_sign(c) < 0.0 { "negative" } else { "positive" };
            return Err(RotatorError::InvalidWeights {
                reason: format!(
                    "weight {} for {} must be {expected} for a {:?} metric under {} aggregation",
                    c.weight, c.metric, c.direction, self.aggregation
                ),
            });
        }
        let sum: f64 = self.criteria.iter().map(|c| c.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(RotatorError::InvalidWeights {
                reason: format!("weights sum to {sum}, expected 1"),
            });
        }
        Ok(())
    }

    fn mode_of(&self, criterion: &Criterion) -> MetricMode {
        criterion.mode.unwrap_or(self.aggregation.default_mode())
    }

    /// Raw values enter a score-weighted sum as-is, so the weight's sign
    /// carries the direction. Every other term is already oriented.
    fn expected_sign(&self, criterion: &Criterion) -> f64 {
        match (self.aggregation, self.mode_of(criterion), criterion.direction) {
            (Aggregation::ScoreWeighted, MetricMode::Score, Direction::LowerIsBetter) => -1.0,
            _ => 1.0,
        }
    }

    fn sign_agrees(&self, criterion: &Criterion) -> bool {
        criterion.weight * self.expected_sign(criterion) >= 0.0
    }
}

/// One ranked instrument. `values` follows the criteria order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenRow {
    pub position: usize,
    pub symbol: String,
    pub score: f64,
    pub values: Vec<f64>,
}

pub fn screen(
    source: &dyn MetricSource,
    as_of: NaiveDate,
    instruments: &[String],
    spec: &ScreenSpec,
) -> Result<Vec<ScreenRow>, RotatorError> {
    spec.validate()?;

    let maps = spec
        .criteria
        .iter()
        .map(|c| source.metric_values(&c.metric, as_of))
        .collect::<Result<Vec<_>, _>>()?;

    let candidates: Vec<(&String, Vec<f64>)> = instruments
        .iter()
        .filter_map(|symbol| {
            let values: Option<Vec<f64>> = maps
                .iter()
                .map(|m| m.get(symbol).copied().filter(|v| v.is_finite()))
                .collect();
            values.map(|v| (symbol, v))
        })
        .collect();

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut scores = vec![0.0_f64; candidates.len()];
    for (m, criterion) in spec.criteria.iter().enumerate() {
        let column: Vec<f64> = candidates.iter().map(|(_, v)| v[m]).collect();
        let mode = spec.mode_of(criterion);
        let terms = match mode {
            MetricMode::Rank => rank_positions(&column, criterion.direction)
                .into_iter()
                .map(|r| r as f64)
                .collect::<Vec<_>>(),
            MetricMode::Score => column,
        };
        for (score, term) in scores.iter_mut().zip(terms) {
            *score += criterion.weight * orient(spec.aggregation, mode, criterion.direction, term);
        }
    }

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    match spec.aggregation {
        Aggregation::RankWeighted => order.sort_by(|&a, &b| cmp_f64(scores[a], scores[b])),
        Aggregation::ScoreWeighted => order.sort_by(|&a, &b| cmp_f64(scores[b], scores[a])),
    }

    Ok(order
        .into_iter()
        .enumerate()
        .map(|(i, idx)| ScreenRow {
            position: i + 1,
            symbol: candidates[idx].0.clone(),
            score: scores[idx],
            values: candidates[idx].1.clone(),
        })
        .collect())
}

/// Maps a term onto the aggregation's sort sense.
fn orient(aggregation: Aggregation, mode: MetricMode, direction: Direction, term: f64) -> f64 {
    match (aggregation, mode) {
        (Aggregation::RankWeighted, MetricMode::Rank) => term,
        (Aggregation::RankWeighted, MetricMode::Score) => match direction {
            Direction::HigherIsBetter => -term,
            Direction::LowerIsBetter => term,
        },
        (Aggregation::ScoreWeighted, MetricMode::Score) => term,
        (Aggregation::ScoreWeighted, MetricMode::Rank) => -term,
    }
}

/// 0-based position of each value after a stable sort, best first.
pub fn rank_positions(values: &[f64], direction: Direction) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    match direction {
        Direction::HigherIsBetter => order.sort_by(|&a, &b| cmp_f64(values[b], values[a])),
        Direction::LowerIsBetter => order.sort_by(|&a, &b| cmp_f64(values[a], values[b])),
    }
    let mut ranks = vec![0; values.len()];
    for (position, idx) in order.into_iter().enumerate() {
        ranks[idx] = position;
    }
    ranks
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Produces the ranked candidates for one rebalance date.
pub trait Screener {
    fn screen(&self, as_of: NaiveDate) -> Result<Vec<ScreenRow>, RotatorError>;
}

impl<F> Screener for F
where
    F: Fn(NaiveDate) -> Result<Vec<ScreenRow>, RotatorError>,
{
    fn screen(&self, as_of: NaiveDate) -> Result<Vec<ScreenRow>, RotatorError> {
        self(as_of)
    }
}

/// A screen bound to a metric source and a fixed instrument list.
pub struct ScreenEngine<'a> {
    pub source: &'a dyn MetricSource,
    pub instruments: Vec<String>,
    pub spec: ScreenSpec,
}

impl Screener for ScreenEngine<'_> {
    fn screen(&self, as_of: NaiveDate) -> Result<Vec<ScreenRow>, RotatorError> {
        screen(self.source, as_of, &self.instruments, &self.spec)
    }
}
