//! Per-entity trailing-window aggregates over time-ordered rows.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::str::FromStr;

use crate::error::{FeatureError, Result};
use crate::outcome::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollingStat {
    Mean,
    Std,
    Sum,
    Max,
    Min,
}

impl RollingStat {
    /// A single observation has no sample variance, so `Std` needs two.
    pub fn default_min_periods(self) -> usize {
        match self {
            RollingStat::Std => 2,
            _ => 1,
        }
    }

    fn aggregate(self, observed: &[f64]) -> Option<f64> {
        let n = observed.len();
        if n == 0 {
            return None;
        }
        let sum: f64 = observed.iter().sum();
        match self {
            RollingStat::Sum => Some(sum),
            RollingStat::Mean => Some(sum / n as f64),
            RollingStat::Max => observed.iter().copied().reduce(f64::max),
            RollingStat::Min => observed.iter().copied().reduce(f64::min),
            RollingStat::Std => {
                if n < 2 {
                    return None;
                }
                let mean = sum / n as f64;
                let ss: f64 = observed.iter().map(|v| (v - mean).powi(2)).sum();
                Some((ss / (n - 1) as f64).sqrt())
            }
        }
    }
}

impl FromStr for RollingStat {
    type Err = FeatureError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(RollingStat::Mean),
            "std" => Ok(RollingStat::Std),
            "sum" => Ok(RollingStat::Sum),
            "max" => Ok(RollingStat::Max),
            "min" => Ok(RollingStat::Min),
            other => Err(FeatureError::validation(
                "stat",
                format!("unsupported rolling stat {other:?}, expected mean, std, sum, max or min"),
            )),
        }
    }
}

/// Whether a row's own value is part of its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Closed {
    #[default]
    Current,
    Prior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow {
    size: usize,
    min_periods: usize,
    stat: RollingStat,
    closed: Closed,
}

impl RollingWindow {
    pub fn new(size: usize, stat: RollingStat) -> Result<Self> {
        if size == 0 {
            return Err(FeatureError::validation(
                "window",
                "window must be greater than zero",
            ));
        }
        Ok(Self {
            size,
            min_periods: stat.default_min_periods().min(size),
            stat,
            closed: Closed::Current,
        })
    }

    pub fn with_min_periods(mut self, min_periods: usize) -> Result<Self> {
        if min_periods == 0 || min_periods > self.size {
            return Err(FeatureError::validation(
                "min_periods",
                format!(
                    "must be between 1 and the window size {}, got {min_periods}",
                    self.size
                ),
            ));
        }
        self.min_periods = min_periods;
        Ok(self)
    }

    pub fn closed(mut self, closed: Closed) -> Self {
        self.closed = closed;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn min_periods(&self) -> usize {
        self.min_periods
    }

    pub fn stat(&self) -> RollingStat {
        self.stat
    }

    /// One aggregate per input row, in input order.
    ///
    /// Rows must already be sorted by time; each entity only sees its own trailing
    /// `size` rows. A `None` value takes a slot in the window but is not counted
    /// towards `min_periods`.
    pub fn apply<K: Eq + Hash>(
        &self,
        entities: &[K],
        values: &[Option<f64>],
    ) -> Result<Vec<Option<f64>>> {
        if entities.len() != values.len() {
            return Err(FeatureError::validation(
                "values",
                format!(
                    "got {} entity ids but {} values",
                    entities.len(),
                    values.len()
                ),
            ));
        }

        let mut history: HashMap<&K, VecDeque<Option<f64>>> = HashMap::new();
        let mut out = Vec::with_capacity(values.len());
        let mut scratch = Vec::with_capacity(self.size);

        for (entity, value) in entities.iter().zip(values) {
            let window = history.entry(entity).or_default();
            if self.closed == Closed::Current {
                push_bounded(window, *value, self.size);
            }

            scratch.clear();
            scratch.extend(window.iter().flatten().copied());
            let result = if scratch.len() >= self.min_periods {
                self.stat.aggregate(&scratch)
            } else {
                None
            };
            out.push(result);

            if self.closed == Closed::Prior {
                push_bounded(window, *value, self.size);
            }
        }
        Ok(out)
    }
}

fn push_bounded(window: &mut VecDeque<Option<f64>>, value: Option<f64>, size: usize) {
    window.push_back(value);
    while window.len() > size {
        window.pop_front();
    }
}

/// Rolling aggregate by stat name, with the stat's default `min_periods` and the
/// current row included.
pub fn rolling_by_entity<K: Eq + Hash>(
    entities: &[K],
    values: &[Option<f64>],
    window: usize,
    stat: &str,
) -> Result<Vec<Option<f64>>> {
    let stat = stat.parse::<RollingStat>()?;
    RollingWindow::new(window, stat)?.apply(entities, values)
}

/// League points earned from a result, seen from one side.
pub fn points_for(result: Outcome, is_home: bool) -> u32 {
    match (result, is_home) {
        (Outcome::Draw, _) => 1,
        (Outcome::Home, true) | (Outcome::Away, false) => 3,
        _ => 0,
    }
}
