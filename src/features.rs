//! Ordered feature rows and the fixed-field records that project into them.

use serde::{Deserialize, Serialize};

use crate::config::FeatureConfig;
use crate::error::{FeatureError, Result};

/// Team-level aggregates shared by the batch table and the inference vector.
pub const TEAM_COLUMNS: [&str; 6] = [
    "home_form",
    "away_form",
    "home_avg_goals_for",
    "home_avg_goals_against",
    "away_avg_goals_for",
    "away_avg_goals_against",
];

/// Feature name to value mapping with a stable column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            names: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Sets `name`, appending it when the row does not have it yet.
    pub fn insert(&mut self, name: &str, value: f64) {
        match self.position(name) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.names.push(name.to_string());
                self.values.push(value);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.position(name).map(|idx| self.values[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Copy of the named columns, in the order given. Absent names are skipped.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> FeatureRow {
        let mut out = FeatureRow::with_capacity(names.len());
        for name in names {
            if let Some(value) = self.get(name.as_ref()) {
                out.insert(name.as_ref(), value);
            }
        }
        out
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for FeatureRow {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut row = FeatureRow::new();
        for (name, value) in iter {
            row.insert(name.as_ref(), value);
        }
        row
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamStats {
    pub home_form: f64,
    pub away_form: f64,
    pub home_avg_goals_for: f64,
    pub home_avg_goals_against: f64,
    pub away_avg_goals_for: f64,
    pub away_avg_goals_against: f64,
}

impl TeamStats {
    pub fn defaults(cfg: &FeatureConfig) -> Self {
        Self {
            home_form: cfg.default_form,
            away_form: cfg.default_form,
            home_avg_goals_for: cfg.default_goals,
            home_avg_goals_against: cfg.default_goals,
            away_avg_goals_for: cfg.default_goals,
            away_avg_goals_against: cfg.default_goals,
        }
    }

    pub fn values(&self) -> [f64; 6] {
        [
            self.home_form,
            self.away_form,
            self.home_avg_goals_for,
            self.home_avg_goals_against,
            self.away_avg_goals_for,
            self.away_avg_goals_against,
        ]
    }

    pub fn append_to(&self, row: &mut FeatureRow) {
        for (name, value) in TEAM_COLUMNS.iter().zip(self.values()) {
            row.insert(name, value);
        }
    }
}

/// Externally supplied team aggregates; any unset field takes the configured default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamStatsInput {
    pub home_form: Option<f64>,
    pub away_form: Option<f64>,
    pub home_avg_goals_for: Option<f64>,
    pub home_avg_goals_against: Option<f64>,
    pub away_avg_goals_for: Option<f64>,
    pub away_avg_goals_against: Option<f64>,
}

impl TeamStatsInput {
    pub fn resolve(&self, cfg: &FeatureConfig) -> Result<TeamStats> {
        let d = TeamStats::defaults(cfg);
        Ok(TeamStats {
            home_form: finite_or("home_form", self.home_form, d.home_form)?,
            away_form: finite_or("away_form", self.away_form, d.away_form)?,
            home_avg_goals_for: finite_or(
                "home_avg_goals_for",
                self.home_avg_goals_for,
                d.home_avg_goals_for,
            )?,
            home_avg_goals_against: finite_or(
                "home_avg_goals_against",
                self.home_avg_goals_against,
                d.home_avg_goals_against,
            )?,
            away_avg_goals_for: finite_or(
                "away_avg_goals_for",
                self.away_avg_goals_for,
                d.away_avg_goals_for,
            )?,
            away_avg_goals_against: finite_or(
                "away_avg_goals_against",
                self.away_avg_goals_against,
                d.away_avg_goals_against,
            )?,
        })
    }
}

impl From<TeamStats> for TeamStatsInput {
    fn from(stats: TeamStats) -> Self {
        Self {
            home_form: Some(stats.home_form),
            away_form: Some(stats.away_form),
            home_avg_goals_for: Some(stats.home_avg_goals_for),
            home_avg_goals_against: Some(stats.home_avg_goals_against),
            away_avg_goals_for: Some(stats.away_avg_goals_for),
            away_avg_goals_against: Some(stats.away_avg_goals_against),
        }
    }
}

fn finite_or(field: &str, value: Option<f64>, default: f64) -> Result<f64> {
    match value {
        None => Ok(default),
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(FeatureError::validation(
            field,
            format!("team stat must be finite, got {v}"),
        )),
    }
}
