use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

pub const DEFAULT_FORM: f64 = 1.5;
pub const DEFAULT_GOALS: f64 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillNaStrategy {
    #[default]
    Mean,
    Zero,
}

/// Numeric encoding of the favourite flag expected by the trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavFlagEncoding {
    /// 1 when the home side is favoured, 0 otherwise.
    Binary,
    /// 1 home favoured, 0 level, -1 away favoured.
    #[default]
    Signed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum H2hMode {
    /// Zero-filled counters kept only for schema parity.
    #[default]
    Placeholder,
    /// Counts drawn from earlier meetings of the two teams.
    History,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub form_window: usize,
    pub goal_window: usize,
    pub h2h_window: usize,
    pub min_matches: usize,
    pub fill_na_strategy: FillNaStrategy,
    pub fav_flag_encoding: FavFlagEncoding,
    pub h2h_mode: H2hMode,
    // When false a match's own result never feeds its form features.
    pub include_current_match: bool,
    pub default_form: f64,
    pub default_goals: f64,
    pub high_scoring_threshold: f64,
    pub low_scoring_threshold: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            form_window: 5,
            goal_window: 5,
            h2h_window: 5,
            min_matches: 1,
            fill_na_strategy: FillNaStrategy::Mean,
            fav_flag_encoding: FavFlagEncoding::Signed,
            h2h_mode: H2hMode::Placeholder,
            include_current_match: false,
            default_form: DEFAULT_FORM,
            default_goals: DEFAULT_GOALS,
            high_scoring_threshold: 2.5,
            low_scoring_threshold: 1.5,
        }
    }
}

impl FeatureConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from `FEATURE_*` keys, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        let cfg = Self {
            form_window: window_var(&lookup, "FEATURE_FORM_WINDOW", d.form_window)?,
            goal_window: window_var(&lookup, "FEATURE_GOAL_WINDOW", d.goal_window)?,
            h2h_window: window_var(&lookup, "FEATURE_H2H_WINDOW", d.h2h_window)?,
            min_matches: parsed_var(&lookup, "FEATURE_MIN_MATCHES", d.min_matches)?,
            fill_na_strategy: match lookup("FEATURE_FILL_NA").as_deref().map(str::trim) {
                None | Some("") => d.fill_na_strategy,
                Some(raw) => raw.parse()?,
            },
            fav_flag_encoding: match lookup("FEATURE_FAV_FLAG").as_deref().map(str::trim) {
                None | Some("") => d.fav_flag_encoding,
                Some(raw) => raw.parse()?,
            },
            h2h_mode: match lookup("FEATURE_H2H_MODE").as_deref().map(str::trim) {
                None | Some("") => d.h2h_mode,
                Some(raw) => raw.parse()?,
            },
            include_current_match: lookup("FEATURE_INCLUDE_CURRENT")
                .map(|v| {
                    let t = v.trim().to_ascii_lowercase();
                    !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
                })
                .unwrap_or(d.include_current_match),
            ..d
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, window) in [
            ("form_window", self.form_window),
            ("goal_window", self.goal_window),
            ("h2h_window", self.h2h_window),
        ] {
            if window == 0 {
                return Err(FeatureError::validation(
                    field,
                    "window must be greater than zero",
                ));
            }
        }
        let smallest = self.form_window.min(self.goal_window);
        if self.min_matches == 0 || self.min_matches > smallest {
            return Err(FeatureError::validation(
                "min_matches",
                format!(
                    "must be between 1 and the smallest rolling window ({smallest}), got {}",
                    self.min_matches
                ),
            ));
        }
        for (field, value) in [
            ("default_form", self.default_form),
            ("default_goals", self.default_goals),
            ("high_scoring_threshold", self.high_scoring_threshold),
            ("low_scoring_threshold", self.low_scoring_threshold),
        ] {
            if !value.is_finite() {
                return Err(FeatureError::validation(field, "must be finite"));
            }
        }
        Ok(())
    }
}

impl FromStr for FillNaStrategy {
    type Err = FeatureError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "zero" => Ok(Self::Zero),
            other => Err(FeatureError::validation(
                "fill_na_strategy",
                format!("unsupported strategy {other:?}, expected mean or zero"),
            )),
        }
    }
}

impl FromStr for FavFlagEncoding {
    type Err = FeatureError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            "signed" => Ok(Self::Signed),
            other => Err(FeatureError::validation(
                "fav_flag_encoding",
                format!("unsupported encoding {other:?}, expected binary or signed"),
            )),
        }
    }
}

impl FromStr for H2hMode {
    type Err = FeatureError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "placeholder" => Ok(Self::Placeholder),
            "history" => Ok(Self::History),
            other => Err(FeatureError::validation(
                "h2h_mode",
                format!("unsupported mode {other:?}, expected placeholder or history"),
            )),
        }
    }
}

fn window_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: usize,
) -> Result<usize> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value = raw.trim().parse::<i64>().map_err(|_| {
        FeatureError::validation(key, format!("window must be an integer, got {raw:?}"))
    })?;
    if value <= 0 {
        return Err(FeatureError::validation(
            key,
            format!("window must be greater than zero, got {value}"),
        ));
    }
    usize::try_from(value)
        .map_err(|_| FeatureError::validation(key, format!("window {value} is too large")))
}

fn parsed_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<T>()
        .map_err(|_| FeatureError::validation(key, format!("cannot parse {raw:?}")))
}
