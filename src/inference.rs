//! Single-row feature vectors for a live fixture.
//!
//! Requests come straight from the serving layer, so every field is validated up
//! front and a bad request is rejected instead of being patched with defaults. The
//! odds block goes through the same [`OddsFeatures`] projection as the training
//! table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FeatureConfig;
use crate::error::{FeatureError, Result};
use crate::features::{FeatureRow, TEAM_COLUMNS, TeamStatsInput};
use crate::odds::{ODDS_COLUMNS, OddsFeatures, OddsTriple};

pub const MAX_TEAM_NAME_LEN: usize = 100;
pub const MAX_ODDS: f64 = 1000.0;

pub const MARKER_COLUMNS: [&str; 2] = ["is_home", "is_away"];

/// Column order of the inference vector.
pub fn inference_columns() -> Vec<String> {
    ODDS_COLUMNS
        .iter()
        .chain(TEAM_COLUMNS.iter())
        .chain(MARKER_COLUMNS.iter())
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub home_team: String,
    pub away_team: String,
    #[serde(alias = "odds_h")]
    pub home_odds: f64,
    #[serde(alias = "odds_d")]
    pub draw_odds: f64,
    #[serde(alias = "odds_a")]
    pub away_odds: f64,
    #[serde(default)]
    pub team_stats: Option<TeamStatsInput>,
}

impl InferenceRequest {
    pub fn odds(&self) -> OddsTriple {
        OddsTriple::new(self.home_odds, self.draw_odds, self.away_odds)
    }

    pub fn validate(&self) -> Result<()> {
        validate_team_name("home_team", &self.home_team)?;
        validate_team_name("away_team", &self.away_team)?;
        if self.home_team.trim() == self.away_team.trim() {
            return Err(FeatureError::validation(
                "away_team",
                "home and away teams must differ",
            ));
        }
        for (field, value) in [
            ("home_odds", self.home_odds),
            ("draw_odds", self.draw_odds),
            ("away_odds", self.away_odds),
        ] {
            validate_request_odds(field, value)?;
        }
        Ok(())
    }
}

fn validate_team_name(field: &str, name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FeatureError::validation(field, "team name must not be empty"));
    }
    let len = trimmed.chars().count();
    if len > MAX_TEAM_NAME_LEN {
        return Err(FeatureError::validation(
            field,
            format!("team name is {len} characters, limit is {MAX_TEAM_NAME_LEN}"),
        ));
    }
    Ok(())
}

fn validate_request_odds(field: &str, value: f64) -> Result<()> {
    if value.is_nan() {
        return Err(FeatureError::validation(field, "odds must be a number, got NaN"));
    }
    if !value.is_finite() {
        return Err(FeatureError::validation(field, format!("odds must be finite, got {value}")));
    }
    if value <= 0.0 || value > MAX_ODDS {
        return Err(FeatureError::validation(
            field,
            format!("odds must be in (0, {MAX_ODDS}], got {value}"),
        ));
    }
    Ok(())
}

pub struct InferenceFeatureBuilder {
    cfg: FeatureConfig,
}

impl InferenceFeatureBuilder {
    pub fn new(cfg: FeatureConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    pub fn build(&self, req: &InferenceRequest) -> Result<FeatureRow> {
        req.validate()?;
        let odds = OddsFeatures::derive(req.odds())?;
        let stats = req
            .team_stats
            .unwrap_or_default()
            .resolve(&self.cfg)?;

        let mut row = FeatureRow::with_capacity(ODDS_COLUMNS.len() + TEAM_COLUMNS.len() + 2);
        odds.append_to(&mut row, self.cfg.fav_flag_encoding);
        stats.append_to(&mut row);
        row.insert("is_home", 1.0);
        row.insert("is_away", 0.0);

        debug!(
            home = %req.home_team.trim(),
            away = %req.away_team.trim(),
            defaulted_stats = req.team_stats.is_none(),
            "built inference features"
        );
        Ok(row)
    }
}
