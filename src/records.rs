use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};
use crate::outcome::{Outcome, classify_outcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub home: String,
    pub away: String,
    #[serde(default)]
    pub home_goals: Option<u32>,
    #[serde(default)]
    pub away_goals: Option<u32>,
    #[serde(default)]
    pub result: Option<Outcome>,
}

impl MatchRecord {
    pub fn is_played(&self) -> bool {
        self.home_goals.is_some() && self.away_goals.is_some()
    }

    /// Result of the match, derived from the score when not given explicitly.
    pub fn outcome(&self) -> Result<Option<Outcome>> {
        let from_goals = match (self.home_goals, self.away_goals) {
            (Some(h), Some(a)) => Some(classify_outcome(h, a)),
            _ => None,
        };
        match (self.result, from_goals) {
            (Some(given), Some(derived)) if given != derived => Err(FeatureError::validation(
                "result",
                format!(
                    "match {} has result {given} but score {}-{}",
                    self.id,
                    self.home_goals.unwrap_or_default(),
                    self.away_goals.unwrap_or_default()
                ),
            )),
            (Some(given), _) => Ok(Some(given)),
            (None, derived) => Ok(derived),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(FeatureError::validation("id", "match id must not be empty"));
        }
        if self.home.trim().is_empty() {
            return Err(FeatureError::missing_column("home", &self.id));
        }
        if self.away.trim().is_empty() {
            return Err(FeatureError::missing_column("away", &self.id));
        }
        if self.home == self.away {
            return Err(FeatureError::validation(
                "away",
                format!("match {} has {} on both sides", self.id, self.home),
            ));
        }
        self.outcome()?;
        Ok(())
    }
}

/// One bookmaker's 1X2 prices for a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsRecord {
    pub match_id: String,
    #[serde(alias = "home_odds")]
    pub h: f64,
    #[serde(alias = "draw_odds")]
    pub d: f64,
    #[serde(alias = "away_odds")]
    pub a: f64,
    #[serde(default)]
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(
        home_goals: Option<u32>,
        away_goals: Option<u32>,
        result: Option<Outcome>,
    ) -> MatchRecord {
        MatchRecord {
            id: "m1".to_string(),
            date: Utc.with_ymd_and_hms(2024, 8, 17, 15, 0, 0).unwrap(),
            home: "ARS".to_string(),
            away: "WOL".to_string(),
            home_goals,
            away_goals,
            result,
        }
    }

    #[test]
    fn outcome_is_derived_from_score() {
        assert_eq!(record(Some(2), Some(0), None).outcome().unwrap(), Some(Outcome::Home));
        assert_eq!(record(None, None, None).outcome().unwrap(), None);
    }

    #[test]
    fn contradicting_result_is_rejected() {
        let err = record(Some(2), Some(0), Some(Outcome::Away)).outcome().unwrap_err();
        assert!(err.to_string().contains("m1"));
    }

    #[test]
    fn empty_team_is_a_missing_column() {
        let mut m = record(Some(1), Some(1), None);
        m.away = "  ".to_string();
        let err = m.validate().unwrap_err();
        assert!(matches!(err, FeatureError::MissingColumn { ref column, .. } if column == "away"));
    }

    #[test]
    fn odds_record_accepts_long_field_names() {
        let raw = r#"{"match_id":"m1","home_odds":2.1,"draw_odds":3.4,"away_odds":3.6}"#;
        let odds: OddsRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(odds.h, 2.1);
        assert_eq!(odds.a, 3.6);
        assert!(odds.provider.is_empty());
    }

    #[test]
    fn match_record_parses_rfc3339_dates() {
        let raw = r#"{
            "id": "m9",
            "date": "2024-08-17T15:00:00Z",
            "home": "ARS",
            "away": "WOL",
            "home_goals": 2,
            "away_goals": 0,
            "result": "H"
        }"#;
        let m: MatchRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(m.result, Some(Outcome::Home));
        assert!(m.is_played());
    }
}
