//! Decimal odds to de-margined probabilities and derived market ratios.
//!
//! The batch assembler and the inference builder both go through
//! [`OddsFeatures::derive`], so the odds block is computed by one code path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::FavFlagEncoding;
use crate::error::{FeatureError, Result};
use crate::features::FeatureRow;
use crate::records::OddsRecord;

pub const ODDS_COLUMNS: [&str; 18] = [
    "home_odds",
    "draw_odds",
    "away_odds",
    "implied_prob_home",
    "implied_prob_draw",
    "implied_prob_away",
    "bookie_margin",
    "implied_prob_home_norm",
    "implied_prob_draw_norm",
    "implied_prob_away_norm",
    "odds_ratio",
    "log_home",
    "log_away",
    "prob_diff",
    "favorite_odds",
    "underdog_odds",
    "market_confidence",
    "fav_flag",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsTriple {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl OddsTriple {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self { home, draw, away }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("home_odds", self.home),
            ("draw_odds", self.draw),
            ("away_odds", self.away),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FeatureError::validation(
                    field,
                    format!("odds must be positive and finite, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Which side the market prices shorter. Equal home and away prices are `Draw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Favorite {
    Home,
    Draw,
    Away,
}

impl Favorite {
    pub fn from_odds(odds: &OddsTriple) -> Self {
        if odds.home < odds.away {
            Favorite::Home
        } else if odds.away < odds.home {
            Favorite::Away
        } else {
            Favorite::Draw
        }
    }

    pub fn encode(self, encoding: FavFlagEncoding) -> f64 {
        match (encoding, self) {
            (FavFlagEncoding::Binary, Favorite::Home) => 1.0,
            (FavFlagEncoding::Binary, _) => 0.0,
            (FavFlagEncoding::Signed, Favorite::Home) => 1.0,
            (FavFlagEncoding::Signed, Favorite::Draw) => 0.0,
            (FavFlagEncoding::Signed, Favorite::Away) => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OddsFeatures {
    pub odds: OddsTriple,
    pub implied_prob_home: f64,
    pub implied_prob_draw: f64,
    pub implied_prob_away: f64,
    pub bookie_margin: f64,
    pub implied_prob_home_norm: f64,
    pub implied_prob_draw_norm: f64,
    pub implied_prob_away_norm: f64,
    pub odds_ratio: f64,
    pub log_home: f64,
    pub log_away: f64,
    pub prob_diff: f64,
    pub favorite_odds: f64,
    pub underdog_odds: f64,
    pub market_confidence: f64,
    pub favorite: Favorite,
}

impl OddsFeatures {
    pub fn derive(odds: OddsTriple) -> Result<Self> {
        odds.validate()?;

        let implied_prob_home = 1.0 / odds.home;
        let implied_prob_draw = 1.0 / odds.draw;
        let implied_prob_away = 1.0 / odds.away;
        let total_book = implied_prob_home + implied_prob_draw + implied_prob_away;
        let favorite_odds = odds.home.min(odds.away);

        Ok(Self {
            odds,
            implied_prob_home,
            implied_prob_draw,
            implied_prob_away,
            bookie_margin: total_book - 1.0,
            implied_prob_home_norm: implied_prob_home / total_book,
            implied_prob_draw_norm: implied_prob_draw / total_book,
            implied_prob_away_norm: implied_prob_away / total_book,
            odds_ratio: odds.home / odds.away,
            log_home: odds.home.ln(),
            log_away: odds.away.ln(),
            prob_diff: implied_prob_home - implied_prob_away,
            favorite_odds,
            underdog_odds: odds.home.max(odds.away),
            market_confidence: 1.0 / favorite_odds,
            favorite: Favorite::from_odds(&odds),
        })
    }

    /// Values in [`ODDS_COLUMNS`] order.
    pub fn values(&self, encoding: FavFlagEncoding) -> [f64; 18] {
        [
            self.odds.home,
            self.odds.draw,
            self.odds.away,
            self.implied_prob_home,
            self.implied_prob_draw,
            self.implied_prob_away,
            self.bookie_margin,
            self.implied_prob_home_norm,
            self.implied_prob_draw_norm,
            self.implied_prob_away_norm,
            self.odds_ratio,
            self.log_home,
            self.log_away,
            self.prob_diff,
            self.favorite_odds,
            self.underdog_odds,
            self.market_confidence,
            self.favorite.encode(encoding),
        ]
    }

    pub fn append_to(&self, row: &mut FeatureRow, encoding: FavFlagEncoding) {
        for (name, value) in ODDS_COLUMNS.iter().zip(self.values(encoding)) {
            row.insert(name, value);
        }
    }
}

/// Provider-averaged prices for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    pub match_id: String,
    pub odds: OddsTriple,
    pub providers: usize,
}

/// Collapses every provider's prices into one mean row per match, ordered by match id.
pub fn aggregate_odds(records: &[OddsRecord]) -> Result<Vec<MatchOdds>> {
    let mut grouped: BTreeMap<&str, (OddsTriple, usize)> = BTreeMap::new();
    for rec in records {
        let triple = OddsTriple::new(rec.h, rec.d, rec.a);
        triple.validate().map_err(|err| match err {
            FeatureError::Validation { field, message } => FeatureError::validation(
                field,
                format!(
                    "{message} (match {}, provider {:?})",
                    rec.match_id, rec.provider
                ),
            ),
            other => other,
        })?;
        let (mean, n) = grouped
            .entry(rec.match_id.as_str())
            .or_insert((OddsTriple::new(0.0, 0.0, 0.0), 0));
        // Running mean: stays between the inputs, so finite prices never sum to inf.
        *n += 1;
        let n_f = *n as f64;
        mean.home += (triple.home - mean.home) / n_f;
        mean.draw += (triple.draw - mean.draw) / n_f;
        mean.away += (triple.away - mean.away) / n_f;
    }

    Ok(grouped
        .into_iter()
        .map(|(match_id, (odds, providers))| MatchOdds {
            match_id: match_id.to_string(),
            odds,
            providers,
        })
        .collect())
}
