use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{FeatureConfig, FillNaStrategy, H2hMode};
use crate::error::{FeatureError, Result};
use crate::features::{FeatureRow, TEAM_COLUMNS};
use crate::form::{H2hCounts, compute_match_form, head_to_head};
use crate::odds::{MatchOdds, ODDS_COLUMNS, OddsFeatures, aggregate_odds};
use crate::records::{MatchRecord, OddsRecord};

pub const BASIC_COLUMNS: [&str; 5] = [
    "total_goals",
    "goal_difference",
    "both_teams_scored",
    "high_scoring",
    "low_scoring",
];

pub const H2H_COLUMNS: [&str; 4] = [
    "h2h_home_wins",
    "h2h_draws",
    "h2h_away_wins",
    "h2h_total_matches",
];

/// Column order of the training table.
pub fn batch_columns() -> Vec<String> {
    BASIC_COLUMNS
        .iter()
        .chain(TEAM_COLUMNS.iter())
        .chain(ODDS_COLUMNS.iter())
        .chain(H2H_COLUMNS.iter())
        .map(|s| s.to_string())
        .collect()
}

/// Raw matches plus every provider's odds, as handed over by ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchBatch {
    pub matches: Vec<MatchRecord>,
    #[serde(default)]
    pub odds: Vec<OddsRecord>,
}

/// One feature row per match plus the label vector. Rows follow input match order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<String>,
    match_ids: Vec<String>,
    labels: Vec<Option<u8>>,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    pub(crate) fn from_parts(
        columns: Vec<String>,
        match_ids: Vec<String>,
        labels: Vec<Option<u8>>,
        rows: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            columns,
            match_ids,
            labels,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn match_ids(&self) -> &[String] {
        &self.match_ids
    }

    /// Training targets (H=0, D=1, A=2); `None` for unplayed matches.
    pub fn labels(&self) -> &[Option<u8>] {
        &self.labels
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<FeatureRow> {
        let values = self.rows.get(idx)?;
        Some(
            self.columns
                .iter()
                .zip(values.iter().copied())
                .collect(),
        )
    }

    pub fn row_for_match(&self, match_id: &str) -> Option<FeatureRow> {
        let idx = self.match_ids.iter().position(|id| id == match_id)?;
        self.row(idx)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }
}

pub struct MatchFeatureAssembler {
    cfg: FeatureConfig,
}

impl MatchFeatureAssembler {
    pub fn new(cfg: FeatureConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    pub fn assemble_batch(&self, batch: &MatchBatch) -> Result<FeatureTable> {
        let odds = aggregate_odds(&batch.odds)?;
        self.assemble(&batch.matches, &odds)
    }

    /// Builds the training table from matches and provider-aggregated odds.
    pub fn assemble(&self, matches: &[MatchRecord], odds: &[MatchOdds]) -> Result<FeatureTable> {
        let cfg = &self.cfg;

        let mut seen = HashSet::with_capacity(matches.len());
        for m in matches {
            m.validate()?;
            if !seen.insert(m.id.as_str()) {
                return Err(FeatureError::validation(
                    "id",
                    format!("match {} appears more than once", m.id),
                ));
            }
        }

        let mut odds_by_match: HashMap<&str, &MatchOdds> = HashMap::with_capacity(odds.len());
        for row in odds {
            if !seen.contains(row.match_id.as_str()) {
                debug!(match_id = %row.match_id, "odds for a match outside this batch, skipping");
                continue;
            }
            if odds_by_match.insert(row.match_id.as_str(), row).is_some() {
                return Err(FeatureError::validation(
                    "match_id",
                    format!(
                        "match {} has more than one odds row; aggregate providers first",
                        row.match_id
                    ),
                ));
            }
        }

        let form = compute_match_form(matches, cfg)?;
        let h2h = match cfg.h2h_mode {
            H2hMode::Placeholder => vec![H2hCounts::default(); matches.len()],
            H2hMode::History => head_to_head(matches, cfg)?,
        };

        let columns = batch_columns();
        let mut cells: Vec<Vec<Option<f64>>> = Vec::with_capacity(matches.len());
        let mut labels = Vec::with_capacity(matches.len());

        for (idx, m) in matches.iter().enumerate() {
            let mut row: Vec<Option<f64>> = Vec::with_capacity(columns.len());

            row.extend(basic_cells(m, cfg));

            let Some(home) = form[idx].home else {
                return Err(FeatureError::missing_column("home_form", &m.id));
            };
            let Some(away) = form[idx].away else {
                return Err(FeatureError::missing_column("away_form", &m.id));
            };
            let (home_form, home_for, home_against) = home.or_defaults(cfg);
            let (away_form, away_for, away_against) = away.or_defaults(cfg);
            row.extend(
                [home_form, away_form, home_for, home_against, away_for, away_against].map(Some),
            );

            match odds_by_match.get(m.id.as_str()) {
                Some(odds) => {
                    let derived = OddsFeatures::derive(odds.odds).map_err(|err| match err {
                        FeatureError::Validation { field, message } => {
                            FeatureError::validation(field, format!("{message} (match {})", m.id))
                        }
                        other => other,
                    })?;
                    row.extend(derived.values(cfg.fav_flag_encoding).map(Some));
                }
                None => row.extend([None; ODDS_COLUMNS.len()]),
            }

            let c = h2h[idx];
            row.extend([c.home_wins, c.draws, c.away_wins, c.total].map(|v| Some(f64::from(v))));

            debug_assert_eq!(row.len(), columns.len());
            labels.push(m.outcome()?.map(|o| o.target()));
            cells.push(row);
        }

        let rows = fill_missing(&columns, cells, cfg.fill_na_strategy);
        info!(
            matches = rows.len(),
            columns = columns.len(),
            with_odds = odds_by_match.len(),
            "assembled feature table"
        );

        Ok(FeatureTable::from_parts(
            columns,
            matches.iter().map(|m| m.id.clone()).collect(),
            labels,
            rows,
        ))
    }
}

/// Assembles independent batches in parallel. Each shard is computed exactly as a
/// standalone call, so rolling state never crosses shard boundaries.
pub fn assemble_shards(shards: &[MatchBatch], cfg: &FeatureConfig) -> Result<Vec<FeatureTable>> {
    let assembler = MatchFeatureAssembler::new(cfg.clone())?;
    shards
        .par_iter()
        .map(|batch| assembler.assemble_batch(batch))
        .collect()
}

fn basic_cells(m: &MatchRecord, cfg: &FeatureConfig) -> [Option<f64>; 5] {
    let (Some(hg), Some(ag)) = (m.home_goals, m.away_goals) else {
        return [None; 5];
    };
    let total = f64::from(hg) + f64::from(ag);
    [
        Some(total),
        Some(f64::from(hg) - f64::from(ag)),
        Some(flag(hg > 0 && ag > 0)),
        Some(flag(total > cfg.high_scoring_threshold)),
        Some(flag(total < cfg.low_scoring_threshold)),
    ]
}

fn flag(v: bool) -> f64 {
    if v { 1.0 } else { 0.0 }
}

fn fill_missing(
    columns: &[String],
    cells: Vec<Vec<Option<f64>>>,
    strategy: FillNaStrategy,
) -> Vec<Vec<f64>> {
    let width = columns.len();
    let mut fills = vec![0.0; width];
    if strategy == FillNaStrategy::Mean {
        for (col, fill) in fills.iter_mut().enumerate() {
            let mut sum = 0.0;
            let mut n = 0usize;
            for v in cells.iter().filter_map(|row| row[col]) {
                sum += v;
                n += 1;
            }
            if n > 0 {
                *fill = sum / n as f64;
            }
        }
    }

    let mut missing = vec![0usize; width];
    let rows: Vec<Vec<f64>> = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .map(|(col, v)| {
                    v.unwrap_or_else(|| {
                        missing[col] += 1;
                        fills[col]
                    })
                })
                .collect()
        })
        .collect();

    for (col, count) in missing.iter().enumerate() {
        if *count > 0 {
            debug!(
                column = %columns[col],
                filled = *count,
                value = fills[col],
                "filled missing cells"
            );
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_columns_are_unique() {
        let cols = batch_columns();
        let unique: HashSet<&String> = cols.iter().collect();
        assert_eq!(unique.len(), cols.len());
        assert_eq!(cols.len(), 5 + 6 + 18 + 4);
        assert!(!cols.iter().any(|c| c == "target" || c == "id" || c == "date"));
    }

    #[test]
    fn mean_fill_uses_column_mean_or_zero() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let cells = vec![
            vec![Some(1.0), None],
            vec![None, None],
            vec![Some(3.0), None],
        ];
        let rows = fill_missing(&columns, cells, FillNaStrategy::Mean);
        assert_eq!(rows, vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]]);
    }

    #[test]
    fn huge_scores_do_not_overflow() {
        let m = MatchRecord {
            id: "m1".to_string(),
            date: chrono::Utc::now(),
            home: "ARS".to_string(),
            away: "TOT".to_string(),
            home_goals: Some(u32::MAX),
            away_goals: Some(1),
            result: None,
        };
        let cells = basic_cells(&m, &FeatureConfig::default());
        assert_eq!(cells[0], Some(f64::from(u32::MAX) + 1.0));
        assert_eq!(cells[1], Some(f64::from(u32::MAX) - 1.0));
        assert_eq!(cells[3], Some(1.0));

        let table = MatchFeatureAssembler::new(FeatureConfig::default())
            .unwrap()
            .assemble(&[m], &[])
            .unwrap();
        assert_eq!(table.labels(), &[Some(0)]);
    }

    #[test]
    fn zero_fill_ignores_mean() {
        let columns = vec!["a".to_string()];
        let rows = fill_missing(
            &columns,
            vec![vec![Some(4.0)], vec![None]],
            FillNaStrategy::Zero,
        );
        assert_eq!(rows, vec![vec![4.0], vec![0.0]]);
    }
}
