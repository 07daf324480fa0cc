//! Column list a model was trained on, and the reindexing that enforces it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assembler::FeatureTable;
use crate::error::{FeatureError, Result};
use crate::features::FeatureRow;

/// Ordered, duplicate-free column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchemaContract {
    columns: Vec<String>,
}

impl FeatureSchemaContract {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Result<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(FeatureError::validation(
                    "columns",
                    format!("column {name} appears more than once in the schema"),
                ));
            }
        }
        Ok(Self { columns })
    }

    /// Captures the feature columns of a freshly assembled training table.
    pub fn from_table(table: &FeatureTable) -> Self {
        // Table columns are unique by construction.
        Self {
            columns: table.columns().to_vec(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.columns)?)
    }

    /// Reads the JSON array of column names written by [`Self::to_json`].
    pub fn from_json(raw: &str) -> Result<Self> {
        let columns: Vec<String> = serde_json::from_str(raw)?;
        Self::new(columns)
    }

    /// Reindexes `row` to the recorded columns: extras dropped, missing set to 0.
    ///
    /// An empty contract means the column list was lost; the row is passed through
    /// untouched and a warning is logged.
    pub fn align(&self, row: &FeatureRow) -> FeatureRow {
        if self.columns.is_empty() {
            warn!(
                features = row.len(),
                "feature schema is empty, passing features through unaligned"
            );
            return row.clone();
        }

        let mut out = FeatureRow::with_capacity(self.columns.len());
        let mut missing = Vec::new();
        for name in &self.columns {
            let value = row.get(name).unwrap_or_else(|| {
                missing.push(name.as_str());
                0.0
            });
            out.insert(name, value);
        }
        if !missing.is_empty() {
            debug!(?missing, "zero-filled columns absent from features");
        }
        let dropped = row
            .names()
            .iter()
            .filter(|name| !self.columns.contains(*name))
            .count();
        if dropped > 0 {
            debug!(dropped, "dropped columns unknown to the schema");
        }
        out
    }

    /// Dense values in schema order, ready for a classifier. Always one value per
    /// schema column.
    pub fn to_values(&self, row: &FeatureRow) -> Vec<f64> {
        self.align(row).into_values()
    }

    pub fn align_table(&self, table: &FeatureTable) -> FeatureTable {
        if self.columns.is_empty() {
            warn!(
                columns = table.columns().len(),
                "feature schema is empty, passing table through unaligned"
            );
            return table.clone();
        }

        let index: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|name| table.columns().iter().position(|c| c == name))
            .collect();
        let missing: Vec<&str> = self
            .columns
            .iter()
            .zip(&index)
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.as_str())
            .collect();
        if !missing.is_empty() {
            debug!(?missing, "zero-filled table columns absent from features");
        }

        let rows: Vec<Vec<f64>> = table
            .rows()
            .iter()
            .map(|row| {
                index
                    .iter()
                    .map(|idx| idx.map_or(0.0, |i| row[i]))
                    .collect()
            })
            .collect();
        FeatureTable::from_parts(
            self.columns.clone(),
            table.match_ids().to_vec(),
            table.labels().to_vec(),
            rows,
        )
    }
}

impl TryFrom<Vec<String>> for FeatureSchemaContract {
    type Error = FeatureError;

    fn try_from(columns: Vec<String>) -> Result<Self> {
        Self::new(columns)
    }
}

impl From<FeatureSchemaContract> for Vec<String> {
    fn from(contract: FeatureSchemaContract) -> Self {
        contract.columns
    }
}
