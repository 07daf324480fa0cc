//! Loaded classifiers keyed by name, each paired with the schema it was trained on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use tracing::info;

use crate::error::{FeatureError, Result};
use crate::features::FeatureRow;
use crate::outcome::Prob3;
use crate::schema::FeatureSchemaContract;

pub trait Classifier: Send + Sync {
    /// Class probabilities for a dense vector in the model's schema order.
    fn predict_proba(&self, features: &[f64]) -> Result<Prob3>;
}

pub struct LoadedModel<M> {
    name: String,
    model: M,
    schema: FeatureSchemaContract,
}

impl<M: Classifier> LoadedModel<M> {
    pub fn new(name: impl Into<String>, model: M, schema: FeatureSchemaContract) -> Self {
        Self {
            name: name.into(),
            model,
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn schema(&self) -> &FeatureSchemaContract {
        &self.schema
    }

    /// Aligns `row` to this model's schema, then scores it.
    pub fn predict(&self, row: &FeatureRow) -> Result<Prob3> {
        let values = self.schema.to_values(row);
        self.model.predict_proba(&values)
    }
}

type Slot<M> = Arc<OnceCell<Arc<LoadedModel<M>>>>;

/// Name to model map with load-once semantics: concurrent callers asking for the
/// same name wait on a single load. Failed loads leave the slot empty.
pub struct ModelCache<M> {
    slots: Mutex<HashMap<String, Slot<M>>>,
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<M: Classifier> ModelCache<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<E>(
        &self,
        name: &str,
        load: impl FnOnce() -> std::result::Result<LoadedModel<M>, E>,
    ) -> std::result::Result<Arc<LoadedModel<M>>, E> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(name.to_string()).or_default())
        };
        slot.get_or_try_init(|| {
            let model = load()?;
            info!(model = %name, columns = model.schema().columns().len(), "loaded model");
            Ok(Arc::new(model))
        })
        .cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<LoadedModel<M>>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(name).and_then(|slot| slot.get().cloned())
    }

    /// Drops a model so the next `get_or_load` reloads it. In-flight holders keep
    /// their `Arc`.
    pub fn evict(&self, name: &str) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(name).is_some()
    }

    pub fn loaded_names(&self) -> Vec<String> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Predicts the de-margined market probabilities carried in the feature vector.
#[derive(Debug, Clone, Copy)]
pub struct MarketBaseline {
    home_idx: usize,
    draw_idx: usize,
    away_idx: usize,
}

impl MarketBaseline {
    pub fn for_schema(schema: &FeatureSchemaContract) -> Result<Self> {
        let find = |name: &str| {
            schema
                .columns()
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| {
                    FeatureError::validation(
                        "schema",
                        format!("market baseline needs column {name}"),
                    )
                })
        };
        Ok(Self {
            home_idx: find("implied_prob_home_norm")?,
            draw_idx: find("implied_prob_draw_norm")?,
            away_idx: find("implied_prob_away_norm")?,
        })
    }
}

impl Classifier for MarketBaseline {
    fn predict_proba(&self, features: &[f64]) -> Result<Prob3> {
        let get = |idx: usize| {
            features.get(idx).copied().ok_or_else(|| {
                FeatureError::validation(
                    "features",
                    format!("expected at least {} values, got {}", idx + 1, features.len()),
                )
            })
        };
        Ok(Prob3 {
            home: get(self.home_idx)?,
            draw: get(self.draw_idx)?,
            away: get(self.away_idx)?,
        }
        .normalized())
    }
}
