//! Feature derivation for 1X2 football match prediction.
//!
//! The training table ([`assembler`]) and the live request vector ([`inference`])
//! share one odds projection and one rolling engine, and both are reindexed through a
//! [`schema::FeatureSchemaContract`] before reaching a model.

pub mod assembler;
pub mod config;
pub mod error;
pub mod features;
pub mod form;
pub mod inference;
pub mod model_cache;
pub mod odds;
pub mod outcome;
pub mod records;
pub mod rolling;
pub mod schema;

pub use assembler::{FeatureTable, MatchBatch, MatchFeatureAssembler, assemble_shards};
pub use config::FeatureConfig;
pub use error::{FeatureError, Result};
pub use features::{FeatureRow, TeamStats, TeamStatsInput};
pub use inference::{InferenceFeatureBuilder, InferenceRequest};
pub use odds::{Favorite, MatchOdds, OddsFeatures, OddsTriple};
pub use outcome::{Outcome, Prob3};
pub use records::{MatchRecord, OddsRecord};
pub use rolling::{Closed, RollingStat, RollingWindow};
pub use schema::FeatureSchemaContract;
