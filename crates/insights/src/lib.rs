//! Purchase-driver insights — random forest feature importance over the
//! survey answers of a campaign's users.

pub mod engine;
pub mod forest;
pub mod importance;

pub use engine::InsightEngine;
pub use forest::{ForestParams, RandomForest};
pub use importance::{FeatureSet, ImportanceAnalyzer, ImportanceOutcome, ImportanceReport};
