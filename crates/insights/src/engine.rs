//! Insight engine — memoises importance analyses per campaign and feature set.

use crate::importance::{FeatureSet, ImportanceAnalyzer, ImportanceOutcome};
use campaign_core::config::ForestConfig;
use campaign_core::{CampaignResult, Dataset};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

pub struct InsightEngine {
    dataset: Arc<Dataset>,
    analyzer: ImportanceAnalyzer,
    cache: DashMap<(i64, FeatureSet), ImportanceOutcome>,
}

impl InsightEngine {
    pub fn new(dataset: Arc<Dataset>, config: &ForestConfig) -> Self {
        Self {
            dataset,
            analyzer: ImportanceAnalyzer::new(config),
            cache: DashMap::new(),
        }
    }

    pub fn importance(
        &self,
        campaign_number: i64,
        feature_set: FeatureSet,
    ) -> CampaignResult<ImportanceOutcome> {
        let key = (campaign_number, feature_set);
        if let Some(cached) = self.cache.get(&key) {
            debug!(campaign = campaign_number, feature_set = feature_set.title(), "Importance cache hit");
            return Ok(cached.clone());
        }

        let outcome = self
            .analyzer
            .analyze(&self.dataset, campaign_number, feature_set)?;
        self.cache.insert(key, outcome.clone());
        Ok(outcome)
    }

    /// Both feature sets for one campaign.
    pub fn campaign_insights(
        &self,
        campaign_number: i64,
    ) -> CampaignResult<(ImportanceOutcome, ImportanceOutcome)> {
        Ok((
            self.importance(campaign_number, FeatureSet::GeneralFeatures)?,
            self.importance(campaign_number, FeatureSet::SpecificAnswers)?,
        ))
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}
