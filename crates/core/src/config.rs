use serde::Deserialize;
use std::path::Path;

/// Root application configuration. Loaded from an optional config file and
/// environment variables with the prefix `MARKETING_INSIGHTS__`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub bayes: BayesConfig,
    #[serde(default)]
    pub forest: ForestConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_path")]
    pub path: String,
    #[serde(default)]
    pub columns: ColumnConfig,
}

/// Column names of the exposure export.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnConfig {
    #[serde(default = "default_user_id_column")]
    pub user_id: String,
    #[serde(default = "default_campaign_column")]
    pub campaign: String,
    #[serde(default = "default_campaign_number_column")]
    pub campaign_number: String,
    #[serde(default = "default_purchase_column")]
    pub purchase: String,
    #[serde(default = "default_quiz_score_column")]
    pub quiz_score: String,
    #[serde(default = "default_transaction_start_column")]
    pub transaction_start: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BayesConfig {
    #[serde(default = "default_posterior_samples")]
    pub samples: usize,
    #[serde(default = "default_density_points")]
    pub density_points: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForestConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_forest_seed")]
    pub seed: u64,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default)]
    pub max_depth: Option<usize>,
    /// Analyses need strictly more training rows than this.
    #[serde(default = "default_min_records")]
    pub min_records: usize,
    #[serde(default = "default_top_answers")]
    pub top_answers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

// Default functions
fn default_data_path() -> String {
    "my_data.csv".to_string()
}
fn default_user_id_column() -> String {
    "ruserid".to_string()
}
fn default_campaign_column() -> String {
    "campaign".to_string()
}
fn default_campaign_number_column() -> String {
    "Campaign number".to_string()
}
fn default_purchase_column() -> String {
    "purcheas_ind".to_string()
}
fn default_quiz_score_column() -> String {
    "safety_level_quiz_score".to_string()
}
fn default_transaction_start_column() -> String {
    "transaction_start".to_string()
}
fn default_posterior_samples() -> usize {
    5000
}
fn default_density_points() -> usize {
    1000
}
fn default_n_estimators() -> usize {
    100
}
fn default_forest_seed() -> u64 {
    42
}
fn default_min_samples_split() -> usize {
    2
}
fn default_min_records() -> usize {
    30
}
fn default_top_answers() -> usize {
    10
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            columns: ColumnConfig::default(),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id_column(),
            campaign: default_campaign_column(),
            campaign_number: default_campaign_number_column(),
            purchase: default_purchase_column(),
            quiz_score: default_quiz_score_column(),
            transaction_start: default_transaction_start_column(),
        }
    }
}

impl Default for BayesConfig {
    fn default() -> Self {
        Self {
            samples: default_posterior_samples(),
            density_points: default_density_points(),
            seed: None,
        }
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            seed: default_forest_seed(),
            min_samples_split: default_min_samples_split(),
            max_depth: None,
            min_records: default_min_records(),
            top_answers: default_top_answers(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional config file, then environment
    /// variables (`MARKETING_INSIGHTS__BAYES__SAMPLES=20000`).
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("MARKETING_INSIGHTS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }

    /// Reject settings the analyses cannot run with.
    pub fn validate(&self) -> Result<(), crate::CampaignError> {
        if self.bayes.samples == 0 {
            return Err(crate::CampaignError::Config(
                "bayes.samples must be positive".to_string(),
            ));
        }
        if self.forest.n_estimators == 0 {
            return Err(crate::CampaignError::Config(
                "forest.n_estimators must be positive".to_string(),
            ));
        }
        if self.forest.min_samples_split < 2 {
            return Err(crate::CampaignError::Config(
                "forest.min_samples_split must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dashboard_settings() {
        let config = AppConfig::default();
        assert_eq!(config.bayes.samples, 5000);
        assert_eq!(config.bayes.density_points, 1000);
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.forest.min_records, 30);
        assert_eq!(config.data.columns.purchase, "purcheas_ind");
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"forest": {"n_estimators": 10}, "output": {"format": "json"}}"#)
                .unwrap();
        assert_eq!(config.forest.n_estimators, 10);
        assert_eq!(config.forest.top_answers, 10);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.data.columns.user_id, "ruserid");
    }

    #[test]
    fn test_validate_rejects_zero_samples() {
        let mut config = AppConfig::default();
        config.bayes.samples = 0;
        assert!(config.validate().is_err());
    }
}
