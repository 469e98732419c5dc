//! Feature importance analysis — which survey answers drive purchases.
//!
//! Two feature sets are supported: the general per-question features and
//! the one-hot columns of the specific answers.

use crate::forest::{ForestParams, RandomForest};
use campaign_core::config::ForestConfig;
use campaign_core::{CampaignError, CampaignRef, CampaignResult, Dataset};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// General features and their display names.
pub const GENERAL_FEATURES: &[(&str, &str)] = &[
    ("use_the_internet_for_answered", "Internet Usage"),
    ("do_on_social_media_answered", "Social Media Activity"),
    ("enter_personal_details_online_answered", "Personal Details Sharing"),
    ("keep_your_passwords_answered", "Password Management"),
    ("victim_of_online_scam_answered", "Past Scam Victim"),
    ("nline_accounts_hacked_answered", "Account Hacking History"),
    ("safety_level_quiz_score", "Safety Quiz Score"),
    ("breach_found", "Security Breach"),
];

/// Answer column prefixes and the survey question they belong to.
pub const QUESTION_PREFIXES: &[(&str, &str)] = &[
    ("use_the_internet_for_", "What do you use the internet for?"),
    ("do_on_social_media_", "What do you do on social media?"),
    ("enter_personal_details_online_", "Do you enter personal details online?"),
    ("keep_your_passwords_", "How do you keep your passwords?"),
    ("victim_of_online_scam_", "Victim of online scam?"),
    ("nline_accounts_hacked_", "Account hacked before?"),
];

pub const ANSWER_LABELS: &[(&str, &str)] = &[
    ("use_the_internet_for_1", "Social media"),
    ("use_the_internet_for_2", "Banking & Finance"),
    ("use_the_internet_for_3", "Online shopping"),
    ("use_the_internet_for_4", "Gaming"),
    ("use_the_internet_for_5", "Streaming"),
    ("use_the_internet_for_6", "Research & Education"),
    ("do_on_social_media_1", "News/Events"),
    ("do_on_social_media_2", "Post Photos"),
    ("do_on_social_media_3", "Entertainment"),
    ("do_on_social_media_4", "Brand Research"),
    ("enter_personal_details_online_1", "Credit Card"),
    ("enter_personal_details_online_2", "Phone Number"),
    ("enter_personal_details_online_3", "Passport"),
    ("enter_personal_details_online_4", "Date of Birth"),
    ("enter_personal_details_online_5", "Address"),
    ("enter_personal_details_online_6", "SSN"),
    ("keep_your_passwords_1", "Notepad"),
    ("keep_your_passwords_2", "Computer"),
    ("keep_your_passwords_3", "Password Manager"),
    ("keep_your_passwords_4", "Remember Mentally"),
    ("victim_of_online_scam_1", "No"),
    ("victim_of_online_scam_2", "Yes"),
    ("nline_accounts_hacked_1", "No"),
    ("nline_accounts_hacked_2", "Yes"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    GeneralFeatures,
    SpecificAnswers,
}

impl FeatureSet {
    pub fn title(&self) -> &'static str {
        match self {
            FeatureSet::GeneralFeatures => "General Features",
            FeatureSet::SpecificAnswers => "Specific Answers",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub column: String,
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceReport {
    pub campaign: CampaignRef,
    pub feature_set: FeatureSet,
    pub records: usize,
    /// Most important first.
    pub features: Vec<FeatureImportance>,
    pub top: Option<FeatureImportance>,
    pub generated_at: DateTime<Utc>,
}

impl ImportanceReport {
    pub fn headline(&self) -> Option<String> {
        let top = self.top.as_ref()?;
        Some(match (self.feature_set, &top.question) {
            (FeatureSet::SpecificAnswers, Some(question)) => format!(
                "Most influential answer: {} (\"{}\")",
                top.display, question
            ),
            _ => format!("{} is the strongest indicator for purchase.", top.display),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportanceOutcome {
    Ranked(ImportanceReport),
    InsufficientData {
        campaign: CampaignRef,
        feature_set: FeatureSet,
        records: usize,
        /// Analyses need more rows than this.
        required: usize,
    },
}

pub struct ImportanceAnalyzer {
    params: ForestParams,
    min_records: usize,
    top_answers: usize,
}

impl ImportanceAnalyzer {
    pub fn new(config: &ForestConfig) -> Self {
        Self {
            params: ForestParams::from(config),
            min_records: config.min_records,
            top_answers: config.top_answers,
        }
    }

    pub fn analyze(
        &self,
        dataset: &Dataset,
        campaign_number: i64,
        feature_set: FeatureSet,
    ) -> CampaignResult<ImportanceOutcome> {
        let (campaign, rows) = dataset.campaign_records(campaign_number)?;
        let columns = select_columns(dataset, feature_set)?;

        // Complete cases only: every selected feature and the label present.
        let complete: Vec<(Vec<f64>, f64)> = if columns.is_empty() {
            Vec::new()
        } else {
            rows.iter()
                .filter_map(|record| {
                    let label = record.purchase?;
                    let values = columns
                        .iter()
                        .map(|&c| dataset.feature_value(record, c))
                        .collect::<Option<Vec<f64>>>()?;
                    Some((values, label))
                })
                .collect()
        };

        if complete.len() <= self.min_records {
            debug!(
                campaign = campaign_number,
                feature_set = feature_set.title(),
                records = complete.len(),
                "Not enough records for importance analysis"
            );
            return Ok(ImportanceOutcome::InsufficientData {
                campaign,
                feature_set,
                records: complete.len(),
                required: self.min_records,
            });
        }

        let mut classes: Vec<f64> = complete.iter().map(|(_, label)| *label).collect();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        let labels: Vec<usize> = complete
            .iter()
            .map(|(_, label)| classes.partition_point(|c| c < label))
            .collect();

        let n = complete.len();
        let data: Vec<f64> = complete.into_iter().flat_map(|(values, _)| values).collect();
        let x = Array2::from_shape_vec((n, columns.len()), data)
            .map_err(|e| CampaignError::Data(format!("feature matrix: {e}")))?;

        let forest = RandomForest::fit(x.view(), &labels, &self.params)?;

        let mut features: Vec<FeatureImportance> = columns
            .iter()
            .zip(forest.feature_importances())
            .map(|(&c, &importance)| describe(&dataset.feature_columns()[c], feature_set, importance))
            .collect();
        features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        if feature_set == FeatureSet::SpecificAnswers {
            features.truncate(self.top_answers);
        }
        let top = features.iter().find(|f| f.importance > 0.0).cloned();

        info!(
            campaign = campaign_number,
            feature_set = feature_set.title(),
            records = n,
            top = top.as_ref().map(|t| t.column.as_str()).unwrap_or("-"),
            "Feature importance computed"
        );

        Ok(ImportanceOutcome::Ranked(ImportanceReport {
            campaign,
            feature_set,
            records: n,
            features,
            top,
            generated_at: Utc::now(),
        }))
    }
}

/// Dataset column indices used by a feature set.
fn select_columns(dataset: &Dataset, feature_set: FeatureSet) -> CampaignResult<Vec<usize>> {
    match feature_set {
        FeatureSet::GeneralFeatures => GENERAL_FEATURES
            .iter()
            .map(|(name, _)| {
                dataset.column_index(name).ok_or_else(|| {
                    match dataset.non_numeric_cell(name) {
                        Some(cell) => cell.to_error(),
                        None => CampaignError::MissingColumn(name.to_string()),
                    }
                })
            })
            .collect(),
        FeatureSet::SpecificAnswers => {
            if let Some(cell) = dataset
                .non_numeric_columns()
                .iter()
                .find(|cell| is_answer_column(&cell.column))
            {
                return Err(cell.to_error());
            }
            Ok(dataset
                .feature_columns()
                .iter()
                .enumerate()
                .filter(|(_, name)| is_answer_column(name))
                .map(|(i, _)| i)
                .collect())
        }
    }
}

/// Answer columns share a question prefix. The `*_answered` columns match
/// the same prefixes but are general features, so they are left out here
/// and specific answers rank only the one-hot answer columns.
fn is_answer_column(name: &str) -> bool {
    QUESTION_PREFIXES.iter().any(|(p, _)| name.starts_with(p))
        && !GENERAL_FEATURES.iter().any(|(g, _)| *g == name)
}

fn describe(column: &str, feature_set: FeatureSet, importance: f64) -> FeatureImportance {
    let (display, question) = match feature_set {
        FeatureSet::GeneralFeatures => (lookup(GENERAL_FEATURES, column), None),
        FeatureSet::SpecificAnswers => (
            lookup(ANSWER_LABELS, column),
            QUESTION_PREFIXES
                .iter()
                .find(|(p, _)| column.starts_with(p))
                .map(|(_, q)| q.to_string()),
        ),
    };
    FeatureImportance {
        column: column.to_string(),
        display: display.unwrap_or(column).to_string(),
        question,
        importance,
    }
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::config::ColumnConfig;

    const HEADER: &str = "ruserid,campaign,Campaign number,purcheas_ind,\
use_the_internet_for_answered,do_on_social_media_answered,\
enter_personal_details_online_answered,keep_your_passwords_answered,\
victim_of_online_scam_answered,nline_accounts_hacked_answered,\
safety_level_quiz_score,breach_found,keep_your_passwords_3,keep_your_passwords_1";

    /// Purchases follow breach status; password-manager users are the breached ones.
    fn dataset(rows: usize) -> Dataset {
        Dataset::from_reader(export(rows).as_bytes(), &ColumnConfig::default()).unwrap()
    }

    fn export(rows: usize) -> String {
        let mut csv = format!("{HEADER}\n");
        for i in 0..rows {
            let breach = (i / 2) % 2;
            let purchase = breach;
            csv.push_str(&format!(
                "u{i},Spring,1,{purchase},1,{},1,1,0,{},{},{breach},{breach},{}\n",
                i % 3,
                (i / 3) % 2,
                i % 5,
                1 - breach
            ));
        }
        csv
    }

    fn analyzer() -> ImportanceAnalyzer {
        ImportanceAnalyzer::new(&ForestConfig {
            n_estimators: 25,
            ..ForestConfig::default()
        })
    }

    #[test]
    fn test_answer_columns_exclude_general_features() {
        assert!(is_answer_column("keep_your_passwords_3"));
        assert!(!is_answer_column("keep_your_passwords_answered"));
        assert!(!is_answer_column("breach_found"));
    }

    #[test]
    fn test_general_features_rank_breach() {
        let data = dataset(80);
        let outcome = analyzer()
            .analyze(&data, 1, FeatureSet::GeneralFeatures)
            .unwrap();
        let ImportanceOutcome::Ranked(report) = outcome else {
            panic!("expected a ranked report");
        };
        assert_eq!(report.records, 80);
        assert_eq!(report.features.len(), GENERAL_FEATURES.len());
        let total: f64 = report.features.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(report
            .features
            .windows(2)
            .all(|w| w[0].importance >= w[1].importance));
        assert_eq!(report.features[0].column, "breach_found");
        assert_eq!(report.features[0].display, "Security Breach");
        assert_eq!(
            report.headline().unwrap(),
            "Security Breach is the strongest indicator for purchase."
        );
    }

    #[test]
    fn test_specific_answers_carry_questions() {
        let data = dataset(80);
        let outcome = analyzer()
            .analyze(&data, 1, FeatureSet::SpecificAnswers)
            .unwrap();
        let ImportanceOutcome::Ranked(report) = outcome else {
            panic!("expected a ranked report");
        };
        assert_eq!(report.features.len(), 2);
        let top = report.top.unwrap();
        assert!(top.display == "Password Manager" || top.display == "Notepad");
        assert_eq!(top.question.as_deref(), Some("How do you keep your passwords?"));
    }

    #[test]
    fn test_thirty_rows_is_not_enough() {
        let data = dataset(30);
        let outcome = analyzer()
            .analyze(&data, 1, FeatureSet::GeneralFeatures)
            .unwrap();
        assert!(matches!(
            outcome,
            ImportanceOutcome::InsufficientData {
                records: 30,
                required: 30,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_general_column_is_error() {
        let csv = "ruserid,campaign,Campaign number,purcheas_ind\nu1,A,1,1\n";
        let data = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap();
        let err = analyzer()
            .analyze(&data, 1, FeatureSet::GeneralFeatures)
            .unwrap_err();
        assert!(matches!(err, CampaignError::MissingColumn(_)));
    }

    #[test]
    fn test_stray_text_in_general_feature_names_the_cell() {
        let mut csv = export(40);
        csv.push_str("u40,Spring,1,0,1,0,1,1,0,0,0,unknown,0,1\n");
        let data = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap();
        let err = analyzer()
            .analyze(&data, 1, FeatureSet::GeneralFeatures)
            .unwrap_err();
        assert!(matches!(err, CampaignError::Data(_)), "{err}");
        let message = err.to_string();
        assert!(message.contains("breach_found"));
        assert!(message.contains("row 42"));
    }

    #[test]
    fn test_stray_text_in_answer_column_is_error() {
        let mut csv = export(40);
        csv.push_str("u40,Spring,1,0,1,0,1,1,0,0,0,1,yes,0\n");
        let data = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap();
        let err = analyzer()
            .analyze(&data, 1, FeatureSet::SpecificAnswers)
            .unwrap_err();
        assert!(err.to_string().contains("keep_your_passwords_3"));
    }

    #[test]
    fn test_no_answer_columns_is_insufficient() {
        let csv = "ruserid,campaign,Campaign number,purcheas_ind\nu1,A,1,1\n";
        let data = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap();
        let outcome = analyzer()
            .analyze(&data, 1, FeatureSet::SpecificAnswers)
            .unwrap();
        assert!(matches!(
            outcome,
            ImportanceOutcome::InsufficientData { records: 0, .. }
        ));
    }

    #[test]
    fn test_unlabelled_answer_falls_back_to_column() {
        let feature = describe("keep_your_passwords_9", FeatureSet::SpecificAnswers, 0.2);
        assert_eq!(feature.display, "keep_your_passwords_9");
        assert_eq!(feature.question.as_deref(), Some("How do you keep your passwords?"));
    }
}
