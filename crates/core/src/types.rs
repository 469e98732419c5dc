use crate::dataset::is_missing;
use serde::{Deserialize, Serialize};

/// A campaign as it appears in the catalogue: its number and display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignRef {
    pub number: i64,
    pub name: String,
}

/// One exposure row of the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub campaign: Option<String>,
    pub campaign_number: Option<i64>,
    pub purchase: Option<f64>,
    pub quiz_score: Option<f64>,
    pub transaction_start: Option<f64>,
    /// Values of the numeric feature columns, aligned with `Dataset::feature_columns`.
    pub features: Vec<Option<f64>>,
}

impl UserRecord {
    /// Whether the row carries a user id (empty and null markers do not count).
    pub fn has_user_id(&self) -> bool {
        !is_missing(&self.user_id)
    }

    /// Whether the user completed the safety quiz (score above zero).
    pub fn finished_quiz(&self) -> bool {
        self.quiz_score.is_some_and(|s| s > 0.0)
    }

    /// Purchase indicator, missing counted as zero.
    pub fn purchase_value(&self) -> f64 {
        self.purchase.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(quiz_score: Option<f64>) -> UserRecord {
        UserRecord {
            user_id: "u1".to_string(),
            campaign: Some("Spring".to_string()),
            campaign_number: Some(1),
            purchase: None,
            quiz_score,
            transaction_start: None,
            features: Vec::new(),
        }
    }

    #[test]
    fn test_finished_quiz_requires_positive_score() {
        assert!(record(Some(3.0)).finished_quiz());
        assert!(!record(Some(0.0)).finished_quiz());
        assert!(!record(None).finished_quiz());
    }

    #[test]
    fn test_null_user_id_markers() {
        let mut row = record(None);
        assert!(row.has_user_id());
        for marker in ["", "  ", "nan", "NULL"] {
            row.user_id = marker.to_string();
            assert!(!row.has_user_id(), "{marker:?} should count as missing");
        }
    }

    #[test]
    fn test_missing_purchase_counts_as_zero() {
        assert_eq!(record(None).purchase_value(), 0.0);
    }
}
