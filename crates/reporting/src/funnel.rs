//! User journey analysis — Visitors → Finished Quiz → Started Transaction → Purchases.

use campaign_core::dataset::{purchase_total, unique_users};
use campaign_core::{percent, CampaignRef, CampaignResult, Dataset};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStage {
    Visitors,
    FinishedQuiz,
    StartedTransaction,
    Purchases,
}

impl JourneyStage {
    pub fn label(&self) -> &'static str {
        match self {
            JourneyStage::Visitors => "Visitors",
            JourneyStage::FinishedQuiz => "Finished Quiz",
            JourneyStage::StartedTransaction => "Started Transaction",
            JourneyStage::Purchases => "Purchases",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStep {
    pub stage: JourneyStage,
    pub users: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyReport {
    pub campaign: CampaignRef,
    pub steps: Vec<FunnelStep>,
    pub visitors: u64,
    pub finished_quiz: u64,
    pub transaction_starts: u64,
    pub purchases: u64,
    pub conversion_rate: f64,
    pub quiz_completion_rate: f64,
    pub purchase_rate_after_transaction: f64,
    pub drop_off_before_quiz: f64,
    pub computed_at: DateTime<Utc>,
}

pub struct JourneyAnalyzer<'a> {
    dataset: &'a Dataset,
}

impl<'a> JourneyAnalyzer<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    pub fn analyze(&self, campaign_number: i64) -> CampaignResult<JourneyReport> {
        let (campaign, rows) = self.dataset.campaign_records(campaign_number)?;

        let visitors = unique_users(rows.iter().copied()) as u64;
        let finished_quiz = rows.iter().filter(|r| r.finished_quiz()).count() as u64;
        let transaction_starts: f64 = if self.dataset.has_transaction_start() {
            rows.iter().filter_map(|r| r.transaction_start).sum()
        } else {
            0.0
        };
        let purchases = purchase_total(rows.iter().copied());

        let quiz_completion_rate = percent(finished_quiz as f64, visitors as f64);
        let drop_off_before_quiz = if visitors > 0 {
            100.0 - quiz_completion_rate
        } else {
            0.0
        };

        let transaction_starts = transaction_starts.round() as u64;
        let purchases_count = purchases.round() as u64;

        debug!(
            campaign = campaign.number,
            visitors, finished_quiz, transaction_starts, purchases = purchases_count,
            "Journey computed"
        );

        let steps = vec![
            FunnelStep {
                stage: JourneyStage::Visitors,
                users: visitors,
            },
            FunnelStep {
                stage: JourneyStage::FinishedQuiz,
                users: finished_quiz,
            },
            FunnelStep {
                stage: JourneyStage::StartedTransaction,
                users: transaction_starts,
            },
            FunnelStep {
                stage: JourneyStage::Purchases,
                users: purchases_count,
            },
        ];

        Ok(JourneyReport {
            campaign,
            steps,
            visitors,
            finished_quiz,
            transaction_starts,
            purchases: purchases_count,
            conversion_rate: percent(purchases, visitors as f64),
            quiz_completion_rate,
            purchase_rate_after_transaction: percent(purchases, transaction_starts as f64),
            drop_off_before_quiz,
            computed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::config::ColumnConfig;

    fn dataset(csv: &str) -> Dataset {
        Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap()
    }

    #[test]
    fn test_journey_rates() {
        let data = dataset(
            "\
ruserid,campaign,Campaign number,purcheas_ind,safety_level_quiz_score,transaction_start
u1,Spring,1,1,4,1
u2,Spring,1,0,2,1
u3,Spring,1,0,0,0
u4,Spring,1,0,,0
u5,Other,2,1,1,1
",
        );
        let report = JourneyAnalyzer::new(&data).analyze(1).unwrap();
        assert_eq!(report.visitors, 4);
        assert_eq!(report.finished_quiz, 2);
        assert_eq!(report.transaction_starts, 2);
        assert_eq!(report.purchases, 1);
        assert_eq!(report.conversion_rate, 25.0);
        assert_eq!(report.quiz_completion_rate, 50.0);
        assert_eq!(report.purchase_rate_after_transaction, 50.0);
        assert_eq!(report.drop_off_before_quiz, 50.0);
        assert_eq!(report.steps.len(), 4);
        assert_eq!(report.steps[3].stage, JourneyStage::Purchases);
    }

    #[test]
    fn test_missing_transaction_column_counts_zero() {
        let data = dataset("ruserid,campaign,Campaign number,purcheas_ind\nu1,A,1,1\n");
        let report = JourneyAnalyzer::new(&data).analyze(1).unwrap();
        assert_eq!(report.transaction_starts, 0);
        assert_eq!(report.purchase_rate_after_transaction, 0.0);
        assert_eq!(report.finished_quiz, 0);
        assert_eq!(report.drop_off_before_quiz, 100.0);
    }

    #[test]
    fn test_unknown_campaign_is_error() {
        let data = dataset("ruserid,campaign,Campaign number,purcheas_ind\nu1,A,1,1\n");
        assert!(JourneyAnalyzer::new(&data).analyze(7).is_err());
    }
}
