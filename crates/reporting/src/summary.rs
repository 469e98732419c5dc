//! Dataset overview and the active campaigns summary table.

use campaign_core::dataset::{purchase_total, unique_users};
use campaign_core::{percent, Dataset, UserRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub total_campaigns: usize,
    pub total_users: usize,
    pub total_purchases: u64,
    /// Purchases per unique user, in percent.
    pub conversion_rate: f64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSummaryRow {
    pub campaign_name: String,
    pub campaign_number: i64,
    pub users: usize,
    pub purchases: u64,
    /// Percent, rounded to two decimals.
    pub conversion_rate: f64,
}

pub fn overview(dataset: &Dataset) -> DatasetOverview {
    let records = dataset.records();
    let total_campaigns = records
        .iter()
        .filter_map(|r| r.campaign_number)
        .collect::<HashSet<_>>()
        .len();
    let total_users = unique_users(records);
    let purchases = purchase_total(records);

    DatasetOverview {
        total_campaigns,
        total_users,
        total_purchases: purchases.round() as u64,
        conversion_rate: percent(purchases, total_users as f64),
        generated_at: Utc::now(),
    }
}

/// One row per (campaign name, campaign number), ordered by number.
pub fn campaign_summary(dataset: &Dataset) -> Vec<CampaignSummaryRow> {
    let mut groups: BTreeMap<(i64, &str), Vec<&UserRecord>> = BTreeMap::new();
    for record in dataset.records() {
        if let (Some(number), Some(name)) = (record.campaign_number, record.campaign.as_deref()) {
            groups.entry((number, name)).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|((number, name), rows)| {
            let users = unique_users(rows.iter().copied());
            let purchases = purchase_total(rows.iter().copied());
            CampaignSummaryRow {
                campaign_name: name.to_string(),
                campaign_number: number,
                users,
                purchases: purchases.round() as u64,
                conversion_rate: round2(percent(purchases, users as f64)),
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
