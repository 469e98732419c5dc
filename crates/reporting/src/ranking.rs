//! Conversion rate by campaign, with the rank of a selected campaign.

use campaign_core::{percent, CampaignError, CampaignResult, Dataset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCampaign {
    pub campaign_number: i64,
    /// Rows with a user id, not unique users.
    pub exposures: u64,
    pub purchases: u64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRanking {
    /// Best conversion rate first.
    pub entries: Vec<RankedCampaign>,
    pub selected: i64,
    pub selected_rate: f64,
    pub rank: usize,
    pub total: usize,
}

/// Conversion rate per campaign number, best first.
///
/// Rank 1 is the highest rate, not the lowest as an ascending sort would
/// give. Equal rates rank by campaign number. Rows without a user id are
/// not exposures but their purchases still count.
pub fn conversion_ranking(dataset: &Dataset, selected: i64) -> CampaignResult<ConversionRanking> {
    let mut groups: BTreeMap<i64, (u64, f64)> = BTreeMap::new();
    for record in dataset.records() {
        if let Some(number) = record.campaign_number {
            let entry = groups.entry(number).or_insert((0, 0.0));
            if record.has_user_id() {
                entry.0 += 1;
            }
            entry.1 += record.purchase.unwrap_or(0.0);
        }
    }

    let mut entries: Vec<RankedCampaign> = groups
        .into_iter()
        .filter(|(_, (exposures, _))| *exposures > 0)
        .map(|(number, (exposures, purchases))| RankedCampaign {
            campaign_number: number,
            exposures,
            purchases: purchases.round() as u64,
            conversion_rate: percent(purchases, exposures as f64),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.conversion_rate
            .total_cmp(&a.conversion_rate)
            .then(a.campaign_number.cmp(&b.campaign_number))
    });

    let position = entries
        .iter()
        .position(|e| e.campaign_number == selected)
        .ok_or(CampaignError::UnknownCampaign(selected))?;

    Ok(ConversionRanking {
        selected,
        selected_rate: entries[position].conversion_rate,
        rank: position + 1,
        total: entries.len(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::config::ColumnConfig;

    fn dataset() -> Dataset {
        let csv = "\
ruserid,campaign,Campaign number,purcheas_ind
u1,A,1,0
u2,A,1,1
u1,B,2,1
u1,B,2,1
u3,C,3,0
u4,C,3,0
u5,C,3,1
u6,C,3,0
";
        Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap()
    }

    #[test]
    fn test_ranking_best_first() {
        let ranking = conversion_ranking(&dataset(), 1).unwrap();
        let order: Vec<i64> = ranking.entries.iter().map(|e| e.campaign_number).collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(ranking.rank, 2);
        assert_eq!(ranking.total, 3);
        assert_eq!(ranking.selected_rate, 50.0);
    }

    #[test]
    fn test_exposures_count_rows() {
        let ranking = conversion_ranking(&dataset(), 2).unwrap();
        assert_eq!(ranking.rank, 1);
        assert_eq!(ranking.entries[0].exposures, 2);
        assert_eq!(ranking.entries[0].conversion_rate, 100.0);
    }

    #[test]
    fn test_rows_without_user_id_are_not_exposures() {
        let csv = "\
ruserid,campaign,Campaign number,purcheas_ind
u1,A,1,1
u2,A,1,0
,A,1,0
";
        let dataset = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap();
        let ranking = conversion_ranking(&dataset, 1).unwrap();
        assert_eq!(ranking.entries[0].exposures, 2);
        assert_eq!(ranking.selected_rate, 50.0);
    }

    #[test]
    fn test_equal_rates_rank_by_campaign_number() {
        let csv = "\
ruserid,campaign,Campaign number,purcheas_ind
u1,Later,7,1
u2,Later,7,0
u3,Earlier,4,0
u4,Earlier,4,1
u5,Low,2,0
";
        let dataset = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap();
        let ranking = conversion_ranking(&dataset, 7).unwrap();
        let order: Vec<i64> = ranking.entries.iter().map(|e| e.campaign_number).collect();
        assert_eq!(order, vec![4, 7, 2]);
        assert_eq!(ranking.rank, 2);
    }

    #[test]
    fn test_unknown_selection() {
        assert!(matches!(
            conversion_ranking(&dataset(), 42),
            Err(CampaignError::UnknownCampaign(42))
        ));
    }
}
