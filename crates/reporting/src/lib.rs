//! Campaign reporting — dataset overview, per-campaign summary, user journey
//! funnel and conversion ranking.

pub mod funnel;
pub mod ranking;
pub mod summary;

pub use funnel::{JourneyAnalyzer, JourneyReport};
pub use ranking::{conversion_ranking, ConversionRanking};
pub use summary::{campaign_summary, overview, CampaignSummaryRow, DatasetOverview};
