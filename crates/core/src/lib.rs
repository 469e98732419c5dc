pub mod config;
pub mod dataset;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use dataset::Dataset;
pub use error::{CampaignError, CampaignResult};
pub use types::{CampaignRef, UserRecord};

/// Percentage of `part` over `whole`, or 0 when `whole` is zero.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
