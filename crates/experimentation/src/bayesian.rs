//! Bayesian A/B comparison of two campaigns' conversion rates.
//!
//! Each arm gets a Beta(purchases + 1, users - purchases + 1) posterior
//! (uniform prior). The probability that campaign B converts better than A
//! is estimated by Monte Carlo and cross-checked with the closed form.

use crate::sampling::{beta_pdf, beta_sample, probability_b_beats_a};
use campaign_core::config::BayesConfig;
use campaign_core::dataset::{purchase_total, unique_users};
use campaign_core::{percent, CampaignError, CampaignRef, CampaignResult, Dataset};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Observed outcome of one arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmCounts {
    pub users: u64,
    pub purchases: u64,
}

impl ArmCounts {
    pub fn new(users: u64, purchases: u64) -> Self {
        Self { users, purchases }
    }

    pub fn conversion_rate(&self) -> f64 {
        percent(self.purchases as f64, self.users as f64)
    }

    /// Beta posterior parameters under a uniform prior.
    pub fn posterior(&self) -> CampaignResult<(f64, f64)> {
        if self.purchases > self.users {
            return Err(CampaignError::Validation(format!(
                "{} purchases exceed {} unique users",
                self.purchases, self.users
            )));
        }
        Ok((
            self.purchases as f64 + 1.0,
            (self.users - self.purchases) as f64 + 1.0,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmSummary {
    pub campaign: CampaignRef,
    pub users: u64,
    pub purchases: u64,
    pub conversion_rate: f64,
    pub posterior_alpha: f64,
    pub posterior_beta: f64,
    pub posterior_mean: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityPoint {
    pub x: f64,
    pub campaign_a: f64,
    pub campaign_b: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub winner: CampaignRef,
    /// Probability, in percent, that the winner converts better.
    pub certainty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub campaign_a: ArmSummary,
    pub campaign_b: ArmSummary,
    /// Conversion of B minus conversion of A, in percentage points.
    pub uplift: f64,
    pub probability_b_better: f64,
    pub exact_probability_b_better: f64,
    pub samples: usize,
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub density: Vec<DensityPoint>,
    pub generated_at: DateTime<Utc>,
}

/// Posterior comparison of two arms, independent of campaign metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosteriorComparison {
    pub probability_b_better: f64,
    pub exact_probability_b_better: f64,
    /// Largest draw from either posterior; the density grid ends at 1.1 times it.
    pub max_draw: f64,
    pub density: Vec<DensityPoint>,
}

pub struct BayesianComparator {
    samples: usize,
    density_points: usize,
    seed: Option<u64>,
}

impl BayesianComparator {
    pub fn new(config: &BayesConfig) -> Self {
        Self {
            samples: config.samples.max(1),
            density_points: config.density_points,
            seed: config.seed,
        }
    }

    /// Compare campaign `b` against campaign `a`.
    pub fn compare(
        &self,
        dataset: &Dataset,
        a: i64,
        b: i64,
        include_density: bool,
    ) -> CampaignResult<ComparisonReport> {
        if a == b {
            return Err(CampaignError::Validation(format!(
                "cannot compare campaign {a} with itself"
            )));
        }

        let (campaign_a, rows_a) = dataset.campaign_records(a)?;
        let (campaign_b, rows_b) = dataset.campaign_records(b)?;

        let counts_a = ArmCounts::new(
            unique_users(rows_a.iter().copied()) as u64,
            purchase_total(rows_a.iter().copied()).round() as u64,
        );
        let counts_b = ArmCounts::new(
            unique_users(rows_b.iter().copied()) as u64,
            purchase_total(rows_b.iter().copied()).round() as u64,
        );

        let posterior = self.compare_counts(counts_a, counts_b, include_density)?;

        let winner = if posterior.probability_b_better > 50.0 {
            campaign_b.clone()
        } else {
            campaign_a.clone()
        };
        let certainty = posterior
            .probability_b_better
            .max(100.0 - posterior.probability_b_better);

        info!(
            campaign_a = a,
            campaign_b = b,
            probability_b_better = posterior.probability_b_better,
            winner = winner.number,
            "Campaign comparison complete"
        );

        Ok(ComparisonReport {
            campaign_a: summarize(campaign_a, counts_a)?,
            campaign_b: summarize(campaign_b, counts_b)?,
            uplift: counts_b.conversion_rate() - counts_a.conversion_rate(),
            probability_b_better: posterior.probability_b_better,
            exact_probability_b_better: posterior.exact_probability_b_better,
            samples: self.samples,
            recommendation: Recommendation { winner, certainty },
            density: posterior.density,
            generated_at: Utc::now(),
        })
    }

    /// Monte Carlo and closed-form P(B > A), in percent.
    pub fn compare_counts(
        &self,
        a: ArmCounts,
        b: ArmCounts,
        include_density: bool,
    ) -> CampaignResult<PosteriorComparison> {
        let (alpha_a, beta_a) = a.posterior()?;
        let (alpha_b, beta_b) = b.posterior()?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut wins = 0usize;
        let mut max_draw = 0.0f64;
        for _ in 0..self.samples {
            let draw_a = beta_sample(&mut rng, alpha_a, beta_a);
            let draw_b = beta_sample(&mut rng, alpha_b, beta_b);
            if draw_b > draw_a {
                wins += 1;
            }
            max_draw = max_draw.max(draw_a).max(draw_b);
        }
        let probability_b_better = wins as f64 / self.samples as f64 * 100.0;
        let exact_probability_b_better =
            probability_b_beats_a(alpha_a, beta_a, alpha_b, beta_b) * 100.0;

        debug!(
            alpha_a,
            beta_a,
            alpha_b,
            beta_b,
            probability_b_better,
            exact_probability_b_better,
            "Posterior comparison"
        );

        let density = if include_density {
            self.density_curve(max_draw * 1.1, (alpha_a, beta_a), (alpha_b, beta_b))
        } else {
            Vec::new()
        };

        Ok(PosteriorComparison {
            probability_b_better,
            exact_probability_b_better,
            max_draw,
            density,
        })
    }

    fn density_curve(&self, upper: f64, a: (f64, f64), b: (f64, f64)) -> Vec<DensityPoint> {
        let n = self.density_points;
        let step = if n > 1 { upper / (n - 1) as f64 } else { 0.0 };
        (0..n)
            .map(|i| {
                let x = i as f64 * step;
                DensityPoint {
                    x,
                    campaign_a: beta_pdf(x, a.0, a.1),
                    campaign_b: beta_pdf(x, b.0, b.1),
                }
            })
            .collect()
    }
}

fn summarize(campaign: CampaignRef, counts: ArmCounts) -> CampaignResult<ArmSummary> {
    let (alpha, beta) = counts.posterior()?;
    Ok(ArmSummary {
        campaign,
        users: counts.users,
        purchases: counts.purchases,
        conversion_rate: counts.conversion_rate(),
        posterior_alpha: alpha,
        posterior_beta: beta,
        posterior_mean: alpha / (alpha + beta),
    })
}
