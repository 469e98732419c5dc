//! Campaign experimentation — Bayesian A/B comparison of conversion rates
//! with Beta–Binomial posteriors.

pub mod bayesian;
pub mod sampling;

pub use bayesian::{ArmCounts, BayesianComparator, ComparisonReport};
