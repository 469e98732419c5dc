//! Plain-text rendering of the reports.

use campaign_core::CampaignRef;
use campaign_experimentation::ComparisonReport;
use campaign_insights::{ImportanceOutcome, ImportanceReport};
use campaign_reporting::{CampaignSummaryRow, ConversionRanking, DatasetOverview, JourneyReport};
use serde::Serialize;
use std::io::{self, Write};

const BAR_WIDTH: usize = 30;

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub overview: DatasetOverview,
    pub campaigns: Vec<CampaignSummaryRow>,
}

#[derive(Debug, Serialize)]
pub struct CampaignAnalysis {
    pub journey: JourneyReport,
    pub general_features: ImportanceOutcome,
    pub specific_answers: ImportanceOutcome,
    pub ranking: ConversionRanking,
}

pub fn home_page<W: Write>(out: &mut W, page: &HomePage) -> io::Result<()> {
    let o = &page.overview;
    writeln!(out, "Marketing Insights Dashboard")?;
    writeln!(out)?;
    writeln!(out, "  Campaigns        {:>12}", thousands(o.total_campaigns as u64))?;
    writeln!(out, "  Users            {:>12}", thousands(o.total_users as u64))?;
    writeln!(out, "  Conversion rate  {:>11.2}%", o.conversion_rate)?;
    writeln!(out, "  Purchases        {:>12}", thousands(o.total_purchases))?;
    writeln!(out)?;
    writeln!(out, "Active Campaigns Summary")?;
    writeln!(
        out,
        "  {:<30} {:>8} {:>10} {:>10} {:>10}",
        "Campaign", "Number", "Users", "Purchases", "Conversion"
    )?;
    for row in &page.campaigns {
        writeln!(
            out,
            "  {:<30} {:>8} {:>10} {:>10} {:>9.2}%",
            truncate(&row.campaign_name, 30),
            row.campaign_number,
            thousands(row.users as u64),
            thousands(row.purchases),
            row.conversion_rate
        )?;
    }
    Ok(())
}

pub fn campaigns<W: Write>(out: &mut W, campaigns: &[CampaignRef]) -> io::Result<()> {
    for campaign in campaigns {
        writeln!(out, "{:>6}  {}", campaign.number, campaign.name)?;
    }
    Ok(())
}

pub fn comparison<W: Write>(out: &mut W, report: &ComparisonReport) -> io::Result<()> {
    let (a, b) = (&report.campaign_a, &report.campaign_b);
    writeln!(out, "Campaign Performance Summary")?;
    for arm in [a, b] {
        writeln!(
            out,
            "  Campaign {:<4} conversion {:>7.2}%   {} users | {} purchases",
            arm.campaign.number,
            arm.conversion_rate,
            thousands(arm.users),
            thousands(arm.purchases)
        )?;
    }
    writeln!(
        out,
        "  Conversion uplift {:+.2}% (campaign {} vs campaign {})",
        report.uplift, b.campaign.number, a.campaign.number
    )?;
    writeln!(out)?;
    writeln!(out, "Campaign Recommendation")?;
    writeln!(
        out,
        "  Campaign {} has a {:.2}% probability of achieving better conversion results.",
        report.recommendation.winner.number, report.recommendation.certainty
    )?;
    writeln!(
        out,
        "  P(campaign {} > campaign {}) = {:.2}% ({} draws), closed form {:.2}%",
        b.campaign.number,
        a.campaign.number,
        report.probability_b_better,
        report.samples,
        report.exact_probability_b_better
    )?;

    if !report.density.is_empty() {
        writeln!(out)?;
        writeln!(out, "Posterior Probability Distributions")?;
        writeln!(out, "  {:>10} {:>14} {:>14}", "rate", a.campaign.number, b.campaign.number)?;
        let stride = (report.density.len() / 20).max(1);
        for point in report.density.iter().step_by(stride) {
            writeln!(
                out,
                "  {:>10.4} {:>14.4} {:>14.4}",
                point.x, point.campaign_a, point.campaign_b
            )?;
        }
    }
    Ok(())
}

pub fn campaign_analysis<W: Write>(out: &mut W, analysis: &CampaignAnalysis) -> io::Result<()> {
    let journey = &analysis.journey;
    writeln!(
        out,
        "Campaign Analysis: {} ({})",
        journey.campaign.number, journey.campaign.name
    )?;
    writeln!(out)?;
    writeln!(out, "Key Performance Metrics")?;
    writeln!(out, "  Finished quiz        {:>10}", thousands(journey.finished_quiz))?;
    writeln!(out, "  Started transaction  {:>10}", thousands(journey.transaction_starts))?;
    writeln!(out, "  Purchases            {:>10}", thousands(journey.purchases))?;
    writeln!(out, "  Conversion rate      {:>9.2}%", journey.conversion_rate)?;
    writeln!(out)?;

    writeln!(out, "User Journey Analysis")?;
    let widest = journey.steps.iter().map(|s| s.users).max().unwrap_or(0);
    for step in &journey.steps {
        writeln!(
            out,
            "  {:<20} {:<width$} {}",
            step.stage.label(),
            bar(step.users as f64, widest as f64),
            thousands(step.users),
            width = BAR_WIDTH
        )?;
    }
    writeln!(out, "  {:.1}% quiz completion", journey.quiz_completion_rate)?;
    writeln!(
        out,
        "  Purchase rate after transaction start: {:.1}%",
        journey.purchase_rate_after_transaction
    )?;
    writeln!(out, "  Main drop-off before quiz: {:.1}%", journey.drop_off_before_quiz)?;
    writeln!(out)?;

    importance(out, &analysis.general_features)?;
    writeln!(out)?;
    importance(out, &analysis.specific_answers)?;
    writeln!(out)?;

    let ranking = &analysis.ranking;
    writeln!(out, "Conversion Rate by Campaign")?;
    let best = ranking.entries.first().map_or(0.0, |e| e.conversion_rate);
    for entry in &ranking.entries {
        let marker = if entry.campaign_number == ranking.selected { '>' } else { ' ' };
        writeln!(
            out,
            "{} {:>6} {:<width$} {:.1}%",
            marker,
            entry.campaign_number,
            bar(entry.conversion_rate, best),
            entry.conversion_rate,
            width = BAR_WIDTH
        )?;
    }
    writeln!(
        out,
        "  Campaign {} converts at {:.1}% and ranks {} out of {} campaigns.",
        ranking.selected, ranking.selected_rate, ranking.rank, ranking.total
    )?;
    Ok(())
}

fn importance<W: Write>(out: &mut W, outcome: &ImportanceOutcome) -> io::Result<()> {
    match outcome {
        ImportanceOutcome::Ranked(report) => ranked(out, report),
        ImportanceOutcome::InsufficientData {
            feature_set,
            records,
            required,
            ..
        } => {
            writeln!(out, "Feature Importance: {}", feature_set.title())?;
            writeln!(
                out,
                "  Not enough data ({records} complete records). More than {required} records required."
            )
        }
    }
}

fn ranked<W: Write>(out: &mut W, report: &ImportanceReport) -> io::Result<()> {
    writeln!(
        out,
        "Feature Importance: {} ({} records)",
        report.feature_set.title(),
        report.records
    )?;
    let widest = report.features.first().map_or(0.0, |f| f.importance);
    for feature in &report.features {
        writeln!(
            out,
            "  {:<28} {:<width$} {:.3}",
            truncate(&feature.display, 28),
            bar(feature.importance, widest),
            feature.importance,
            width = BAR_WIDTH
        )?;
    }
    if let Some(headline) = report.headline() {
        writeln!(out, "  {headline}")?;
    }
    Ok(())
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.min(BAR_WIDTH))
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width - 1).collect();
        cut.push('…');
        cut
    }
}

/// `1234567` → `1,234,567`.
fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_bar_scales_to_max() {
        assert_eq!(bar(5.0, 10.0).len(), BAR_WIDTH / 2);
        assert_eq!(bar(10.0, 10.0).len(), BAR_WIDTH);
        assert!(bar(1.0, 0.0).is_empty());
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("Spring", 10), "Spring");
        assert_eq!(truncate("Spring Campaign", 7).chars().count(), 7);
    }

    #[test]
    fn test_campaign_list() {
        let mut out = Vec::new();
        campaigns(
            &mut out,
            &[CampaignRef {
                number: 3,
                name: "Breach Alert".to_string(),
            }],
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "     3  Breach Alert\n");
    }
}
