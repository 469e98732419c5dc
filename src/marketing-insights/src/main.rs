//! Marketing Insights — campaign performance, Bayesian A/B comparison and
//! purchase-driver analysis over an exposure export.

mod render;

use anyhow::Context;
use campaign_core::config::{AppConfig, OutputFormat};
use campaign_core::Dataset;
use campaign_experimentation::BayesianComparator;
use campaign_insights::InsightEngine;
use campaign_reporting::{campaign_summary, conversion_ranking, overview, JourneyAnalyzer};
use clap::{Parser, Subcommand, ValueEnum};
use render::{CampaignAnalysis, HomePage};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "marketing-insights")]
#[command(about = "Campaign performance, Bayesian A/B comparison and purchase-driver insights")]
#[command(version)]
struct Cli {
    /// Exposure export to analyse (overrides config)
    #[arg(long, env = "MARKETING_INSIGHTS__DATA__PATH")]
    data: Option<PathBuf>,

    /// Config file (TOML, YAML or JSON)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(long, value_enum)]
    format: Option<Format>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dataset totals and the per-campaign summary table
    Overview,
    /// List campaign numbers and names
    Campaigns,
    /// Bayesian comparison of two campaigns' conversion rates
    Compare {
        /// Baseline campaign number
        #[arg(long)]
        a: i64,
        /// Challenger campaign number
        #[arg(long)]
        b: i64,
        /// Posterior draws per campaign (overrides config)
        #[arg(long)]
        samples: Option<usize>,
        /// RNG seed for reproducible draws (overrides config)
        #[arg(long)]
        seed: Option<u64>,
        /// Include posterior density curves
        #[arg(long, default_value_t = false)]
        density: bool,
    },
    /// Journey, feature importance and ranking for one campaign
    Analyze {
        #[arg(long)]
        campaign: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,marketing_insights=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => AppConfig::load(Some(path))
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };

    // Apply CLI overrides
    if let Some(data) = &cli.data {
        config.data.path = data.display().to_string();
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if let Command::Compare { samples, seed, .. } = &cli.command {
        if let Some(samples) = samples {
            config.bayes.samples = *samples;
        }
        if seed.is_some() {
            config.bayes.seed = *seed;
        }
    }
    config.validate()?;

    info!(
        data = %config.data.path,
        format = ?config.output.format,
        "Configuration loaded"
    );

    let dataset = Arc::new(
        Dataset::load(&config.data.path, &config.data.columns)
            .with_context(|| format!("failed to load dataset {}", config.data.path))?,
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let format = config.output.format;

    match cli.command {
        Command::Overview => {
            let page = HomePage {
                overview: overview(&dataset),
                campaigns: campaign_summary(&dataset),
            };
            emit(&mut out, format, &page, render::home_page)?;
        }
        Command::Campaigns => {
            let campaigns = dataset.campaigns();
            emit(&mut out, format, &campaigns, |w, c| render::campaigns(w, c))?;
        }
        Command::Compare { a, b, density, .. } => {
            let comparator = BayesianComparator::new(&config.bayes);
            let report = comparator.compare(&dataset, a, b, density)?;
            emit(&mut out, format, &report, render::comparison)?;
        }
        Command::Analyze { campaign } => {
            let journey = JourneyAnalyzer::new(&dataset).analyze(campaign)?;
            let engine = InsightEngine::new(dataset.clone(), &config.forest);
            let (general_features, specific_answers) = engine.campaign_insights(campaign)?;
            let ranking = conversion_ranking(&dataset, campaign)?;
            let analysis = CampaignAnalysis {
                journey,
                general_features,
                specific_answers,
                ranking,
            };
            emit(&mut out, format, &analysis, render::campaign_analysis)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn emit<W, T, F>(out: &mut W, format: OutputFormat, value: &T, text: F) -> anyhow::Result<()>
where
    W: Write,
    T: Serialize + ?Sized,
    F: FnOnce(&mut W, &T) -> std::io::Result<()>,
{
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputFormat::Text => text(out, value)?,
    }
    Ok(())
}
