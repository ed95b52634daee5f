//! activity-forest - Weight-Lifting Activity Quality Report
//!
//! Runs the full workflow once: load, clean, filter, partition, cross-validate,
//! fit, evaluate, predict, plot.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: data/pml-training.csv and data/pml-testing.csv
//! cargo run --release
//!
//! # Explicit inputs, fewer trees, JSON report
//! ./activity-forest --train train.csv --test test.csv --trees 100 --json output/report.json
//! ```
//!
//! # Environment Variables
//!
//! - `ACTIVITY_FOREST_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use activity_forest::config::{defaults, ReportConfig};
use activity_forest::ml_engine::ActivityAnalyzer;
use activity_forest::{plots, report};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "activity-forest")]
#[command(about = "Random-forest classification of weight-lifting activity quality")]
#[command(version)]
struct CliArgs {
    /// Labelled training CSV
    #[arg(long, value_name = "PATH")]
    train: Option<PathBuf>,

    /// Unlabelled test CSV
    #[arg(long, value_name = "PATH")]
    test: Option<PathBuf>,

    /// TOML config file (overrides the standard search order)
    #[arg(short, long, value_name = "PATH", env = "ACTIVITY_FOREST_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for plots
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Seed for partitioning, resampling and tree construction
    #[arg(long)]
    seed: Option<u64>,

    /// Number of trees in every forest
    #[arg(long)]
    trees: Option<usize>,

    /// Worker threads (0 = one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Also write the full report as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Skip rendering the PNG plots
    #[arg(long)]
    no_plots: bool,
}

impl CliArgs {
    /// Load the config file and apply command-line overrides.
    fn resolve_config(&self) -> Result<ReportConfig> {
        let mut config = match &self.config {
            Some(path) => ReportConfig::load_from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ReportConfig::load(),
        };

        if let Some(p) = &self.train {
            config.input.train_path = p.clone();
        }
        if let Some(p) = &self.test {
            config.input.test_path = p.clone();
        }
        if let Some(d) = &self.out_dir {
            config.output.dir = d.clone();
        }
        if let Some(seed) = self.seed {
            config.run.seed = seed;
        }
        if let Some(n) = self.trees {
            config.forest.n_trees = n;
        }
        if let Some(n) = self.threads {
            config.forest.threads = n;
        }
        config.validate().context("invalid configuration after command-line overrides")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = args.resolve_config()?;

    if config.forest.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.forest.threads)
            .build_global()
            .context("configuring worker threads")?;
    }

    info!(
        train = %config.input.train_path.display(),
        test = %config.input.test_path.display(),
        seed = config.run.seed,
        trees = config.forest.n_trees,
        mtry = config.forest.mtry,
        "Starting activity-forest"
    );

    let outcome = ActivityAnalyzer::run(&config).context("analysis failed")?;

    println!("{}", report::render(&outcome.report, defaults::IMPORTANCE_TOP_N));

    if !args.no_plots {
        fs::create_dir_all(&config.output.dir)
            .with_context(|| format!("creating output directory {}", config.output.dir.display()))?;
        plots::save_confusion_plot(&outcome.confusion, config.output.cell_px, &config.output.confusion_plot_path())?;
        plots::save_correlation_plot(&outcome.correlation, config.output.cell_px, &config.output.correlation_plot_path())?;
    }

    if let Some(path) = &args.json {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&outcome.report).context("serializing report")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "JSON report written");
    }

    Ok(())
}
