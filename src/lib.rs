//! activity-forest: Weight-Lifting Activity Quality Classification
//!
//! Cleans a labelled on-body sensor dataset, filters redundant predictors,
//! fits a random forest and reports validation accuracy and test predictions.
//!
//! ## Architecture
//!
//! - **Acquisition**: Delimited text files into raw string tables
//! - **ML Engine**: Cleaning, predictor filters, partitioning, forest, evaluation
//! - **Plots**: Confusion and correlation heatmaps (PNG)
//! - **Report**: Plain-text rendering of the run summary

pub mod acquisition;
pub mod config;
pub mod ml_engine;
pub mod plots;
pub mod report;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, ReportConfig};

// Re-export commonly used types
pub use types::{
    ConfusionStats, CvSummary, FeatureMatrix, FilterSummary, ForestSummary, LabelSet, RawTable,
    RunReport, TestPrediction,
};

// Re-export ML Engine types
pub use ml_engine::{
    ActivityAnalyzer, AnalysisOutcome, ConfusionMatrix, CorrelationMatrix, PipelineError,
    RandomForest,
};

// Re-export plotting
pub use plots::PlotError;
