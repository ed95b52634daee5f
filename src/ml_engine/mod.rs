//! ML Engine for Activity-Quality Classification
//!
//! Predicts how a weight-lifting exercise was performed (class A-E) from
//! on-body accelerometer, gyroscope and magnetometer features.
//!
//! ## Key Features
//! - Identical cleaning of the training and test tables (metadata drop, numeric coercion, zero fill)
//! - Near-zero-variance and pairwise-correlation predictor filters
//! - Stratified train/validation partition and repeated k-fold cross-validation
//! - Random forest with out-of-bag error and mean-decrease-Gini importance
//! - Confusion-matrix statistics (exact accuracy interval, kappa, McNemar, per class)
//!
//! ## Architecture
//! - `cleaning`: Raw string table to numeric predictors
//! - `variance_filter`: Near-zero-variance detection (frequency ratio, percent unique)
//! - `correlations`: Pearson matrix and greedy redundancy removal (rayon)
//! - `partition`: Stratified split and fold assignment
//! - `tree` / `forest`: CART trees bagged into a random forest (rayon)
//! - `cross_validation`: Repeated k-fold accuracy/kappa
//! - `evaluation`: Confusion matrix and statistics (statrs)
//! - `analyzer`: Main orchestrator for the whole workflow

pub mod analyzer;
pub mod cleaning;
pub mod correlations;
pub mod cross_validation;
pub mod evaluation;
pub mod forest;
pub mod partition;
pub mod tree;
pub mod variance_filter;

use thiserror::Error;

use crate::acquisition::LoadError;

// Re-export public types
pub use analyzer::{ActivityAnalyzer, AnalysisOutcome};
pub use cleaning::{CleanedTable, Cleaner};
pub use correlations::{CorrelationEngine, CorrelationMatrix};
pub use cross_validation::CrossValidator;
pub use evaluation::ConfusionMatrix;
pub use forest::{ForestParams, RandomForest};
pub use partition::{repeated_kfold, stratified_split, Partition, Resample};
pub use variance_filter::NearZeroVariance;

/// Failures that stop the workflow.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{table} table has {cols} columns, cannot drop {metadata} metadata columns")]
    TooFewColumns {
        table: String,
        cols: usize,
        metadata: usize,
    },

    #[error("{table} table has no label column '{column}'")]
    MissingLabel { table: String, column: String },

    #[error("test table is missing retained predictors: {}", .0.join(", "))]
    IncompatibleColumns(Vec<String>),

    #[error("class '{class}' has {count} rows, at least {required} needed")]
    ClassTooSmall {
        class: String,
        count: usize,
        required: usize,
    },

    #[error("no predictors left after filtering")]
    NoPredictors,

    #[error("classification needs at least two classes, found {0}")]
    TooFewClasses(usize),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
