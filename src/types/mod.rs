//! Shared data structures for the activity-recognition report
//!
//! - `dataset`: RawTable (as loaded), FeatureMatrix (numeric predictors), LabelSet
//! - `ml`: cleaning/filter summaries, resample scores, confusion statistics, RunReport

mod dataset;
mod ml;

pub use dataset::*;
pub use ml::*;
